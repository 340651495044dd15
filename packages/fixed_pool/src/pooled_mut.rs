use std::any::type_name;
use std::borrow::{Borrow, BorrowMut};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::{Lease, Pooled};

/// An exclusive handle to a value checked out of a [`FixedPool`][crate::FixedPool].
///
/// This is the only handle to the value, so it grants mutable access via [`DerefMut`].
/// It cannot be cloned; if you need multiple aliases of the same value, convert it into a
/// shared handle via [`into_shared()`][Self::into_shared].
///
/// Dropping the handle returns the value to the pool. The value itself is not dropped - it
/// keeps its state and will be handed out again by a later acquire.
///
/// # Example
///
/// ```rust
/// use fixed_pool::FixedPool;
///
/// let mut pool = FixedPool::new(1, String::new).unwrap();
///
/// let mut greeting = pool.acquire_mut().unwrap();
/// greeting.push_str("hello");
///
/// let shared = greeting.into_shared();
/// let alias = shared.clone();
/// assert_eq!(*alias, "hello");
/// ```
///
/// # Thread safety
///
/// This type is single-threaded.
pub struct PooledMut<T> {
    lease: Lease<T>,
}

impl<T> PooledMut<T> {
    #[must_use]
    pub(crate) fn new(lease: Lease<T>) -> Self {
        Self { lease }
    }

    /// Converts the exclusive handle into a shared handle that can be cloned.
    ///
    /// The value stays checked out; it is only returned to the pool when every alias of the
    /// shared handle has been dropped.
    #[must_use]
    #[inline]
    pub fn into_shared(self) -> Pooled<T> {
        Pooled::new(self.lease)
    }

    /// The index of the slot in the pool that holds the value.
    ///
    /// Slots are numbered in construction order, starting from zero.
    #[must_use]
    #[inline]
    pub fn slot_index(&self) -> usize {
        self.lease.slot_index()
    }

    /// A pointer to the value. The pointer is valid for as long as the handle exists.
    #[must_use]
    #[inline]
    #[cfg_attr(test, mutants::skip)] // cargo-mutants tries many unviable mutations, wasting precious build minutes.
    pub fn ptr(&self) -> NonNull<T> {
        self.lease.ptr()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<T> fmt::Debug for PooledMut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("lease", &self.lease)
            .finish()
    }
}

impl<T> Deref for PooledMut<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: This is an exclusive handle, so no conflicting exclusive reference can exist.
        // The lease keeps the pool storage alive.
        unsafe { self.lease.ptr().as_ref() }
    }
}

impl<T> DerefMut for PooledMut<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: This is an exclusive handle and we hold an exclusive reference to it, so no
        // other reference to the value can exist. The lease keeps the pool storage alive.
        unsafe { self.lease.ptr().as_mut() }
    }
}

impl<T> Borrow<T> for PooledMut<T> {
    #[inline]
    fn borrow(&self) -> &T {
        self
    }
}

impl<T> BorrowMut<T> for PooledMut<T> {
    #[inline]
    fn borrow_mut(&mut self) -> &mut T {
        self
    }
}

impl<T> AsRef<T> for PooledMut<T> {
    #[inline]
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> AsMut<T> for PooledMut<T> {
    #[inline]
    fn as_mut(&mut self) -> &mut T {
        self
    }
}
