use std::any::type_name;
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::{Lease, PooledMut};

/// A shared reference-counting handle to a value checked out of a
/// [`FixedPool`][crate::FixedPool].
///
/// Cloning the handle creates another alias of the same value. The value is returned to the
/// pool when the last alias is dropped, at exactly that point in the program.
///
/// Shared handles only provide shared access to the value. Mutable access is available via
/// [`get_mut()`][Self::get_mut] while the handle is the only alias, or via
/// [`try_into_mut()`][Self::try_into_mut]. Use interior mutability in `T` if aliases need to
/// mutate the value concurrently.
///
/// # Example
///
/// ```rust
/// use fixed_pool::FixedPool;
///
/// let mut pool = FixedPool::with_value(2, 7_u32).unwrap();
///
/// let first = pool.acquire().unwrap();
/// let second = first.clone();
/// assert_eq!(first.ref_count(), 2);
/// assert_eq!(pool.free_count(), 1);
///
/// drop(first);
/// assert_eq!(pool.free_count(), 1);
///
/// drop(second);
/// assert_eq!(pool.free_count(), 2);
/// ```
///
/// # Thread safety
///
/// This type is single-threaded.
pub struct Pooled<T> {
    lease: Rc<Lease<T>>,
}

impl<T> Pooled<T> {
    #[must_use]
    pub(crate) fn new(lease: Lease<T>) -> Self {
        Self {
            lease: Rc::new(lease),
        }
    }

    /// The number of aliases of this handle that currently exist, including this one.
    #[must_use]
    #[inline]
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.lease)
    }

    /// The index of the slot in the pool that holds the value.
    ///
    /// Slots are numbered in construction order, starting from zero.
    #[must_use]
    #[inline]
    pub fn slot_index(&self) -> usize {
        self.lease.slot_index()
    }

    /// A pointer to the value. The pointer is valid for as long as any alias of the handle
    /// exists.
    #[must_use]
    #[inline]
    #[cfg_attr(test, mutants::skip)] // cargo-mutants tries many unviable mutations, wasting precious build minutes.
    pub fn ptr(&self) -> NonNull<T> {
        self.lease.ptr()
    }

    /// Returns an exclusive reference to the value if this is the only alias.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::FixedPool;
    ///
    /// let mut pool = FixedPool::with_value(1, 0_u32).unwrap();
    ///
    /// let mut handle = pool.acquire().unwrap();
    /// *handle.get_mut().unwrap() = 5;
    ///
    /// let alias = handle.clone();
    /// assert!(handle.get_mut().is_none());
    ///
    /// drop(alias);
    /// assert_eq!(*handle, 5);
    /// ```
    #[must_use]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        let lease = Rc::get_mut(&mut self.lease)?;

        // SAFETY: We are the only alias and we hold an exclusive reference to ourselves,
        // so no other reference to the value can exist.
        Some(unsafe { lease.ptr().as_mut() })
    }

    /// Converts the handle into an exclusive handle if this is the only alias.
    ///
    /// # Errors
    ///
    /// Returns the handle unchanged if other aliases exist.
    pub fn try_into_mut(self) -> Result<PooledMut<T>, Self> {
        Rc::try_unwrap(self.lease)
            .map(PooledMut::new)
            .map_err(|lease| Self { lease })
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<T> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("lease", &self.lease)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: Exclusive references are only created from a unique alias that is borrowed
        // exclusively, so none can coexist with this shared reference. The lease keeps the
        // pool storage alive.
        unsafe { self.lease.ptr().as_ref() }
    }
}

impl<T> Borrow<T> for Pooled<T> {
    #[inline]
    fn borrow(&self) -> &T {
        self
    }
}

impl<T> AsRef<T> for Pooled<T> {
    #[inline]
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> Clone for Pooled<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            lease: Rc::clone(&self.lease),
        }
    }
}

impl<T> From<PooledMut<T>> for Pooled<T> {
    #[inline]
    fn from(value: PooledMut<T>) -> Self {
        value.into_shared()
    }
}
