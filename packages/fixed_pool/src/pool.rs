use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use tracing::debug;

use crate::{Arena, Checkout, FixedPoolBuilder, FreeList, Lease, Pooled, PooledMut, Result};

/// A fixed-capacity object pool that preallocates all of its items up front.
///
/// When the pool is created, `capacity` values are constructed in one contiguous arena and
/// every one of them is placed on the free list. [`acquire()`][1] takes the most recently
/// freed value off the free list and wraps it in a handle; when the last handle referencing
/// that value is dropped, the value goes back on the free list. Values are never constructed
/// or dropped by acquiring or releasing them - they keep whatever state the previous user
/// left them in. All values are dropped together when the pool is torn down.
///
/// Directly after creation, the free list holds the slots in reverse construction order, so
/// the first [`acquire()`][1] returns the value that was constructed last.
///
/// There are two kinds of handles:
///
/// * [`acquire()`][1] returns a [`Pooled<T>`], a shared handle that can be cloned to create
///   additional aliases of the same value.
/// * [`acquire_mut()`][2] returns a [`PooledMut<T>`], an exclusive handle that provides
///   mutable access and can later be converted into a shared handle.
///
/// # Resource usage
///
/// The capacity is fixed when the pool is created. When every slot is checked out,
/// [`acquire()`][1] returns `None` instead of growing the pool or waiting for a slot.
///
/// # Lifetime
///
/// Every handle keeps the storage of the pool alive. Dropping the `FixedPool` while handles
/// still exist defers the teardown until the last handle has been dropped.
///
/// # Thread safety
///
/// The pool and its handles are single-threaded.
///
/// # Example
///
/// ```rust
/// use fixed_pool::FixedPool;
///
/// let mut pool = FixedPool::with_value(2, String::from("idle")).unwrap();
/// assert_eq!(pool.free_count(), 2);
///
/// let mut worker = pool.acquire_mut().unwrap();
/// worker.push_str(" -> busy");
/// assert_eq!(pool.free_count(), 1);
///
/// drop(worker);
/// assert_eq!(pool.free_count(), 2);
///
/// // The most recently released value is handed out next, with its state intact.
/// let worker = pool.acquire().unwrap();
/// assert_eq!(*worker, "idle -> busy");
/// ```
///
/// [1]: Self::acquire
/// [2]: Self::acquire_mut
pub struct FixedPool<T> {
    // Shared with every handle issued by this pool.
    core: Rc<PoolCore<T>>,
}

impl<T> FixedPool<T> {
    /// Starts building a new [`FixedPool`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::builder()
    ///     .capacity(16)
    ///     .initializer(|buffer: &mut Vec<u8>| buffer.reserve(1024))
    ///     .build_with(Vec::new)
    ///     .unwrap();
    ///
    /// assert_eq!(pool.capacity(), 16);
    /// ```
    pub fn builder() -> FixedPoolBuilder<T> {
        FixedPoolBuilder::new()
    }

    /// Creates a pool of `capacity` values, each produced by calling `factory`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`][crate::Error::InvalidArgument] if `capacity` is zero
    /// and [`Error::AllocationFailed`][crate::Error::AllocationFailed] if storage for
    /// `capacity` values cannot be allocated.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::new(8, || [0_u8; 64]).unwrap();
    ///
    /// assert_eq!(pool.free_count(), 8);
    /// ```
    pub fn new<F>(capacity: usize, factory: F) -> Result<Self>
    where
        F: FnMut() -> T,
    {
        Self::builder().capacity(capacity).build_with(factory)
    }

    /// Creates a pool of `capacity` clones of `value`.
    ///
    /// # Errors
    ///
    /// Same as [`new()`][Self::new].
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::FixedPool;
    ///
    /// let mut pool = FixedPool::with_value(4, (20, 21)).unwrap();
    ///
    /// let item = pool.acquire().unwrap();
    /// assert_eq!(*item, (20, 21));
    /// ```
    pub fn with_value(capacity: usize, value: T) -> Result<Self>
    where
        T: Clone,
    {
        Self::builder().capacity(capacity).build_cloned(value)
    }

    pub(crate) fn from_parts(arena: Arena<T>, free_list: FreeList) -> Self {
        debug_assert_eq!(arena.initialized(), arena.capacity());
        debug_assert_eq!(free_list.capacity(), arena.capacity());

        debug!(
            capacity = arena.capacity(),
            item_type = type_name::<T>(),
            "fixed pool created"
        );

        Self {
            core: Rc::new(PoolCore {
                arena,
                free_list: RefCell::new(free_list),
            }),
        }
    }

    /// Checks out a free value and returns a shared handle to it.
    ///
    /// Returns `None` if every value in the pool is currently checked out.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::FixedPool;
    ///
    /// let mut pool = FixedPool::with_value(1, 42_u32).unwrap();
    ///
    /// let first = pool.acquire().unwrap();
    /// let alias = first.clone();
    /// assert!(pool.acquire().is_none());
    ///
    /// drop(first);
    /// assert!(pool.acquire().is_none());
    ///
    /// drop(alias);
    /// assert!(pool.acquire().is_some());
    /// ```
    #[must_use]
    pub fn acquire(&mut self) -> Option<Pooled<T>> {
        self.acquire_mut().map(PooledMut::into_shared)
    }

    /// Checks out a free value and returns an exclusive handle to it.
    ///
    /// Returns `None` if every value in the pool is currently checked out.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::FixedPool;
    ///
    /// let mut pool = FixedPool::new(1, Vec::<u32>::new).unwrap();
    ///
    /// let mut item = pool.acquire_mut().unwrap();
    /// item.push(7);
    /// assert_eq!(item.as_slice(), &[7]);
    /// ```
    #[must_use]
    pub fn acquire_mut(&mut self) -> Option<PooledMut<T>> {
        Lease::acquire(&self.core).map(PooledMut::new)
    }

    /// The number of values that are currently free for acquisition.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.core.free_count()
    }

    /// The total number of values in the pool, free or checked out. Fixed at creation.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    /// The number of values that are currently checked out.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::FixedPool;
    ///
    /// let mut pool = FixedPool::with_value(3, 0_u8).unwrap();
    /// assert_eq!(pool.len(), 0);
    ///
    /// let _item = pool.acquire().unwrap();
    /// assert_eq!(pool.len(), 1);
    /// ```
    #[must_use]
    pub fn len(&self) -> usize {
        self.capacity()
            .checked_sub(self.free_count())
            .expect("free list can never hold more slots than the pool has")
    }

    /// Whether no value is currently checked out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every value is currently checked out, so that [`acquire()`][Self::acquire]
    /// would return `None`.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.free_count() == 0
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &Rc<PoolCore<T>> {
        &self.core
    }
}

impl<T> Drop for FixedPool<T> {
    fn drop(&mut self) {
        let outstanding = self.len();

        if outstanding > 0 {
            debug!(
                outstanding,
                item_type = type_name::<T>(),
                "fixed pool dropped with values still checked out, teardown deferred until they are released"
            );
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<T> fmt::Debug for FixedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("core", &self.core)
            .finish()
    }
}

/// The state shared between a pool and all handles it has issued.
///
/// Teardown of the arena happens when the last reference to the core goes away.
pub(crate) struct PoolCore<T> {
    arena: Arena<T>,
    free_list: RefCell<FreeList>,
}

impl<T> PoolCore<T> {
    pub(crate) fn checkout(&self) -> Option<Checkout> {
        self.free_list.borrow_mut().checkout()
    }

    pub(crate) fn release(&self, checkout: Checkout) -> Result<()> {
        self.free_list.borrow_mut().release(checkout)
    }

    #[must_use]
    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<T> {
        self.arena.slot_ptr(index)
    }

    #[must_use]
    pub(crate) fn free_count(&self) -> usize {
        self.free_list.borrow().free_count()
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.arena.capacity()
    }
}

impl<T> Drop for PoolCore<T> {
    fn drop(&mut self) {
        debug!(
            capacity = self.arena.capacity(),
            item_type = type_name::<T>(),
            "tearing down fixed pool"
        );

        // The arena drops all of its values when the fields are dropped after this.
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<T> fmt::Debug for PoolCore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolCore")
            .field("arena", &self.arena)
            .field("free_count", &self.free_count())
            .finish()
    }
}
