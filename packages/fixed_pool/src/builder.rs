use std::any::type_name;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::fmt;

use tracing::warn;

use crate::{Arena, Error, FixedPool, FreeList, Result};

/// Builder for creating an instance of [`FixedPool`].
///
/// The capacity must always be set. The values themselves come from the closure or prototype
/// passed to one of the `build_*()` methods, which is called once per slot in increasing slot
/// order.
///
/// # Examples
///
/// ```
/// use fixed_pool::FixedPool;
///
/// let mut registered = Vec::new();
///
/// let pool = FixedPool::builder()
///     .capacity(3)
///     .initializer(move |value: &mut u32| registered.push(*value))
///     .build_cloned(5_u32)
///     .unwrap();
///
/// assert_eq!(pool.free_count(), 3);
/// ```
#[must_use]
pub struct FixedPoolBuilder<T> {
    capacity: usize,

    initializer: Option<Box<dyn FnMut(&mut T)>>,
}

impl<T> fmt::Debug for FixedPoolBuilder<T> {
    #[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity)
            .field("has_initializer", &self.initializer.is_some())
            .finish()
    }
}

impl<T> FixedPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: 0,
            initializer: None,
        }
    }

    /// Sets the number of values in the pool. The capacity can never change after the pool
    /// has been built and must be greater than zero.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets a callback that is invoked once for every value, directly after it has been
    /// constructed and before it is placed on the free list.
    ///
    /// This is useful for post-construction side effects such as registering each value
    /// with some other component.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    ///
    /// let mut next_id = 0;
    ///
    /// let mut pool = FixedPool::builder()
    ///     .capacity(2)
    ///     .initializer(move |id: &mut usize| {
    ///         *id = next_id;
    ///         next_id += 1;
    ///     })
    ///     .build_with(|| usize::MAX)
    ///     .unwrap();
    ///
    /// // The last constructed value is handed out first.
    /// assert_eq!(*pool.acquire().unwrap(), 1);
    /// ```
    pub fn initializer<F>(mut self, initializer: F) -> Self
    where
        F: FnMut(&mut T) + 'static,
    {
        self.initializer = Some(Box::new(initializer));
        self
    }

    /// Builds the pool, calling `factory` once for each slot to produce its value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the capacity is zero and
    /// [`Error::AllocationFailed`] if storage for the values cannot be allocated.
    pub fn build_with<F>(self, mut factory: F) -> Result<FixedPool<T>>
    where
        F: FnMut() -> T,
    {
        self.try_build_with(|| Ok::<T, Infallible>(factory()))
    }

    /// Builds the pool, filling every slot with a clone of `prototype`.
    ///
    /// # Errors
    ///
    /// Same as [`build_with()`][Self::build_with].
    pub fn build_cloned(self, prototype: T) -> Result<FixedPool<T>>
    where
        T: Clone,
    {
        self.build_with(|| prototype.clone())
    }

    /// Builds the pool, calling the fallible `factory` once for each slot to produce its value.
    ///
    /// Building is all-or-nothing: if the factory fails (or panics) for some slot, every value
    /// already constructed for the preceding slots is dropped before the error is returned.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`build_with()`][Self::build_with], returns
    /// [`Error::Construction`] with the index of the slot whose factory call failed.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixed_pool::{Error, FixedPool};
    ///
    /// let mut remaining_budget = 2;
    ///
    /// let result = FixedPool::builder().capacity(3).try_build_with(|| {
    ///     if remaining_budget == 0 {
    ///         return Err("out of budget");
    ///     }
    ///
    ///     remaining_budget -= 1;
    ///     Ok(vec![0_u8; 16])
    /// });
    ///
    /// assert!(matches!(result, Err(Error::Construction { slot_index: 2, .. })));
    /// ```
    pub fn try_build_with<F, E>(self, mut factory: F) -> Result<FixedPool<T>>
    where
        F: FnMut() -> std::result::Result<T, E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let Self {
            capacity,
            mut initializer,
        } = self;

        if capacity == 0 {
            return Err(Error::InvalidArgument {
                problem: "pool capacity must be greater than zero".to_string(),
            });
        }

        // If we return early or unwind from here on, dropping the arena takes care of
        // dropping every value constructed so far.
        let mut arena = Arena::<T>::try_new(capacity)?;

        let mut free_list =
            FreeList::try_with_capacity(capacity).map_err(|_| Error::AllocationFailed {
                capacity,
                item_type: type_name::<T>(),
            })?;

        for slot_index in 0..capacity {
            let value = match factory() {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        slot_index,
                        capacity,
                        item_type = type_name::<T>(),
                        "value construction failed, dropping the values constructed so far"
                    );

                    return Err(Error::Construction {
                        slot_index,
                        source: e.into(),
                    });
                }
            };

            let value = arena.push(value);

            if let Some(initializer) = initializer.as_mut() {
                initializer(value);
            }

            let registered_index = free_list.push_new();
            debug_assert_eq!(registered_index, slot_index);
        }

        Ok(FixedPool::from_parts(arena, free_list))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    use super::*;

    /// Counts how many instances are alive at any point in time.
    struct Tracked {
        live: Rc<Cell<usize>>,
    }

    impl Tracked {
        fn new(live: &Rc<Cell<usize>>) -> Self {
            live.set(live.get() + 1);
            Self {
                live: Rc::clone(live),
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    #[test]
    fn unset_capacity_is_invalid_argument() {
        let result = FixedPool::<u32>::builder().build_with(|| 0);

        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn zero_capacity_never_calls_factory() {
        let calls = Cell::new(0);

        let result = FixedPool::<u32>::builder().capacity(0).build_with(|| {
            calls.set(calls.get() + 1);
            0
        });

        assert!(result.is_err());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn impossible_capacity_is_allocation_failure() {
        let result = FixedPool::<u64>::builder()
            .capacity(usize::MAX)
            .build_with(|| 0);

        assert!(matches!(result, Err(Error::AllocationFailed { .. })));
    }

    #[test]
    fn initializer_runs_once_per_slot_in_construction_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut next = 0;

        let pool = FixedPool::builder()
            .capacity(4)
            .initializer({
                let seen = Rc::clone(&seen);
                move |value: &mut usize| seen.borrow_mut().push(*value)
            })
            .build_with(|| {
                next += 1;
                next
            })
            .unwrap();

        assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn initializer_changes_are_visible_to_handles() {
        let mut pool = FixedPool::builder()
            .capacity(2)
            .initializer(|value: &mut String| value.push_str(" initialized"))
            .build_cloned("value".to_string())
            .unwrap();

        assert_eq!(*pool.acquire().unwrap(), "value initialized");
    }

    #[test]
    fn construction_failure_drops_constructed_values() {
        let live = Rc::new(Cell::new(0));
        let mut attempts = 0;

        let result = FixedPool::builder().capacity(10).try_build_with(|| {
            attempts += 1;

            if attempts == 4 {
                return Err("fourth value is cursed");
            }

            Ok(Tracked::new(&live))
        });

        let Err(Error::Construction { slot_index, source }) = result else {
            panic!("expected a construction error");
        };

        assert_eq!(slot_index, 3);
        assert_eq!(source.to_string(), "fourth value is cursed");
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn construction_panic_drops_constructed_values() {
        let live = Rc::new(Cell::new(0));
        let mut attempts = 0;

        let result = catch_unwind(AssertUnwindSafe(|| {
            FixedPool::builder().capacity(5).build_with(|| {
                attempts += 1;
                assert!(attempts < 3, "third value panics");
                Tracked::new(&live)
            })
        }));

        assert!(result.is_err());
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn initializer_panic_drops_constructed_values() {
        let live = Rc::new(Cell::new(0));
        let mut initialized = 0;

        let result = catch_unwind(AssertUnwindSafe(|| {
            FixedPool::builder()
                .capacity(5)
                .initializer(move |_: &mut Tracked| {
                    initialized += 1;
                    assert!(initialized < 2, "second initializer call panics");
                })
                .build_with(|| Tracked::new(&live))
        }));

        assert!(result.is_err());
        assert_eq!(live.get(), 0);
    }
}
