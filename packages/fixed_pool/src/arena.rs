use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::{Error, Result};

/// The single contiguous block of storage that backs every slot of a `FixedPool`.
///
/// The arena is filled front to back exactly once, while the pool is being built. Values are
/// never moved or dropped individually afterwards - the arena drops whatever prefix of slots
/// has been initialized when the arena itself is dropped. This makes a partially filled arena
/// safe to abandon: if building the pool fails halfway through, dropping the arena destructs
/// the slots that were already constructed and releases the storage.
///
/// The arena does not keep references to its values and does not create any after the build
/// phase. Handles access values through raw pointers obtained via [`slot_ptr()`][1].
///
/// [1]: Self::slot_ptr
pub(crate) struct Arena<T> {
    first_slot_ptr: NonNull<T>,

    capacity: usize,

    /// Slots `0..initialized` contain a live value, the rest are uninitialized memory.
    initialized: usize,

    _owns: PhantomData<T>,
}

impl<T> Arena<T> {
    /// Allocates uninitialized storage for `capacity` values.
    ///
    /// No allocation is made for zero-sized types.
    pub(crate) fn try_new(capacity: usize) -> Result<Self> {
        let allocation_failed = || Error::AllocationFailed {
            capacity,
            item_type: type_name::<T>(),
        };

        let layout = Layout::array::<T>(capacity).map_err(|_| allocation_failed())?;

        let first_slot_ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            // SAFETY: The layout is valid for an array of T and we checked above that
            // it is not zero-sized.
            NonNull::new(unsafe { alloc(layout) }.cast::<T>()).ok_or_else(allocation_failed)?
        };

        Ok(Self {
            first_slot_ptr,
            capacity,
            initialized: 0,
            _owns: PhantomData,
        })
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub(crate) fn initialized(&self) -> usize {
        self.initialized
    }

    /// Moves `value` into the next uninitialized slot and returns an exclusive reference to it.
    ///
    /// # Panics
    ///
    /// Panics if every slot has already been initialized.
    pub(crate) fn push(&mut self, value: T) -> &mut T {
        assert!(
            self.initialized < self.capacity,
            "arena of {} is already full ({} slots)",
            type_name::<T>(),
            self.capacity
        );

        // SAFETY: Guarded by the capacity check above, so the slot is within the allocation.
        let slot_ptr = unsafe { self.first_slot_ptr.add(self.initialized) };

        // SAFETY: The slot is within the allocation, correctly aligned and not yet initialized,
        // so writing without dropping the previous contents is the right thing to do.
        unsafe {
            slot_ptr.as_ptr().write(value);
        }

        self.initialized = self
            .initialized
            .checked_add(1)
            .expect("guarded by initialized < capacity above");

        let mut slot_ptr = slot_ptr;

        // SAFETY: We just initialized the slot and we hold an exclusive reference to the arena,
        // so nothing else can be referencing the value.
        unsafe { slot_ptr.as_mut() }
    }

    /// Returns a pointer to the value in the slot at `index`.
    ///
    /// The pointer remains valid for as long as the arena exists.
    ///
    /// # Panics
    ///
    /// Panics if the slot at `index` has not been initialized.
    #[must_use]
    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<T> {
        assert!(
            index < self.initialized,
            "slot {index} is out of bounds in arena of {} with {} initialized slots",
            type_name::<T>(),
            self.initialized
        );

        // SAFETY: Guarded by the bounds check above.
        unsafe { self.first_slot_ptr.add(index) }
    }

    fn layout(&self) -> Layout {
        Layout::array::<T>(self.capacity)
            .expect("layout was already calculated successfully when the arena was created")
    }
}

impl<T> Drop for Arena<T> {
    fn drop(&mut self) {
        // Shrink the initialized prefix before dropping so that a panicking destructor
        // cannot lead to any value being dropped twice.
        let initialized = self.initialized;
        self.initialized = 0;

        let first_slot_ptr = self.first_slot_ptr;
        let layout = self.layout();

        // Armed before any value is dropped, so the storage is released even when
        // unwinding out of a panicking destructor.
        let _dealloc_guard = scopeguard::guard((), move |()| {
            if layout.size() != 0 {
                // SAFETY: The layout matches the one we allocated with.
                unsafe {
                    dealloc(first_slot_ptr.as_ptr().cast(), layout);
                }
            }
        });

        // SAFETY: Slots `0..initialized` are live values that nothing else references
        // (handles keep the arena alive, so none can exist any more).
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                first_slot_ptr.as_ptr(),
                initialized,
            ));
        }
    }
}

impl<T> fmt::Debug for Arena<T> {
    #[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity)
            .field("initialized", &self.initialized)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Arena<u32>: Drop);

    struct DropCounter {
        drops: Rc<Cell<usize>>,
    }

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    struct PanicOnDrop {
        drops: Rc<Cell<usize>>,
        panics: bool,
    }

    impl Drop for PanicOnDrop {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);

            assert!(!self.panics, "destructor panics on purpose");
        }
    }

    #[test]
    fn push_returns_reference_to_stored_value() {
        let mut arena = Arena::<String>::try_new(2).unwrap();

        arena.push("first".to_string()).push_str(" edited");
        arena.push("second".to_string());

        assert_eq!(arena.initialized(), 2);

        // SAFETY: Both slots are initialized and no other references exist.
        unsafe {
            assert_eq!(arena.slot_ptr(0).as_ref(), "first edited");
            assert_eq!(arena.slot_ptr(1).as_ref(), "second");
        }
    }

    #[test]
    fn drop_destructs_only_initialized_prefix() {
        let drops = Rc::new(Cell::new(0));

        let mut arena = Arena::try_new(5).unwrap();
        for _ in 0..3 {
            arena.push(DropCounter {
                drops: Rc::clone(&drops),
            });
        }

        drop(arena);

        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn panicking_destructor_still_drops_other_values_and_releases_storage() {
        let drops = Rc::new(Cell::new(0));

        let mut arena = Arena::try_new(4).unwrap();
        for index in 0..4 {
            arena.push(PanicOnDrop {
                drops: Rc::clone(&drops),
                panics: index == 1,
            });
        }

        let result = catch_unwind(AssertUnwindSafe(move || drop(arena)));

        assert!(result.is_err());

        // Every destructor ran, including the ones after the panicking value. The storage
        // itself is released by the guard during the unwind (Miri reports a leak otherwise).
        assert_eq!(drops.get(), 4);
    }

    #[test]
    fn zero_sized_values_need_no_allocation() {
        let mut arena = Arena::<()>::try_new(1000).unwrap();

        for _ in 0..1000 {
            arena.push(());
        }

        assert_eq!(arena.initialized(), 1000);
        assert_eq!(arena.capacity(), 1000);
    }

    #[test]
    fn impossible_layout_is_allocation_failure() {
        let result = Arena::<u64>::try_new(usize::MAX);

        assert!(matches!(
            result,
            Err(Error::AllocationFailed {
                capacity: usize::MAX,
                ..
            })
        ));
    }

    #[test]
    #[should_panic]
    fn push_past_capacity_panics() {
        let mut arena = Arena::<u32>::try_new(1).unwrap();

        arena.push(1);
        arena.push(2);
    }

    #[test]
    #[should_panic]
    fn slot_ptr_to_uninitialized_slot_panics() {
        let mut arena = Arena::<u32>::try_new(2).unwrap();
        arena.push(1);

        _ = arena.slot_ptr(1);
    }
}
