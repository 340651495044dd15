use std::collections::TryReserveError;

use crate::{Error, Result};

/// Tracks which slots of a pool are available for checkout.
///
/// Free slots are kept on a stack of slot indices (the most recently freed slot is the next one
/// to be checked out). The bookkeeping lives entirely outside the arena, so the value storage
/// is never reinterpreted as link storage.
///
/// Every checkout bumps the generation of the slot. A [`Checkout`] remembers the generation it
/// was issued under and a release is only accepted if the slot is still checked out under that
/// same generation, which turns a second release of the same checkout into a reported error
/// instead of a corrupted free list.
#[derive(Debug)]
pub(crate) struct FreeList {
    /// Indices of the free slots. The last element is the head of the free list.
    free: Vec<usize>,

    /// Indexed by slot index.
    slots: Vec<SlotMeta>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SlotState {
    Free,
    CheckedOut,
}

#[derive(Clone, Copy, Debug)]
struct SlotMeta {
    state: SlotState,

    /// Incremented every time the slot is checked out.
    generation: u64,
}

/// Identifies one checkout cycle of one slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Checkout {
    slot_index: usize,
    generation: u64,
}

impl Checkout {
    #[must_use]
    pub(crate) fn slot_index(self) -> usize {
        self.slot_index
    }

    #[must_use]
    pub(crate) fn generation(self) -> u64 {
        self.generation
    }
}

impl FreeList {
    /// Creates an empty free list that can track up to `capacity` slots without reallocating.
    pub(crate) fn try_with_capacity(capacity: usize) -> std::result::Result<Self, TryReserveError> {
        let mut free = Vec::new();
        free.try_reserve_exact(capacity)?;

        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;

        Ok(Self { free, slots })
    }

    /// Registers the next slot (index `self.capacity()`) and pushes it onto the head of the
    /// free list. Returns the index of the new slot.
    pub(crate) fn push_new(&mut self) -> usize {
        let slot_index = self.slots.len();

        self.slots.push(SlotMeta {
            state: SlotState::Free,
            generation: 0,
        });
        self.free.push(slot_index);

        slot_index
    }

    /// The number of slots tracked by the free list, free or not.
    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Pops the head of the free list, or returns `None` if every slot is checked out.
    pub(crate) fn checkout(&mut self) -> Option<Checkout> {
        let slot_index = self.free.pop()?;

        let meta = self
            .slots
            .get_mut(slot_index)
            .expect("free list only contains indices of registered slots");

        debug_assert_eq!(meta.state, SlotState::Free);

        meta.state = SlotState::CheckedOut;
        meta.generation = meta
            .generation
            .checked_add(1)
            .expect("a slot cannot realistically be checked out u64::MAX times");

        Some(Checkout {
            slot_index,
            generation: meta.generation,
        })
    }

    /// Pushes the slot of `checkout` back onto the head of the free list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DoubleRelease`] if the slot is not currently checked out under the
    /// generation of `checkout`. The free list is left untouched in that case.
    pub(crate) fn release(&mut self, checkout: Checkout) -> Result<()> {
        let double_release = Error::DoubleRelease {
            slot_index: checkout.slot_index,
            generation: checkout.generation,
        };

        let Some(meta) = self.slots.get_mut(checkout.slot_index) else {
            return Err(double_release);
        };

        if meta.state != SlotState::CheckedOut || meta.generation != checkout.generation {
            return Err(double_release);
        }

        meta.state = SlotState::Free;
        self.free.push(checkout.slot_index);

        Ok(())
    }

    /// O(capacity) with an allocation, so only ever called from tests.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        let mut seen_on_stack = vec![false; self.slots.len()];

        for &slot_index in &self.free {
            let seen = seen_on_stack
                .get_mut(slot_index)
                .expect("free list contains an index of an unregistered slot");

            assert!(!*seen, "slot {slot_index} is on the free list twice");
            *seen = true;
        }

        for (slot_index, (meta, on_stack)) in self.slots.iter().zip(&seen_on_stack).enumerate() {
            assert_eq!(
                meta.state == SlotState::Free,
                *on_stack,
                "slot {slot_index} is {:?} but its free list membership is {on_stack}",
                meta.state
            );
        }
    }
}
