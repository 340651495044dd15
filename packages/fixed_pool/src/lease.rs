use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;
use std::thread;

use tracing::{debug, error, trace};

use crate::{Checkout, PoolCore};

/// One checkout of one slot. When dropped, returns the slot to the pool it came from.
///
/// Every handle type is a thin wrapper around a lease, which keeps the pool core (and with it
/// the arena) alive for as long as the slot is checked out.
pub(crate) struct Lease<T> {
    ptr: NonNull<T>,
    checkout: Checkout,
    core: Rc<PoolCore<T>>,
}

impl<T> Lease<T> {
    /// Checks out the slot at the head of the free list, if there is one.
    pub(crate) fn acquire(core: &Rc<PoolCore<T>>) -> Option<Self> {
        let Some(checkout) = core.checkout() else {
            debug!(
                item_type = type_name::<T>(),
                capacity = core.capacity(),
                "pool exhausted, no free slot to acquire"
            );
            return None;
        };

        trace!(
            slot_index = checkout.slot_index(),
            generation = checkout.generation(),
            free_count = core.free_count(),
            "slot acquired"
        );

        Some(Self {
            ptr: core.slot_ptr(checkout.slot_index()),
            checkout,
            core: Rc::clone(core),
        })
    }

    #[must_use]
    pub(crate) fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    #[must_use]
    pub(crate) fn slot_index(&self) -> usize {
        self.checkout.slot_index()
    }

    #[must_use]
    pub(crate) fn generation(&self) -> u64 {
        self.checkout.generation()
    }
}

impl<T> Drop for Lease<T> {
    fn drop(&mut self) {
        match self.core.release(self.checkout) {
            Ok(()) => trace!(
                slot_index = self.checkout.slot_index(),
                generation = self.checkout.generation(),
                free_count = self.core.free_count(),
                "slot released"
            ),
            Err(e) => {
                error!(error = %e, item_type = type_name::<T>(), "pool rejected a slot release");

                // If we are already panicking, we do not want to panic again because that will
                // simply obscure whatever the original panic was.
                if !thread::panicking() {
                    panic!("{e}");
                }
            }
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<T> fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("slot_index", &self.checkout.slot_index())
            .field("generation", &self.checkout.generation())
            .finish_non_exhaustive()
    }
}
