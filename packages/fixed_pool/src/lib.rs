#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity object pool that preallocates all of its values in one contiguous arena.
//!
//! This crate provides [`FixedPool`], a single-threaded pool that constructs `capacity` values
//! up front when it is created and then lends them out through handles. When the last handle
//! to a value is dropped, the value goes back to the pool for reuse - it is not dropped and
//! keeps whatever state it had. All values are dropped together when the pool is torn down.
//!
//! # Key Features
//!
//! - **Fixed capacity**: Every value is constructed at creation; acquiring never allocates
//!   pool storage and never grows the pool
//! - **Non-blocking**: [`FixedPool::acquire()`] returns `None` when every value is checked out
//! - **LIFO reuse**: The most recently released value is the next one handed out
//! - **Two handle types**: [`PooledMut<T>`] for exclusive access, [`Pooled<T>`] for shared,
//!   reference-counted access
//! - **All-or-nothing creation**: If constructing any value fails, the values constructed so far
//!   are dropped before the error is returned
//! - **Safe teardown**: Handles keep the pool storage alive, so a handle can never outlive the
//!   values it points to
//!
//! # Example
//!
//! ```rust
//! use fixed_pool::FixedPool;
//!
//! #[derive(Clone)]
//! struct Connection {
//!     host: String,
//!     requests_served: u64,
//! }
//!
//! let mut pool = FixedPool::with_value(
//!     3,
//!     Connection {
//!         host: "db.internal".to_string(),
//!         requests_served: 0,
//!     },
//! )
//! .unwrap();
//!
//! {
//!     let mut connection = pool.acquire_mut().unwrap();
//!     connection.requests_served += 1;
//!     assert_eq!(pool.free_count(), 2);
//! }
//!
//! // Dropping the handle returned the connection to the pool.
//! assert_eq!(pool.free_count(), 3);
//!
//! let connection = pool.acquire().unwrap();
//! assert_eq!(connection.host, "db.internal");
//! assert_eq!(connection.requests_served, 1);
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`] events for pool creation and teardown, exhaustion and
//! construction failures (at `debug` and `warn` levels) as well as for every acquire and
//! release (at `trace` level). No subscriber is installed by the crate itself.

mod arena;
mod builder;
mod error;
mod free_list;
mod lease;
mod pool;
mod pooled;
mod pooled_mut;

pub(crate) use arena::*;
pub use builder::*;
pub use error::*;
pub(crate) use free_list::*;
pub(crate) use lease::*;
pub use pool::*;
pub use pooled::*;
pub use pooled_mut::*;
