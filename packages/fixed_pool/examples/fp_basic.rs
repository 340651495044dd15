//! Basic usage of the `fixed_pool` crate:
//!
//! * Creating a pool with a per-value initializer.
//! * Acquiring exclusive and shared handles.
//! * Observing exhaustion and LIFO reuse.
//!
//! The pool's `tracing` events are printed to stdout.

use fixed_pool::FixedPool;
use tracing::Level;

#[derive(Debug)]
struct Session {
    id: usize,
    requests: u32,
}

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::TRACE).init();

    let mut next_id = 0;

    let mut pool = FixedPool::builder()
        .capacity(3)
        .initializer(move |session: &mut Session| {
            session.id = next_id;
            next_id += 1;
        })
        .build_with(|| Session { id: 0, requests: 0 })
        .expect("a pool of three small values can always be created");

    println!(
        "Pool has {} free sessions out of {}",
        pool.free_count(),
        pool.capacity()
    );

    // The session constructed last is handed out first.
    let mut alice = pool.acquire_mut().expect("pool was just created");
    alice.requests += 1;
    println!("Alice got {alice:?}");

    // Shared handles can be cloned; the session is returned once every clone is gone.
    let bob = pool.acquire().expect("two sessions are still free");
    let bob_again = bob.clone();
    println!("Bob got {:?} ({} aliases)", *bob, bob.ref_count());

    let charlie = pool.acquire().expect("one session is still free");
    println!("Charlie got {:?}", *charlie);

    // There is no waiting and no growth - an exhausted pool simply says no.
    assert!(pool.acquire().is_none());
    println!("Pool is exhausted: {}", pool.is_exhausted());

    drop(bob);
    println!("After Bob let go of one alias: {} free", pool.free_count());

    drop(bob_again);
    println!("After the last alias was dropped: {} free", pool.free_count());

    // Alice's session keeps its state when it comes back around.
    let alice_id = alice.id;
    drop(alice);

    let dave = pool.acquire().expect("Alice's session was just released");
    assert_eq!(dave.id, alice_id);
    println!("Dave reuses Alice's session: {:?}", *dave);

    drop(charlie);
    drop(dave);
}
