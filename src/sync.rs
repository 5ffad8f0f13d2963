//! # Synchronization Primitives
//!
//! The kernel keeps every task, semaphore and event in one registry guarded
//! by a single lock. All reads and writes of that registry, from the
//! creating thread and from the dispatch thread alike, go through
//! [`critical_section`], so each kernel operation is atomic with respect to
//! every other one.

use parking_lot::Mutex;

/// Execute a closure with exclusive access to `state`.
///
/// The lock is released when the closure returns. Task bodies must never be
/// invoked from inside a critical section: bodies call back into the kernel,
/// and the lock is not reentrant.
///
/// # Usage
/// ```ignore
/// sync::critical_section(&kernel.registry, |registry| {
///     // Access registry state safely
/// });
/// ```
#[inline]
pub fn critical_section<T, F, R>(state: &Mutex<T>, f: F) -> R
where
    F: FnOnce(&mut T) -> R,
{
    let mut guard = state.lock();
    f(&mut guard)
}
