//! Cooperative cancellation. The driver polls this at the top of every
//! Newton iteration and every time/sweep point (§5): on a hit it stops
//! immediately and lets the caller unwind, without tearing down anything
//! itself (that's the driver's job, via `Behavior::unsetup`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply cloneable flag shared between the caller and a running
/// simulation. Cloning shares the same underlying flag; setting it from any
/// clone is visible to all of them.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
