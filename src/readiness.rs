//! Readiness gate consulted before every emission

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A side-effect-free query, safe to call from any thread.
///
/// The scheduler never hands its own state to a gate, so an implementation
/// backed by a concurrently running consumer cannot observe or corrupt it.
pub trait ReadinessGate: Send + Sync {
    fn is_ready(&self) -> bool;
}

/// The default gate: emission is never held back.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl ReadinessGate for AlwaysReady {
    fn is_ready(&self) -> bool {
        true
    }
}

/// A shared flag a downstream consumer flips, e.g. while its optimizer or
/// loop closure is busy.
#[derive(Debug, Clone)]
pub struct ReadyFlag(Arc<AtomicBool>);

impl ReadyFlag {
    pub fn new(ready: bool) -> Self {
        Self(Arc::new(AtomicBool::new(ready)))
    }

    pub fn set(&self, ready: bool) {
        self.0.store(ready, Ordering::Release);
    }
}

impl Default for ReadyFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ReadinessGate for ReadyFlag {
    fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl<F> ReadinessGate for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_ready(&self) -> bool {
        self()
    }
}
