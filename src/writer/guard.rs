use std::sync::atomic::{AtomicBool, Ordering};

/// Non-reentrant in-process flush lock. A second flush is refused, not queued.
#[derive(Debug, Default)]
pub struct FlushGuard {
    in_use: AtomicBool,
}

/// Held while a flush runs; releases the guard when dropped.
#[derive(Debug)]
pub struct FlushPermit<'a> {
    guard: &'a FlushGuard,
}

impl FlushGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<FlushPermit<'_>> {
        self.in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlushPermit { guard: self })
    }

    pub fn is_locked(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }
}

impl Drop for FlushPermit<'_> {
    fn drop(&mut self) {
        self.guard.in_use.store(false, Ordering::Release);
    }
}
