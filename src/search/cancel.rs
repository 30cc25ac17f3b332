use std::sync::Arc;
use parking_lot::RwLock;

/// Cooperative cancellation signal shared between a search and its caller.
///
/// Results must go through [`CancelToken::run_unless_cancelled`]: the send
/// happens under a read lock and `cancel` takes the write lock, so once
/// `cancel` returns no further result can reach the channel. Senders used
/// this way must be unbounded, or a full channel would block `cancel`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<RwLock<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        *self.inner.write() = true;
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.read()
    }

    /// Run `f` only if the token is still live. Returns `None` when cancelled.
    pub fn run_unless_cancelled<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let cancelled = self.inner.read();
        if *cancelled {
            return None;
        }
        Some(f())
    }
}
