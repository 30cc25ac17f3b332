use std::time::Duration;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Runs the latest submitted job once calls have been quiet for `delay`.
///
/// Every call restarts the timer; superseded jobs never run. The job itself
/// runs on tokio's blocking pool.
pub struct Debouncer {
    pub delay: Duration,
    handle: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration, handle: Handle) -> Self {
        Debouncer {
            delay,
            handle,
            pending: Mutex::new(None),
        }
    }

    pub fn call<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.delay;
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tokio::task::spawn_blocking(job).await;
        });
        if let Some(previous) = self.pending.lock().replace(task) {
            previous.abort();
        }
    }

    /// Drop the pending job, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
