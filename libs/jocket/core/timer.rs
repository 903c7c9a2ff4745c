//! Owned task handles
//!
//! Every timer and background request the client starts is held in a
//! [`TaskGuard`]. Dropping the guard aborts the task, so clearing a timer is
//! just dropping (or overwriting) the field that holds it.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// A spawned task that is aborted when the guard is dropped
#[derive(Debug)]
pub struct TaskGuard {
    handle: Option<JoinHandle<()>>,
}

impl TaskGuard {
    /// Spawn `future` on the current runtime
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    /// One-shot timer: deliver `message` on `tx` after `delay`
    pub fn after<T>(delay: Duration, tx: UnboundedSender<T>, message: T) -> Self
    where
        T: Send + 'static,
    {
        Self::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(message);
        })
    }

    /// Let the task run on without the guard
    pub fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_after_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _guard = TaskGuard::after(Duration::from_millis(10), tx, 42u32);

        let value = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(value, Some(42));
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = TaskGuard::after(Duration::from_millis(20), tx, 1u32);
        drop(guard);

        tokio::time::sleep(Duration::from_millis(60)).await;
        // Sender was dropped with the aborted task; nothing was delivered
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_detach_keeps_running() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        TaskGuard::after(Duration::from_millis(10), tx, "done").detach();

        let value = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(value, Some("done"));
    }
}
