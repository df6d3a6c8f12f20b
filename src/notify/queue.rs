//! Notification queue
//!
//! Publishing an article enqueues a job on an in-process channel; a worker
//! task drains the queue and sends subscriber emails. Enqueueing never
//! blocks the request path and a full or closed queue is logged, not
//! surfaced to the caller.

use tokio::sync::mpsc;
use tracing::warn;

/// A queued notification job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationJob {
    /// An article was published into the given categories
    ArticlePublished {
        /// The article's post id
        post_id: i64,
        /// Categories the article was newly attached to
        category_ids: Vec<i64>,
    },
}

/// Sending half of the notification queue
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<NotificationJob>,
}

impl NotificationQueue {
    /// Create a queue and its receiving end.
    ///
    /// The receiver goes to the worker; the sender is cloned into services.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotificationJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue a job. Errors (worker gone) are logged and swallowed.
    pub fn enqueue(&self, job: NotificationJob) {
        if let Err(e) = self.tx.send(job) {
            warn!("Notification queue closed, dropping job: {}", e);
        }
    }
}
