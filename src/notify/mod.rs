//! Notification layer
//!
//! In-process notification queue, SMTP mail transport, subscriber
//! notifications for new articles and the weekly digest.

pub mod digest;
pub mod mailer;
pub mod queue;
pub mod worker;

pub use digest::{run_digest_scheduler, send_weekly_digest};
pub use mailer::{MailTransport, Mailer, SmtpMailTransport};
pub use queue::{NotificationJob, NotificationQueue};
pub use worker::{article_link, notify_article, run_worker};
