//! Notification senders.
//!
//! The code only ever leaves the process through a `Notifier`.

mod log_sender;
mod outbox;

pub use self::log_sender::LogNotifier;
pub use self::outbox::OutboxNotifier;

use async_trait::async_trait;
use passcode_common::{Identity, OtpError, OtpMail};

/// Delivery of a templated mail carrying the code
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `mail` to `identity`. Any failure must be returned, never swallowed.
    async fn send(
        &self,
        identity: &Identity,
        subject: &str,
        template_id: &str,
        mail: &OtpMail,
    ) -> Result<(), OtpError>;
}
