//! Development sender that only logs.

use async_trait::async_trait;
use passcode_common::{Identity, OtpError, OtpMail};

use super::Notifier;

/// Logs each delivery; the code itself only at debug level
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        identity: &Identity,
        subject: &str,
        template_id: &str,
        mail: &OtpMail,
    ) -> Result<(), OtpError> {
        tracing::info!(
            identity = %identity.masked(),
            subject = subject,
            template = template_id,
            "OTP mail dispatched (log sender)"
        );
        tracing::debug!(identity = %identity, name = %mail.name, otp = %mail.otp, "OTP mail body");

        Ok(())
    }
}
