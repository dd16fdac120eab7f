//! Code generation, dispatch, and storage.

use std::sync::Arc;

use passcode_common::constants::{COOLDOWN_MARKER, OTP_MAIL_SUBJECT, OTP_MAX, OTP_MIN};
use passcode_common::{Identity, OtpCode, OtpError, OtpMail};
use rand::Rng;

use super::{OtpKeys, OtpPolicy};
use crate::notify::Notifier;
use crate::store::{KvStore, StoreOp};

/// Generate a code uniformly over `[OTP_MIN, OTP_MAX]`.
///
/// `rand::rng()` is a CSPRNG seeded from the OS.
pub fn generate_code() -> Result<OtpCode, OtpError> {
    let value = rand::rng().random_range(OTP_MIN..=OTP_MAX);
    OtpCode::from_number(value)
}

/// Issues a fresh code for an identity.
///
/// Performs no restriction checks; `OtpService` runs those first.
pub struct OtpIssuer {
    store: Arc<dyn KvStore>,
    notifier: Arc<dyn Notifier>,
    policy: OtpPolicy,
}

impl OtpIssuer {
    pub fn new(store: Arc<dyn KvStore>, notifier: Arc<dyn Notifier>, policy: OtpPolicy) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    /// Send a new code to `identity` and make it the active one.
    ///
    /// Nothing is stored unless delivery succeeded. The code is not returned.
    pub async fn issue(
        &self,
        identity: &Identity,
        display_name: &str,
        template: &str,
    ) -> Result<(), OtpError> {
        let keys = OtpKeys::new(identity);
        let code = generate_code()?;
        let mail = OtpMail {
            name: display_name.to_string(),
            otp: code.as_str().to_string(),
        };

        self.notifier
            .send(identity, OTP_MAIL_SUBJECT, template, &mail)
            .await
            .map_err(|err| match err {
                OtpError::NotificationFailed(_) => err,
                other => OtpError::NotificationFailed(other.to_string()),
            })?;

        // Supersedes any previous code
        self.store
            .apply(&[
                StoreOp::set(keys.otp, code.as_str(), self.policy.otp_ttl),
                StoreOp::set(keys.cooldown, COOLDOWN_MARKER, self.policy.cooldown),
            ])
            .await?;

        tracing::info!(
            identity = %identity.masked(),
            template = template,
            ttl_secs = self.policy.otp_ttl.as_secs(),
            "OTP issued"
        );

        Ok(())
    }
}
