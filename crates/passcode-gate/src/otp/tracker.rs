//! Fixed-window OTP request counter with spam-lock escalation.

use std::sync::Arc;

use passcode_common::constants::LOCKED_MARKER;
use passcode_common::{Identity, OtpError};

use super::{OtpKeys, OtpPolicy};
use crate::store::KvStore;

/// Counts OTP requests per identity.
///
/// The window only resets when the counter key expires; every accepted
/// request pushes that expiry out again.
pub struct RequestTracker {
    store: Arc<dyn KvStore>,
    policy: OtpPolicy,
}

impl RequestTracker {
    pub fn new(store: Arc<dyn KvStore>, policy: OtpPolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the request count including this one.
    ///
    /// At the limit the counter is left as is, the spam lock is set and
    /// `RequestThrottled` returned.
    pub async fn track(&self, identity: &Identity) -> Result<u64, OtpError> {
        let keys = OtpKeys::new(identity);

        let tracked = self
            .store
            .incr_capped(
                &keys.request_count,
                self.policy.max_requests,
                self.policy.request_window,
            )
            .await?;

        match tracked {
            Some(count) => {
                tracing::debug!(identity = %identity.masked(), count, "OTP request tracked");
                Ok(count)
            }
            None => {
                self.store
                    .set_ex(&keys.spam_lock, LOCKED_MARKER, self.policy.spam_lock)
                    .await?;

                tracing::warn!(
                    identity = %identity.masked(),
                    max_requests = self.policy.max_requests,
                    "Identity spam-locked due to repeated OTP requests"
                );

                Err(OtpError::RequestThrottled {
                    retry_after: self.policy.spam_lock,
                })
            }
        }
    }
}
