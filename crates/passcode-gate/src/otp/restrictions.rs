//! Lock and cooldown checks ahead of a new OTP cycle.

use std::sync::Arc;

use passcode_common::{Identity, OtpError};

use super::{OtpKeys, OtpPolicy, remaining_or};
use crate::store::KvStore;

/// Inspects AccountLock, SpamLock and Cooldown, in that order.
///
/// A 30 minute account lock must never be reported as a 1 minute cooldown,
/// so the first marker found wins.
pub struct RestrictionChecker {
    store: Arc<dyn KvStore>,
    policy: OtpPolicy,
}

impl RestrictionChecker {
    pub fn new(store: Arc<dyn KvStore>, policy: OtpPolicy) -> Self {
        Self { store, policy }
    }

    /// `Ok(())` when no marker is present. Never writes.
    pub async fn check(&self, identity: &Identity) -> Result<(), OtpError> {
        let keys = OtpKeys::new(identity);

        if let Some(ttl) = self.store.ttl(&keys.account_lock).await? {
            tracing::debug!(identity = %identity.masked(), "OTP refused: account locked");
            return Err(OtpError::AccountLocked {
                retry_after: remaining_or(ttl, self.policy.account_lock),
            });
        }

        if let Some(ttl) = self.store.ttl(&keys.spam_lock).await? {
            tracing::debug!(identity = %identity.masked(), "OTP refused: spam lock");
            return Err(OtpError::RequestThrottled {
                retry_after: remaining_or(ttl, self.policy.spam_lock),
            });
        }

        if let Some(ttl) = self.store.ttl(&keys.cooldown).await? {
            tracing::debug!(identity = %identity.masked(), "OTP refused: cooldown");
            return Err(OtpError::CooldownActive {
                retry_after: remaining_or(ttl, self.policy.cooldown),
            });
        }

        Ok(())
    }
}
