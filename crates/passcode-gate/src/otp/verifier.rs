//! Code verification with failed-attempt counting and lockout.
//!
//! Per identity the store holds one of:
//! - no code: every submission fails with `ExpiredOrInvalid`
//! - a pending code (plus 0..=2 recorded failures)
//!
//! A match clears the code and its counter in one compare-and-delete, so a
//! code is redeemed at most once; the third mismatch sets the account lock
//! and clears both. Natural expiry ends in the same place.

use std::sync::Arc;

use constant_time_eq::constant_time_eq;
use passcode_common::constants::LOCKED_MARKER;
use passcode_common::{Identity, OtpCode, OtpError};

use super::{OtpKeys, OtpPolicy, remaining_or};
use crate::store::{KvStore, StoreOp};

pub struct OtpVerifier {
    store: Arc<dyn KvStore>,
    policy: OtpPolicy,
}

impl OtpVerifier {
    pub fn new(store: Arc<dyn KvStore>, policy: OtpPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn verify(&self, identity: &Identity, submitted: &OtpCode) -> Result<(), OtpError> {
        let keys = OtpKeys::new(identity);

        // A locked identity cannot redeem a code issued before the lock
        if let Some(ttl) = self.store.ttl(&keys.account_lock).await? {
            return Err(OtpError::AccountLocked {
                retry_after: remaining_or(ttl, self.policy.account_lock),
            });
        }

        // Never-issued and expired look the same to the caller
        let Some(stored) = self.store.get(&keys.otp).await? else {
            tracing::debug!(identity = %identity.masked(), "No active OTP");
            return Err(OtpError::ExpiredOrInvalid);
        };

        if constant_time_eq(stored.as_bytes(), submitted.as_str().as_bytes()) {
            // Only the caller whose delete lands redeems the code
            let redeemed = self
                .store
                .del_if_eq(&keys.otp, &stored, std::slice::from_ref(&keys.attempts))
                .await?;
            if !redeemed {
                tracing::debug!(
                    identity = %identity.masked(),
                    "OTP redeemed or replaced concurrently"
                );
                return Err(OtpError::ExpiredOrInvalid);
            }
            tracing::info!(identity = %identity.masked(), "OTP verified");
            return Ok(());
        }

        let failed = self
            .store
            .incr_capped(
                &keys.attempts,
                self.policy.max_failed_attempts,
                self.policy.attempts_ttl,
            )
            .await?;

        match failed {
            Some(failed) => {
                let remaining = self.policy.max_failed_attempts.saturating_sub(failed);
                tracing::debug!(
                    identity = %identity.masked(),
                    failed,
                    remaining,
                    "Incorrect OTP"
                );
                Err(OtpError::IncorrectOtp { remaining })
            }
            None => {
                self.store
                    .apply(&[
                        StoreOp::set(keys.account_lock, LOCKED_MARKER, self.policy.account_lock),
                        StoreOp::Del(vec![keys.otp, keys.attempts]),
                    ])
                    .await?;

                tracing::warn!(
                    identity = %identity.masked(),
                    lock_secs = self.policy.account_lock.as_secs(),
                    "Account locked due to failed OTP attempts"
                );

                Err(OtpError::AccountLocked {
                    retry_after: self.policy.account_lock,
                })
            }
        }
    }
}
