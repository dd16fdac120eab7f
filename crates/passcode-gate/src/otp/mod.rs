//! One-time passcode issuance and verification.
//!
//! ```text
//! request_otp: RestrictionChecker → RequestTracker → OtpIssuer
//! verify_otp:  OtpVerifier
//!                  ↓
//!              KvStore (all state, TTL-expired)
//! ```

mod issuer;
mod restrictions;
mod service;
mod tracker;
mod verifier;

pub use issuer::OtpIssuer;
pub use restrictions::RestrictionChecker;
pub use service::OtpService;
pub use tracker::RequestTracker;
pub use verifier::OtpVerifier;

use std::time::Duration;

use passcode_common::Identity;
use passcode_common::constants::{self, redis_keys};

use crate::store::Expiry;

/// Durations and thresholds of the OTP state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpPolicy {
    /// Lifetime of an issued code
    pub otp_ttl: Duration,
    /// Lifetime of the failed-attempt counter, refreshed on each failure
    pub attempts_ttl: Duration,
    /// Spacing between two issued codes
    pub cooldown: Duration,
    /// Fixed window of the request counter, refreshed on each request
    pub request_window: Duration,
    /// Lockout after too many wrong codes
    pub account_lock: Duration,
    /// Lockout after too many requests
    pub spam_lock: Duration,
    /// Requests allowed per window
    pub max_requests: u64,
    /// Wrong codes tolerated before the next one locks the account
    pub max_failed_attempts: u64,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            otp_ttl: Duration::from_secs(constants::OTP_TTL_SECS),
            attempts_ttl: Duration::from_secs(constants::ATTEMPTS_TTL_SECS),
            cooldown: Duration::from_secs(constants::COOLDOWN_SECS),
            request_window: Duration::from_secs(constants::REQUEST_WINDOW_SECS),
            account_lock: Duration::from_secs(constants::ACCOUNT_LOCK_SECS),
            spam_lock: Duration::from_secs(constants::SPAM_LOCK_SECS),
            max_requests: constants::MAX_OTP_REQUESTS,
            max_failed_attempts: constants::MAX_FAILED_ATTEMPTS,
        }
    }
}

/// Store keys of one identity
#[derive(Debug, Clone)]
pub struct OtpKeys {
    pub account_lock: String,
    pub spam_lock: String,
    pub cooldown: String,
    pub request_count: String,
    pub otp: String,
    pub attempts: String,
}

impl OtpKeys {
    pub fn new(identity: &Identity) -> Self {
        let id = identity.as_str();
        Self {
            account_lock: format!("{}{id}", redis_keys::ACCOUNT_LOCK_PREFIX),
            spam_lock: format!("{}{id}", redis_keys::SPAM_LOCK_PREFIX),
            cooldown: format!("{}{id}", redis_keys::COOLDOWN_PREFIX),
            request_count: format!("{}{id}", redis_keys::REQUEST_COUNT_PREFIX),
            otp: format!("{}{id}", redis_keys::OTP_PREFIX),
            attempts: format!("{}{id}", redis_keys::ATTEMPTS_PREFIX),
        }
    }
}

/// Remaining lock time as reported by the store, or the policy duration
/// when the marker was stored without expiry.
fn remaining_or(expiry: Expiry, fallback: Duration) -> Duration {
    match expiry {
        Expiry::In(left) => left,
        Expiry::Persistent => fallback,
    }
}
