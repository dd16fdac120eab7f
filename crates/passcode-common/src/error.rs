//! Error kinds returned by the OTP operations.

use std::time::Duration;

use thiserror::Error;

use crate::types::humanize;

/// Every outcome of a request/verify call that is not a success.
///
/// Policy outcomes (locks, throttling, wrong codes) are ordinary results the
/// caller is expected to branch on; infrastructure failures carry enough
/// context to decide on a retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    /// Too many wrong codes, identity is locked out
    #[error("Account locked due to multiple failed attempts! Try again after {}", humanize(.retry_after))]
    AccountLocked { retry_after: Duration },

    /// Too many OTP requests in the current window
    #[error("Too many OTP requests! Please wait {} before trying again.", humanize(.retry_after))]
    RequestThrottled { retry_after: Duration },

    /// A code was issued moments ago
    #[error("Please wait {} before requesting a new OTP.", humanize(.retry_after))]
    CooldownActive { retry_after: Duration },

    /// No live code for this identity
    #[error("Invalid or expired OTP!")]
    ExpiredOrInvalid,

    /// Wrong code, `remaining` more wrong guesses are tolerated
    #[error("Incorrect OTP. {remaining} attempts left.")]
    IncorrectOtp { remaining: u64 },

    /// The notification collaborator refused or failed the delivery
    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    /// Key-value store connection/operation error
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The caller deadline lapsed before the operation finished
    #[error("Operation timed out: {0}")]
    Unavailable(String),

    /// Malformed identity, code, or request payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl OtpError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AccountLocked { .. } => 423,
            Self::RequestThrottled { .. } => 429,
            Self::CooldownActive { .. } => 429,
            Self::ExpiredOrInvalid => 400,
            Self::IncorrectOtp { .. } => 401,
            Self::NotificationFailed(_) => 502,
            Self::StoreUnavailable(_) => 503,
            Self::Unavailable(_) => 504,
            Self::InvalidInput(_) => 400,
        }
    }

    /// Returns true if the caller may retry the same call later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotificationFailed(_) | Self::StoreUnavailable(_) | Self::Unavailable(_)
        )
    }

    /// Stable machine-readable kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccountLocked { .. } => "account_locked",
            Self::RequestThrottled { .. } => "request_throttled",
            Self::CooldownActive { .. } => "cooldown_active",
            Self::ExpiredOrInvalid => "expired_or_invalid",
            Self::IncorrectOtp { .. } => "incorrect_otp",
            Self::NotificationFailed(_) => "notification_failed",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Unavailable(_) => "unavailable",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    /// Seconds until a lock or cooldown lapses, if this error has one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::AccountLocked { retry_after }
            | Self::RequestThrottled { retry_after }
            | Self::CooldownActive { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_messages_carry_remaining_time() {
        let err = OtpError::AccountLocked {
            retry_after: Duration::from_secs(1800),
        };
        assert_eq!(
            err.to_string(),
            "Account locked due to multiple failed attempts! Try again after 30 minutes"
        );

        let err = OtpError::RequestThrottled {
            retry_after: Duration::from_secs(3600),
        };
        assert_eq!(
            err.to_string(),
            "Too many OTP requests! Please wait 1 hour before trying again."
        );

        let err = OtpError::CooldownActive {
            retry_after: Duration::from_secs(60),
        };
        assert_eq!(err.to_string(), "Please wait 1 minute before requesting a new OTP.");
    }

    #[test]
    fn test_incorrect_otp_message() {
        let err = OtpError::IncorrectOtp { remaining: 1 };
        assert_eq!(err.to_string(), "Incorrect OTP. 1 attempts left.");
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(OtpError::StoreUnavailable("down".into()).is_retryable());
        assert!(OtpError::NotificationFailed("bounced".into()).is_retryable());
        assert!(OtpError::Unavailable("deadline".into()).is_retryable());
        assert!(!OtpError::ExpiredOrInvalid.is_retryable());
        assert!(!OtpError::IncorrectOtp { remaining: 0 }.is_retryable());
    }

    #[test]
    fn test_retry_after_only_on_markers() {
        let cooldown = OtpError::CooldownActive {
            retry_after: Duration::from_secs(42),
        };
        assert_eq!(cooldown.retry_after(), Some(Duration::from_secs(42)));
        assert_eq!(OtpError::ExpiredOrInvalid.retry_after(), None);
        assert_eq!(cooldown.status_code(), 429);
        assert_eq!(cooldown.code(), "cooldown_active");
    }
}
