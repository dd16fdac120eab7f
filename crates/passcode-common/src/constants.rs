//! Shared constants for Passcode Gate components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8890";

/// Account lock duration after repeated wrong codes (30 minutes)
pub const ACCOUNT_LOCK_SECS: u64 = 1800;

/// Spam lock duration after too many OTP requests (1 hour)
pub const SPAM_LOCK_SECS: u64 = 3600;

/// Minimum spacing between two issued codes (1 minute)
pub const COOLDOWN_SECS: u64 = 60;

/// Request counter window (1 hour, fixed window)
pub const REQUEST_WINDOW_SECS: u64 = 3600;

/// Lifetime of an issued code (5 minutes)
pub const OTP_TTL_SECS: u64 = 300;

/// Lifetime of the failed attempt counter (same as the code)
pub const ATTEMPTS_TTL_SECS: u64 = 300;

/// Requests allowed per window before the spam lock is set
pub const MAX_OTP_REQUESTS: u64 = 2;

/// Wrong guesses tolerated; the next one locks the account
pub const MAX_FAILED_ATTEMPTS: u64 = 2;

/// Default deadline for a single request/verify operation
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5000;

/// Inclusive bounds of generated codes
pub const OTP_MIN: u16 = 1000;
pub const OTP_MAX: u16 = 9999;

/// Number of digits in a code
pub const OTP_LEN: usize = 4;

/// Subject line of every OTP mail
pub const OTP_MAIL_SUBJECT: &str = "Verify your Email";

/// Marker values
pub const LOCKED_MARKER: &str = "locked";
pub const COOLDOWN_MARKER: &str = "true";

/// Redis key prefixes
pub mod redis_keys {
    /// Account lock: lock:{identity}
    pub const ACCOUNT_LOCK_PREFIX: &str = "lock:";

    /// Spam lock: spam_lock:{identity}
    pub const SPAM_LOCK_PREFIX: &str = "spam_lock:";

    /// Cooldown marker: cooldown:{identity}
    pub const COOLDOWN_PREFIX: &str = "cooldown:";

    /// Request counter: request_count:{identity}
    pub const REQUEST_COUNT_PREFIX: &str = "request_count:";

    /// Active code: otp:{identity}
    pub const OTP_PREFIX: &str = "otp:";

    /// Failed attempts: attempts:{identity}
    pub const ATTEMPTS_PREFIX: &str = "attempts:";

    /// Outbox list consumed by the mailer
    pub const MAIL_OUTBOX: &str = "mail:outbox";
}

/// Mail template identifiers
pub mod templates {
    pub const USER_ACTIVATION: &str = "user-activation-mail";
    pub const SELLER_ACTIVATION: &str = "seller-activation-mail";
    pub const FORGOT_PASSWORD: &str = "forgot-password-user-mail";
}
