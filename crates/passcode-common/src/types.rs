//! Core types shared across Passcode Gate components.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{OTP_LEN, OTP_MAX, OTP_MIN, templates};
use crate::error::OtpError;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// The handle every piece of OTP state is keyed by.
///
/// Always a trimmed, ASCII-lowercased email address so that `Foo@x.io` and
/// `foo@x.io ` share one set of counters and locks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn parse(raw: &str) -> Result<Self, OtpError> {
        let email = raw.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(OtpError::InvalidInput("Email is required".to_string()));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(OtpError::InvalidInput("Invalid email format!".to_string()));
        }
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe rendering: `j***@example.com`
    pub fn masked(&self) -> String {
        match self.0.split_once('@') {
            Some((local, domain)) => {
                let first = local.chars().next().unwrap_or('*');
                format!("{first}***@{domain}")
            }
            None => "***".to_string(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A four digit passcode.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Parse a code submitted by a caller
    pub fn parse(raw: &str) -> Result<Self, OtpError> {
        let code = raw.trim();
        if code.len() != OTP_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpError::InvalidInput(format!(
                "OTP must be exactly {OTP_LEN} digits"
            )));
        }
        Ok(Self(code.to_string()))
    }

    /// Build a code from a generated number in `[OTP_MIN, OTP_MAX]`
    pub fn from_number(value: u16) -> Result<Self, OtpError> {
        if !(OTP_MIN..=OTP_MAX).contains(&value) {
            return Err(OtpError::InvalidInput(format!(
                "OTP {value} outside {OTP_MIN}..={OTP_MAX}"
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes never end up in logs through `{:?}`.
impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(****)")
    }
}

/// Template variables handed to the notification sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpMail {
    pub name: String,
    pub otp: String,
}

/// Kind of account being registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    User,
    Seller,
}

impl AccountKind {
    /// Template used for the activation mail of this kind
    pub fn activation_template(&self) -> &'static str {
        match self {
            Self::User => templates::USER_ACTIVATION,
            Self::Seller => templates::SELLER_ACTIVATION,
        }
    }
}

/// Sign-up payload
#[derive(Clone, Default, Deserialize)]
pub struct RegistrationData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl RegistrationData {
    /// Check required fields for `kind` and return the parsed identity
    pub fn validate(&self, kind: AccountKind) -> Result<Identity, OtpError> {
        let blank = |value: &str| value.trim().is_empty();
        let missing_opt = |value: &Option<String>| value.as_deref().is_none_or(blank);

        if blank(&self.name)
            || blank(&self.email)
            || blank(&self.password)
            || (kind == AccountKind::Seller
                && (missing_opt(&self.phone_number) || missing_opt(&self.country)))
        {
            return Err(OtpError::InvalidInput("Missing required fields!".to_string()));
        }

        Identity::parse(&self.email)
    }
}

/// A row of the identity directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub name: String,
}

/// Render a remaining duration the way users read it: "30 minutes", "1 hour"
pub fn humanize(duration: &Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        return plural(secs, "second");
    }

    let minutes = secs.div_ceil(60);
    if minutes < 60 {
        return plural(minutes, "minute");
    }

    let (hours, minutes) = (minutes / 60, minutes % 60);
    if minutes == 0 {
        plural(hours, "hour")
    } else {
        format!("{} {}", plural(hours, "hour"), plural(minutes, "minute"))
    }
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}
