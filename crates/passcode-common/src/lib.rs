//! # Passcode Common
//!
//! Shared types, errors, and constants used across Passcode Gate components.
//!
//! ## Modules
//! - `types` - Identity, OtpCode, mail variables, registration payloads
//! - `error` - The OTP error taxonomy
//! - `constants` - Policy defaults and key prefixes

pub mod constants;
pub mod error;
pub mod types;

pub use error::OtpError;
pub use types::*;
