//! Account flows that need an OTP: registration and password reset.

mod directory;
mod flows;

pub use directory::{IdentityDirectory, InMemoryDirectory};
pub use flows::AccountFlows;
