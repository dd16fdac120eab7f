//! Sign-up and password reset flows built on the OTP service.

use std::sync::Arc;

use passcode_common::constants::templates;
use passcode_common::{AccountKind, Identity, OtpError, RegistrationData};

use super::IdentityDirectory;
use crate::otp::OtpService;

pub struct AccountFlows {
    directory: Arc<dyn IdentityDirectory>,
    otp: Arc<OtpService>,
}

impl AccountFlows {
    pub fn new(directory: Arc<dyn IdentityDirectory>, otp: Arc<OtpService>) -> Self {
        Self { directory, otp }
    }

    /// Validate a sign-up and send the activation code.
    ///
    /// Creating the account itself is up to the directory owner once the
    /// code has been verified.
    pub async fn register(
        &self,
        data: &RegistrationData,
        kind: AccountKind,
    ) -> Result<(), OtpError> {
        let identity = data.validate(kind)?;

        if self.directory.find_by_email(&identity).await?.is_some() {
            return Err(OtpError::InvalidInput(
                "User already exists with this email!".to_string(),
            ));
        }

        self.otp
            .request_otp(identity.as_str(), &data.name, kind.activation_template())
            .await?;

        tracing::info!(identity = %identity.masked(), kind = ?kind, "Registration OTP sent");
        Ok(())
    }

    /// Send a password reset code to a known user
    pub async fn forgot_password(&self, email: &str) -> Result<(), OtpError> {
        let identity = Identity::parse(email)?;

        let Some(user) = self.directory.find_by_email(&identity).await? else {
            return Err(OtpError::InvalidInput("User not found!".to_string()));
        };

        self.otp
            .request_otp(identity.as_str(), &user.name, templates::FORGOT_PASSWORD)
            .await?;

        tracing::info!(identity = %identity.masked(), "Password reset OTP sent");
        Ok(())
    }

    /// Confirm a registration or reset code
    pub async fn verify(&self, email: &str, otp: &str) -> Result<(), OtpError> {
        self.otp.verify_otp(email, otp).await
    }
}
