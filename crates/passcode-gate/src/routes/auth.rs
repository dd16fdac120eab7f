//! Registration and password reset endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use passcode_common::{AccountKind, RegistrationData};

use super::{ApiError, StatusResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterBody {
    #[serde(flatten)]
    data: RegistrationData,
    #[serde(default)]
    kind: AccountKind,
}

/// Validate a sign-up and mail the activation code
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterBody>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    state.accounts.register(&payload.data, payload.kind).await?;
    Ok((StatusCode::ACCEPTED, Json(StatusResponse { status: "otp_sent" })))
}

#[derive(Deserialize)]
pub struct ForgotPasswordBody {
    email: String,
}

/// Mail a password reset code to a known user
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordBody>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    state.accounts.forgot_password(&payload.email).await?;
    Ok((StatusCode::ACCEPTED, Json(StatusResponse { status: "otp_sent" })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{app, post_json};

    #[tokio::test]
    async fn test_register_seller() {
        let (app, notifier) = app();

        let (status, _body) = post_json(
            &app,
            "/auth/register",
            json!({
                "name": "Shop Owner",
                "email": "shop@example.com",
                "password": "s3cret!",
                "phone_number": "+15550100",
                "country": "US",
                "kind": "seller"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(notifier.last().unwrap().template, "seller-activation-mail");

        let code = notifier.last_code().unwrap();
        let (status, _body) = post_json(
            &app,
            "/auth/verify",
            json!({ "email": "shop@example.com", "otp": code }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_missing_fields() {
        let (app, notifier) = app();

        let (status, body) = post_json(
            &app,
            "/auth/register",
            json!({ "name": "John", "email": "john@example.com" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid input: Missing required fields!");
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_user() {
        let (app, _notifier) = app();

        let (status, body) = post_json(
            &app,
            "/auth/forgot-password",
            json!({ "email": "ghost@example.com" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_forgot_password_known_user() {
        let (app, notifier) = app();

        let (status, _body) = post_json(
            &app,
            "/auth/forgot-password",
            json!({ "email": "jane@example.com" }),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(notifier.last().unwrap().mail.name, "Jane");
    }
}
