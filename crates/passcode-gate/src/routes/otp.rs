//! OTP request and verification endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use passcode_common::constants::templates;

use super::{ApiError, StatusResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RequestOtpBody {
    email: String,
    /// Display name used in the mail greeting
    name: String,
    /// Mail template, defaults to the user activation mail
    template: Option<String>,
}

/// Issue a new code and send it by mail
pub async fn request_otp(
    State(state): State<AppState>,
    Json(payload): Json<RequestOtpBody>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    let template = payload
        .template
        .as_deref()
        .unwrap_or(templates::USER_ACTIVATION);

    state
        .otp
        .request_otp(&payload.email, &payload.name, template)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(StatusResponse { status: "otp_sent" })))
}

#[derive(Deserialize)]
pub struct VerifyOtpBody {
    email: String,
    otp: String,
}

/// Check a submitted code
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpBody>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.otp.verify_otp(&payload.email, &payload.otp).await?;
    Ok(Json(StatusResponse { status: "verified" }))
}
