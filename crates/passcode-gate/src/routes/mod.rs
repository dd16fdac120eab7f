//! HTTP route handlers for Passcode Gate.

use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use passcode_common::OtpError;

use crate::state::AppState;

mod auth;
mod health;
mod otp;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // Leave the OTP deadline room to fire first
    let http_timeout = state.config.operation_timeout() + Duration::from_secs(5);

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))

        // OTP operations
        .route("/otp/request", post(otp::request_otp))
        .route("/otp/verify", post(otp::verify_otp))

        // Account flows
        .route("/auth/register", post(auth::register))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/verify", post(otp::verify_otp))

        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    http_timeout,
                )),
        )

        // Add shared state
        .with_state(state)
}

/// Plain success body
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_attempts: Option<u64>,
}

/// `OtpError` rendered as an HTTP response
pub struct ApiError(pub OtpError);

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %err, kind = err.code(), "OTP operation failed");
        }

        let retry_after = err.retry_after().map(|d| d.as_secs());
        let body = ErrorBody {
            error: err.code(),
            message: err.to_string(),
            retry_after_secs: retry_after,
            remaining_attempts: match err {
                OtpError::IncorrectOtp { remaining } => Some(remaining),
                _ => None,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
