//! API request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use crate::dispatch::Dispatcher;
use crate::error::{ErrorCode, ProviderError, ServiceError};
use crate::model::EmailRequest;
use crate::validation::validators::is_valid_email;

/// Retry hint sent with transient provider errors
const RETRY_AFTER_SECS: &str = "1";

/// Shared application state
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    /// Deadline for a single send
    pub request_timeout: Duration,
}

/// Successful send response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailReply {
    pub message: String,
    pub message_id: String,
}

/// API error response
///
/// Schema failures carry only `error`; provider failures put the code in
/// `error` and the description in `message`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
            message: None,
        }
    }

    pub fn provider(err: &ProviderError) -> Self {
        Self {
            error: err.code().as_str().to_string(),
            message: Some(err.message().to_string()),
        }
    }
}

/// HTTP status for a provider error code
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidParameterValue | ErrorCode::MessageTooLong => StatusCode::BAD_REQUEST,
        ErrorCode::RequestExpired => StatusCode::REQUEST_TIMEOUT,
        ErrorCode::MessageRejected
        | ErrorCode::EmailAddressNotVerified
        | ErrorCode::AccessDeniedException
        | ErrorCode::AccountSendingPausedException => StatusCode::FORBIDDEN,
        ErrorCode::LimitExceededException | ErrorCode::ThrottlingException => {
            StatusCode::TOO_MANY_REQUESTS
        }
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a service error to a response without leaking store details
fn error_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Provider(e) => {
            let status = status_for(e.code());
            let body = Json(ApiError::provider(&e));
            if e.code().is_transient() {
                (status, [(header::RETRY_AFTER, RETRY_AFTER_SECS)], body).into_response()
            } else {
                (status, body).into_response()
            }
        }
        ServiceError::Timeout => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(ApiError::provider(&ProviderError::new(
                ErrorCode::RequestExpired,
                "Request timed out.",
            ))),
        )
            .into_response(),
        other => {
            error!("Internal error: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::provider(&ProviderError::internal())),
            )
                .into_response()
        }
    }
}

/// Shape checks done before a request reaches the dispatcher
pub fn check_request(req: &EmailRequest) -> Result<(), &'static str> {
    if req.source.is_empty() {
        return Err("Source is required");
    }
    if !is_valid_email(&req.source) {
        return Err("Source must be a valid email address");
    }
    if req.destination.to.is_empty() {
        return Err("Destination.ToAddresses must not be empty");
    }
    if req.subject().is_empty() {
        return Err("Message.Subject.Data is required");
    }
    if req.body_text().is_empty() {
        return Err("Message.Body.Text.Data is required");
    }
    if req.reply_to_addresses.iter().any(|a| !is_valid_email(a)) {
        return Err("ReplyToAddresses must contain valid email addresses");
    }
    if let Some(return_path) = req.return_path.as_deref() {
        if !return_path.is_empty() && !is_valid_email(return_path) {
            return Err("ReturnPath must be a valid email address");
        }
    }
    Ok(())
}

/// POST /api/v1/send-email - Send one email
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EmailRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(json) => json,
        Err(rejection) => {
            warn!("Rejected send request body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new(&rejection.body_text())),
            )
                .into_response();
        }
    };

    if let Err(msg) = check_request(&req) {
        return (StatusCode::BAD_REQUEST, Json(ApiError::new(msg))).into_response();
    }

    match state
        .dispatcher
        .send_with_deadline(&req, state.request_timeout)
        .await
    {
        Ok(resp) => (
            StatusCode::OK,
            Json(SendEmailReply {
                message: "Email sent successfully".to_string(),
                message_id: resp.message_id,
            }),
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to send email from {}: {}", req.source, e);
            error_response(e)
        }
    }
}

/// GET /api/v1/email-stats - Current send statistics
pub async fn email_stats(State(state): State<Arc<AppState>>) -> Response {
    match state.dispatcher.stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /health - Liveness check
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
