use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Field name → user-facing message.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {}", join_field_errors(.0))]
    Validation(FieldErrors),

    #[error("{message}")]
    BackendRejection { status: u16, message: String },

    #[error("network failure: {0}")]
    Network(String),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("cannot {action} while {stage}")]
    InvalidTransition {
        stage: &'static str,
        action: &'static str,
    },
}

impl BookingError {
    /// Message suitable for showing the customer as-is.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::BackendRejection { message, .. } if !message.is_empty() => {
                message.clone()
            }
            BookingError::BackendRejection { .. } | BookingError::Network(_) => {
                GENERIC_FAILURE.to_string()
            }
            other => other.to_string(),
        }
    }
}

pub const GENERIC_FAILURE: &str = "Could not create the booking. Please try again.";

impl From<reqwest::Error> for BookingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BookingError::Network(format!("request timed out: {e}"))
        } else {
            BookingError::Network(e.to_string())
        }
    }
}

fn join_field_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, msg)| format!("{field}: {msg}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Booking(BookingError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Booking(BookingError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Booking(BookingError::InvalidSelection(_)) => StatusCode::CONFLICT,
            AppError::Booking(BookingError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            AppError::Booking(BookingError::BackendRejection { .. }) => StatusCode::BAD_GATEWAY,
            AppError::Booking(BookingError::Network(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let mut body = serde_json::json!({ "error": self.to_string() });
        if let AppError::Booking(BookingError::Validation(fields)) = &self {
            body["field_errors"] = serde_json::json!(fields);
        }
        (status, axum::Json(body)).into_response()
    }
}
