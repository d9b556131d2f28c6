use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::core::SolveError;

/// Input rejected before it reaches the projection core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{field} must be a valid dollar amount, got '{value}'")]
    InvalidCurrency { field: &'static str, value: String },

    #[error("{field} {message}")]
    OutOfRange {
        field: &'static str,
        message: &'static str,
    },

    #[error("invalid payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Solve(#[from] SolveError),
}

impl InputError {
    pub(crate) fn out_of_range(field: &'static str, message: &'static str) -> Self {
        InputError::OutOfRange { field, message }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for InputError {
    fn into_response(self) -> Response {
        super::json_response(
            StatusCode::BAD_REQUEST,
            ErrorResponse {
                error: self.to_string(),
            },
        )
    }
}
