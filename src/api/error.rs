//! Normalized API errors.
//!
//! The backend answers failures in several shapes: a bare status, a single
//! `error` string (with an `errorMessage` fallback spelling), or a
//! field-keyed map of validation message lists. This module is the single
//! point collapsing all of them into one closed error type; its `Display`
//! output is the exact message shown to the user.

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Fallback message for failures without a usable server-provided one.
pub const GENERIC_ERROR: &str = "Unexpected error. Please try again later.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a server response.
    #[error("{}", GENERIC_ERROR)]
    Transport(#[source] reqwest::Error),
    /// Status 401; the session has already been expired by the pipeline.
    #[error("{message}")]
    Unauthorized { message: String },
    /// Field validation failed; one message per offending rule.
    #[error("{}", .messages.join("\n"))]
    Validation { messages: Vec<String> },
    /// The server reported a failure with a message of its own.
    #[error("{message}")]
    Server { message: String },
    /// Anything the pipeline could not make sense of.
    #[error("{}", GENERIC_ERROR)]
    Unknown,
}

/// Recognized error body shape.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, Vec<String>>>,
}

/// Collapse a non-success response into an `ApiError`.
pub(crate) fn normalize(status: StatusCode, body: &[u8]) -> ApiError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();

    let validation: Vec<String> = parsed
        .errors
        .iter()
        .flat_map(|map| map.values().flatten().cloned())
        .collect();

    let message = if validation.is_empty() {
        parsed
            .error
            .or(parsed.error_message)
            .filter(|m| !m.is_empty())
    } else {
        Some(validation.join("\n"))
    };

    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized {
            message: message.unwrap_or_else(|| GENERIC_ERROR.to_string()),
        };
    }

    if !validation.is_empty() {
        return ApiError::Validation {
            messages: validation,
        };
    }

    match message {
        Some(message) => ApiError::Server { message },
        None => ApiError::Unknown,
    }
}
