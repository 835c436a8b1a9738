//! Error types for the Planka client.
//!
//! # Design
//! Local validation failures (missing required fields, values outside an
//! enumerated set, unbound records) are raised before any request is built,
//! so callers can tell "nothing was sent" apart from a remote failure.
//!
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server returned an unexpected
//! status." Every other non-2xx response lands in `Http` with the endpoint,
//! response headers and raw body for diagnosis.

use thiserror::Error;

/// Errors returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more fields still hold the `Required` marker or were never
    /// supplied to a create call.
    #[error("{resource}: missing required fields {fields:?}")]
    MissingRequired {
        resource: String,
        fields: Vec<String>,
    },

    /// A value outside an enumerated set (board role, label colour, gradient).
    #[error("invalid {field} '{value}', expected one of {valid:?}")]
    InvalidValue {
        field: &'static str,
        value: String,
        valid: &'static [&'static str],
    },

    /// A caller error detected locally, with remediation text.
    #[error("{0}")]
    Validation(String),

    /// The record has no routes attached; decode it through a client or call
    /// `bind` first.
    #[error("{resource} is not bound to a session")]
    NotBound { resource: &'static str },

    /// The record has no identity yet, so there is nothing to address.
    #[error("{resource} has no id")]
    NotPersisted { resource: &'static str },

    /// The server returned 404.
    #[error("resource not found: {endpoint}")]
    NotFound { endpoint: String },

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status} from {method} {endpoint}: {body}")]
    Http {
        status: u16,
        method: String,
        endpoint: String,
        headers: Vec<(String, String)>,
        body: String,
    },

    /// The transport failed before a response was received.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The response decoded but lacked the expected `item`/`items`/`included` shape.
    #[error("unexpected response from {endpoint}: {reason}")]
    UnexpectedResponse { endpoint: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn missing(resource: impl Into<String>, fields: Vec<String>) -> Self {
        Self::MissingRequired {
            resource: resource.into(),
            fields,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unexpected(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status carried by a remote failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { .. } => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures raised before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ApiError::MissingRequired { .. }
                | ApiError::InvalidValue { .. }
                | ApiError::Validation(_)
                | ApiError::NotBound { .. }
                | ApiError::NotPersisted { .. }
        )
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::DeserializationError(err.to_string())
    }
}
