//! Unified client error model and mapping helpers.
//! Every failure a view can observe (validation, authentication, authorization,
//! transport, server-side) is one `AppError`, so call sites can report it as a
//! notification with a single rule: server message first, per-action fallback otherwise.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Code attached to errors whose message came verbatim from the server payload.
pub const SERVER_CODE: &str = "server";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    Auth { code: String, message: String },
    Forbidden { code: String, message: String },
    NotFound { code: String, message: String },
    Remote { code: String, message: String },
    Io { code: String, message: String },
    Decode { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Remote { code, .. }
            | AppError::Io { code, .. }
            | AppError::Decode { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Remote { message, .. }
            | AppError::Io { message, .. }
            | AppError::Decode { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn auth(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn forbidden(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn not_found(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn remote(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Remote { code: code.into(), message: msg.into() } }
    pub fn io(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn decode(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Decode { code: code.into(), message: msg.into() } }
    pub fn internal(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Build an error from a non-success HTTP response.
    /// `server_message` is the `message` field of the error payload, if the server sent one.
    pub fn from_status(status: u16, server_message: Option<String>) -> Self {
        let (code, message) = match server_message {
            Some(m) if !m.trim().is_empty() => (SERVER_CODE.to_string(), m),
            _ => (format!("http_{}", status), format!("HTTP {}", status)),
        };
        match status {
            400 | 422 => AppError::UserInput { code, message },
            401 => AppError::Auth { code, message },
            403 => AppError::Forbidden { code, message },
            404 => AppError::NotFound { code, message },
            _ => AppError::Remote { code, message },
        }
    }

    /// Message supplied by the server, when this error was built from one.
    pub fn server_message(&self) -> Option<&str> {
        if self.code_str() == SERVER_CODE { Some(self.message()) } else { None }
    }

    /// Text for a user-facing notification about this error.
    /// Server-supplied text wins; client-side validation messages are shown as-is;
    /// everything else collapses to the caller's per-action fallback.
    pub fn notice_text(&self, fallback: &str) -> String {
        if let Some(m) = self.server_message() {
            return m.to_string();
        }
        match self {
            AppError::UserInput { message, .. } => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Authentication failures end the session; everything else leaves it alone.
    pub fn is_auth(&self) -> bool { matches!(self, AppError::Auth { .. }) }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 422,
            AppError::Auth { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Remote { .. } => 500,
            AppError::Io { .. } => 503,
            AppError::Decode { .. } => 502,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AppError::Decode { code: "decode_error".into(), message: err.to_string() };
        }
        if let Some(status) = err.status() {
            return AppError::from_status(status.as_u16(), None);
        }
        AppError::Io { code: "network_error".into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode { code: "decode_error".into(), message: err.to_string() }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal".into(), message: err.to_string() }
    }
}
