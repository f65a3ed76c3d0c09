//! Error types shared by every session action.
//!
//! All fallible operations return [`SessionResult`]. Callers that only need to
//! branch on the category of a failure use [`SessionError::kind`].

use thiserror::Error;
use validator::ValidationErrorsKind;

/// Category of a session failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server answered with a non-success status.
    Rejected,
    /// The request never produced a response (connection, timeout).
    Transport,
    /// A response or a stored value could not be decoded.
    Decode,
    /// Durable storage could not be read or written.
    Storage,
    /// A payload failed local validation before any request was made.
    Validation,
    /// The session is not in a state that allows the operation.
    InvalidState,
}

/// Errors raised by the durable key-value layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Error returned by session actions and the API client.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Storage error: {source}")]
    Storage {
        #[from]
        source: StorageError,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }

    /// Message suitable for display, without the category prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. }
            | Self::Transport { message }
            | Self::Decode { message }
            | Self::Validation { message }
            | Self::InvalidState { message } => message.clone(),
            Self::Storage { source } => source.to_string(),
        }
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::decode(error.to_string())
        } else {
            Self::transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(error: serde_json::Error) -> Self {
        Self::decode(error.to_string())
    }
}

/// Flattens `validator` errors, nested structs included, into a single
/// sorted `field: message` list.
pub fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_validation_messages(errors, &mut messages);
    messages.sort();
    messages.join(", ")
}

fn collect_validation_messages(errors: &validator::ValidationErrors, messages: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(errors) => {
                messages.extend(errors.iter().map(|error| {
                    let message = error.message.as_deref().unwrap_or("Invalid value");
                    format!("{}: {}", field, message)
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_messages(nested, messages),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect_validation_messages(nested, messages);
                }
            }
        }
    }
}
