//! Error types for Zabbix API operations.
//!
//! Errors are categorized so callers can tell a dead upstream (abort the
//! run) from a single rejected write (log it and move on).

use std::fmt;

/// Result type alias for Zabbix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of Zabbix errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, DNS, TLS or HTTP-level failure.
    Network,
    /// Login failed or the session is no longer valid.
    Auth,
    /// The object (host name, interface) already exists.
    Conflict,
    /// The API refused the request for another reason.
    Rejected,
    /// The response could not be understood.
    Protocol,
}

impl ErrorCategory {
    /// Whether this category means the API as a whole is unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Network | Self::Auth | Self::Protocol)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Zabbix API unreachable",
            Self::Auth => "Zabbix authentication failed",
            Self::Conflict => "Object already exists",
            Self::Rejected => "Request rejected by Zabbix",
            Self::Protocol => "Unexpected Zabbix API response",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the Zabbix API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Login was refused.
    #[error("login failed for {user}: {message}")]
    Login {
        /// User that tried to log in.
        user: String,
        /// Message returned by the API.
        message: String,
    },

    /// The API returned a JSON-RPC error object.
    #[error("{method} failed: {message} {data}")]
    Api {
        /// Method that failed (e.g. `host.create`).
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// Short error message.
        message: String,
        /// Detailed error text.
        data: String,
    },

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The session was already logged out.
    #[error("session already closed")]
    SessionClosed,
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Create an API error for `method`.
    pub fn api(
        method: impl Into<String>,
        code: i64,
        message: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self::Api {
            method: method.into(),
            code,
            message: message.into(),
            data: data.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http { .. } => ErrorCategory::Network,
            Self::Login { .. } | Self::SessionClosed => ErrorCategory::Auth,
            Self::InvalidResponse(_) => ErrorCategory::Protocol,
            Self::Api { message, data, .. } => {
                let text = format!("{message} {data}").to_lowercase();
                if text.contains("not authorised")
                    || text.contains("not authorized")
                    || text.contains("session terminated")
                {
                    ErrorCategory::Auth
                } else if text.contains("already exists") {
                    ErrorCategory::Conflict
                } else {
                    ErrorCategory::Rejected
                }
            }
        }
    }

    /// Whether the API as a whole is unusable after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }

    /// Whether this error reports an existing object.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }

    /// Detail text suitable for logs.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Api { message, data, .. } if !data.is_empty() => {
                format!("{message} {data}")
            }
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::http(format!("HTTP {code}"), Some(code)),
            other => Self::http(other.to_string(), None),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
