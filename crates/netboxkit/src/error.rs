//! Error types for NetBox API operations.
//!
//! Errors are categorized so the caller can tell an unreachable or
//! misconfigured inventory (abort the run) from a device that simply
//! does not exist.

use thiserror::Error;

/// Result type alias for NetBox operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of NetBox errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, DNS, TLS or server-side failure.
    Network,
    /// The token was refused.
    Auth,
    /// The requested object does not exist.
    NotFound,
    /// The response could not be understood.
    Protocol,
}

impl ErrorCategory {
    /// Whether the inventory as a whole is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check that the NetBox URL is reachable",
            Self::Auth => "Check the API token and its permissions",
            Self::NotFound => "The device may have been deleted",
            Self::Protocol => "Check that the URL points at the NetBox root, not the UI",
        }
    }
}

/// Errors that can occur while reading from NetBox.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Device id does not exist.
    #[error("device {id} not found")]
    DeviceNotFound {
        /// Inventory id that was requested.
        id: u64,
    },

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http {
                status: Some(401 | 403),
                ..
            } => ErrorCategory::Auth,
            Self::Http {
                status: Some(404), ..
            }
            | Self::DeviceNotFound { .. } => ErrorCategory::NotFound,
            Self::Http { .. } => ErrorCategory::Network,
            Self::InvalidResponse(_) => ErrorCategory::Protocol,
        }
    }

    /// Whether the inventory as a whole is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
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
