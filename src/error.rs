use std::collections::HashMap;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone)]
pub enum ClientError {
    // Login failures
    InvalidCredentials(String),
    TooManyAttempts { retry_after_secs: u64 },
    Locked { remaining_secs: u64 },

    // Refresh failures
    NoRefreshToken,
    RefreshFailed(String),
    SessionExpired,

    // Transport failures (distinct from authorization failures; never
    // clears the session and never triggers a refresh)
    NetworkError(String),

    // Server-side rejections that are none of the above
    ApiError {
        status: u16,
        message: String,
        field_errors: HashMap<String, String>,
    },

    // Persisted-state errors
    StorageError(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials(msg) => write!(f, "Invalid credentials: {}", msg),
            Self::TooManyAttempts { retry_after_secs } => {
                write!(f, "Too many attempts, retry in {}s", retry_after_secs)
            }
            Self::Locked { remaining_secs } => {
                write!(f, "Login locked, {}s remaining", remaining_secs)
            }
            Self::NoRefreshToken => write!(f, "No refresh token available"),
            Self::RefreshFailed(msg) => write!(f, "Token refresh failed: {}", msg),
            Self::SessionExpired => write!(f, "Session expired, sign in again"),
            Self::NetworkError(msg) => write!(f, "Network error: {}", msg),
            Self::ApiError {
                status, message, ..
            } => write!(f, "API error ({}): {}", status, message),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for ClientError {}

// Transport-level failures (DNS, connect, timeout, malformed response
// bodies) all surface as NetworkError; HTTP status handling happens at
// the call sites that read the response.
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::NetworkError(err.to_string())
    }
}

// Generic result type for the client
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Field-level validation messages from the server, if any.
    pub fn field_errors(&self) -> Option<&HashMap<String, String>> {
        match self {
            Self::ApiError { field_errors, .. } if !field_errors.is_empty() => Some(field_errors),
            _ => None,
        }
    }
}
