// Fundamental API constants
pub const AUTH_BASE_PATH: &str = "/api/auth";
pub const LOGIN_ROUTE: &str = "/login";
pub const DEFAULT_LANDING_ROUTE: &str = "/app";

// HTTP timeout defaults (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 10;

// Fallback cooldown when a 429 response carries no usable duration
pub const DEFAULT_LOCKOUT_FALLBACK_SECS: u64 = 60;

// Role names as they appear in access-token claims
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_USER: &str = "ROLE_USER";
