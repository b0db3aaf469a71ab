//! Typed surface of the backend's authentication API

pub mod backend;
pub mod types;

// Re-export main components
pub use backend::{AuthBackend, HttpAuthBackend};
