//! HTTP layer for authenticated API traffic

pub mod client;

// Re-export the authorized client
pub use client::AuthorizedClient;
