//! Access-token claim decoding
//!
//! Pure parsing, no signature verification: the server is the authority
//! on token validity, this side only reads what the token displays.
//! Every malformed input degrades to "no claims" instead of an error.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::collections::HashSet;

/// Decode the payload segment of a compact token into a JSON object.
///
/// Returns None unless the token has the standard three-segment shape
/// and its middle segment is base64url-encoded JSON.
pub fn decode_claims(token: &str) -> Option<serde_json::Value> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    // Some encoders pad base64url; the no-pad engine rejects that, so
    // strip any trailing padding before decoding.
    let payload = parts[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value.is_object().then_some(value)
}

/// Extract the `roles` claim as a set of role names.
///
/// The claim is accepted either as an array of strings or as a single
/// comma-separated string; anything else yields an empty set.
pub fn roles_from_token(token: &str) -> HashSet<String> {
    let Some(claims) = decode_claims(token) else {
        return HashSet::new();
    };

    match claims.get("roles") {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(serde_json::Value::String(joined)) => joined
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => HashSet::new(),
    }
}

/// Read a string claim (e.g. `sub`) from the token payload.
pub fn string_claim(token: &str, name: &str) -> Option<String> {
    decode_claims(token)?
        .get(name)?
        .as_str()
        .map(|s| s.to_string())
}
