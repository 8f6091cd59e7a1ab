use thiserror::Error;

use crate::providers::ProviderError;

/// Cloudflare-specific errors that can occur while fetching remote inventory.
///
/// SECURITY: Error messages must NEVER contain sensitive data like API tokens.
#[derive(Debug, Error)]
pub enum CloudflareError {
    /// Authentication failed (invalid or expired token)
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network-level error (connection failed, timeout, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Zone not found (no zone with given name/ID exists or not accessible)
    #[error("zone not found: '{zone}'")]
    ZoneNotFound { zone: String },

    /// Zone lookup failed due to API error
    #[error("zone lookup failed: {message}")]
    ZoneLookupFailed { message: String },

    #[error("discovery failed for {resource_type}: {message}")]
    DiscoveryFailed {
        resource_type: String,
        message: String,
    },
}

impl From<CloudflareError> for ProviderError {
    fn from(err: CloudflareError) -> Self {
        match err {
            CloudflareError::Auth { message } => ProviderError::Auth(message),
            other => ProviderError::Cloudflare(other.to_string()),
        }
    }
}
