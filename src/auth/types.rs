// Authentication types

use serde::Deserialize;

/// Durable storage slot for the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Durable storage slot for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// In-memory credential pair
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,

    /// Bumped on every change to the pair; lets a waiter tell whether a
    /// refresh already happened since it sent its request
    pub generation: u64,
}

/// Point-in-time view used to build one outgoing request
#[derive(Debug, Clone)]
pub struct CredentialSnapshot {
    pub access_token: Option<String>,
    pub generation: u64,
}

/// Refresh endpoint response
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}
