//! Data model for clients, authorization codes, and token rows.
//!
//! Timestamps are unix seconds. Expiry is evaluated lazily at validation
//! time; nothing in the engine runs on a timer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Mapping from scope name to the profile fields the user consented to.
pub type GrantedFields = HashMap<String, Vec<String>>;

/// Current unix time in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// How a client proves its identity at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// Public client: no secret, PKCE is the sole proof of possession.
    None,
    /// Confidential client: secret presented in the request body.
    ClientSecretPost,
}

/// A registered OAuth client.
///
/// Immutable after creation except deletion, which cascades over the
/// client's codes and tokens in the store.
#[derive(Debug, Clone)]
pub struct Client {
    pub client_id: String,
    /// bcrypt hash; present only for confidential clients.
    pub client_secret_hash: Option<String>,
    pub client_name: String,
    /// Absolute http/https URIs.
    pub redirect_uris: Vec<String>,
    /// Space-separated allowed scope names.
    pub scope: String,
    pub auth_method: ClientAuthMethod,
    pub created_at: i64,
}

/// A single-use authorization code minted by the consent step.
///
/// `used` transitions `false -> true` exactly once; only that transition
/// yields a successful claim.
#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub user_id: i64,
    pub redirect_uri: String,
    pub scope: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub granted_fields: GrantedFields,
    pub expires_at: i64,
    pub used: bool,
}

impl AuthorizationCode {
    /// Whether the code's TTL has elapsed.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

/// A paired access + refresh token row.
///
/// Rotation never mutates a row back to life: `revoked` is monotonic, and a
/// superseding pair is always a brand-new row. The `refresh_token` stays
/// populated after revocation so a replayed value is recognized as reuse
/// rather than reported as unknown.
#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub client_id: String,
    pub user_id: i64,
    pub scope: String,
    pub granted_fields: GrantedFields,
    pub issued_at: i64,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
    pub revoked: bool,
}

impl Token {
    /// Whether the access token has outlived `expires_in`.
    #[must_use]
    pub fn is_access_expired(&self, now: i64) -> bool {
        self.issued_at + self.expires_in < now
    }
}

/// The token-endpoint success payload (RFC 6749 §5.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,
}
