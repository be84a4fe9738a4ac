//! Error types for the grant engine and client registration.
//!
//! Uses `thiserror` for structured error handling. `GrantError` is the wire
//! taxonomy of RFC 6749 §5.2: every expected protocol violation maps to one
//! of its variants, and nothing past the token endpoint raises an uncaught
//! fault for them.

/// Errors surfaced by the token endpoint.
///
/// Each variant carries the `error_description` text sent on the wire.
/// Reuse detection deliberately reports through the same generic
/// `InvalidGrant` text as an ordinary invalid credential, so the response
/// never reveals whether theft handling fired.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GrantError {
    /// Malformed or missing required parameters (400).
    #[error("invalid_request: {0}")]
    InvalidRequest(&'static str),

    /// Unknown client, missing/incorrect secret, or misconfigured client (401).
    #[error("invalid_client: {0}")]
    InvalidClient(&'static str),

    /// Expired, reused, or mismatched code or refresh token; PKCE failure;
    /// redirect URI mismatch (400).
    #[error("invalid_grant: {0}")]
    InvalidGrant(&'static str),

    /// Any grant type other than authorization_code or refresh_token (400).
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,
}

impl GrantError {
    /// The `error` code for the wire response.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType => "unsupported_grant_type",
        }
    }

    /// The `error_description` for the wire response.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidRequest(msg) | Self::InvalidClient(msg) | Self::InvalidGrant(msg) => msg,
            Self::UnsupportedGrantType => {
                "Only authorization_code and refresh_token are supported"
            }
        }
    }

    /// HTTP status code for the wire response.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::InvalidClient(_) => 401,
            _ => 400,
        }
    }
}

/// Errors from client registration (admin boundary).
#[derive(thiserror::Error, Debug)]
pub enum RegistrationError {
    /// Client name was empty.
    #[error("Client name is required")]
    MissingName,

    /// No redirect URI parsed as an absolute http/https URL.
    #[error("At least one valid http(s) redirect URI is required")]
    NoValidRedirectUri,

    /// No scope requested, or a scope outside the catalog.
    #[error("Unknown or empty scope: {0}")]
    InvalidScope(String),

    /// Secret hashing failed.
    #[error("Failed to hash client secret: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}
