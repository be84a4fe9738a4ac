//! Token pair issuance, validation, and refresh rotation.

use crate::config::policy;
use crate::error::GrantError;
use crate::models::{GrantedFields, Token, TokenPair, unix_now};
use crate::store::{OAuthStore, RefreshClaim};

/// One `error_description` for every refresh failure the caller must not be
/// able to tell apart: unknown token, spent token, expired window, wrong
/// client.
const GENERIC_REFRESH_ERROR: &str = "Invalid or expired refresh token";

/// Mint and persist a fresh access + refresh token pair.
///
/// This is the sole minting path for both grants; no other code creates
/// token rows.
pub async fn issue_token_pair(
    store: &OAuthStore,
    user_id: i64,
    client_id: &str,
    scope: &str,
    granted_fields: &GrantedFields,
) -> TokenPair {
    let access_token = OAuthStore::generate_token();
    let refresh_token = OAuthStore::generate_token();

    store
        .insert_token(Token {
            access_token: access_token.clone(),
            refresh_token: Some(refresh_token.clone()),
            client_id: client_id.to_owned(),
            user_id,
            scope: scope.to_owned(),
            granted_fields: granted_fields.clone(),
            issued_at: unix_now(),
            expires_in: policy::ACCESS_TOKEN_TTL,
            revoked: false,
        })
        .await;

    tracing::info!(client_id = %client_id, user_id, "Issued token pair");

    TokenPair {
        access_token,
        token_type: "Bearer".to_owned(),
        expires_in: policy::ACCESS_TOKEN_TTL,
        refresh_token,
        scope: scope.to_owned(),
    }
}

/// Validate an access token: not revoked and inside its TTL. Returns the
/// full row so the caller can resolve scope and granted fields.
pub async fn validate_access_token(store: &OAuthStore, access_token: &str) -> Option<Token> {
    store.find_valid_access_token(access_token).await
}

/// Rotate a refresh token: atomically spend the old row, then issue a brand
/// new pair carrying the old row's scope and granted fields.
///
/// The claim burns the token before any declarative check, so a token
/// presented by the wrong client or outside its window is spent, not
/// retryable. Reuse of an already-spent token revokes the whole family in
/// the store and reports the same generic error as an unknown token.
pub async fn rotate_refresh_token(
    store: &OAuthStore,
    refresh_token: &str,
    client_id: &str,
) -> Result<TokenPair, GrantError> {
    let old = match store.claim_refresh_token(refresh_token).await {
        RefreshClaim::Claimed(row) => row,
        RefreshClaim::Reused { .. } | RefreshClaim::NotFound => {
            return Err(GrantError::InvalidGrant(GENERIC_REFRESH_ERROR));
        }
    };

    if old.client_id != client_id {
        tracing::warn!(
            presented_by = %client_id,
            owner = %old.client_id,
            "Refresh token presented by a different client"
        );
        return Err(GrantError::InvalidGrant(GENERIC_REFRESH_ERROR));
    }

    if old.issued_at + policy::REFRESH_TOKEN_TTL < unix_now() {
        return Err(GrantError::InvalidGrant(GENERIC_REFRESH_ERROR));
    }

    Ok(issue_token_pair(store, old.user_id, client_id, &old.scope, &old.granted_fields).await)
}
