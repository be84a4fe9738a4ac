//! The token-endpoint grant dispatcher.
//!
//! Authenticates the client, then routes to the authorization_code or
//! refresh_token grant. Everything here returns [`GrantError`] values; the
//! HTTP layer only translates them to wire responses.

use serde::Deserialize;

use crate::config::scopes;
use crate::error::GrantError;
use crate::models::{Client, ClientAuthMethod, GrantedFields, TokenPair, unix_now};
use crate::pkce;
use crate::store::{CodeClaim, OAuthStore};
use crate::tokens;

/// One `error_description` for every code-claim failure the caller must not
/// be able to tell apart: unknown, already used (theft handled), or expired.
const GENERIC_CODE_ERROR: &str = "Invalid or expired authorization code";

/// Parameters accepted by the token endpoint, form-encoded or JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub client_id: String,
    pub client_secret: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
}

/// Handle a token request end to end.
pub async fn handle_token_request(
    store: &OAuthStore,
    req: &TokenRequest,
) -> Result<TokenPair, GrantError> {
    let Some(client) = store.get_client(&req.client_id).await else {
        return Err(GrantError::InvalidClient("Unknown client_id"));
    };

    authenticate_client(&client, req.client_secret.as_deref()).await?;

    match req.grant_type.as_str() {
        "authorization_code" => handle_auth_code_grant(store, req, &client).await,
        "refresh_token" => handle_refresh_grant(store, req, &client).await,
        _ => Err(GrantError::UnsupportedGrantType),
    }
}

/// Verify the client's credentials per its registered auth method.
///
/// Public clients (`auth_method = none`) skip all checks; PKCE is their
/// trust anchor. Confidential clients must present a secret matching the
/// stored bcrypt hash; verification runs under `spawn_blocking` to keep the
/// adaptive hash off the async executor.
pub async fn authenticate_client(
    client: &Client,
    presented_secret: Option<&str>,
) -> Result<(), GrantError> {
    if client.auth_method == ClientAuthMethod::None {
        return Ok(());
    }

    let Some(secret) = presented_secret else {
        return Err(GrantError::InvalidClient("Missing client_secret"));
    };
    let Some(hash) = client.client_secret_hash.clone() else {
        return Err(GrantError::InvalidClient("Client misconfigured"));
    };

    let secret = secret.to_owned();
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(&secret, &hash).unwrap_or(false))
        .await
        .unwrap_or(false);

    if valid { Ok(()) } else { Err(GrantError::InvalidClient("Invalid client_secret")) }
}

async fn handle_auth_code_grant(
    store: &OAuthStore,
    req: &TokenRequest,
    client: &Client,
) -> Result<TokenPair, GrantError> {
    let (Some(code), Some(redirect_uri), Some(code_verifier)) =
        (&req.code, &req.redirect_uri, &req.code_verifier)
    else {
        return Err(GrantError::InvalidRequest("Missing code, redirect_uri, or code_verifier"));
    };

    let auth_code = match store.claim_auth_code(code, &client.client_id).await {
        CodeClaim::Claimed(row) => row,
        // Reuse already triggered family revocation inside the claim; the
        // response is indistinguishable from an unknown code.
        CodeClaim::Reused { .. } | CodeClaim::NotFound => {
            return Err(GrantError::InvalidGrant(GENERIC_CODE_ERROR));
        }
    };

    if auth_code.is_expired(unix_now()) {
        return Err(GrantError::InvalidGrant(GENERIC_CODE_ERROR));
    }

    if auth_code.redirect_uri != *redirect_uri {
        return Err(GrantError::InvalidGrant("redirect_uri mismatch"));
    }

    let (Some(challenge), Some(method)) =
        (&auth_code.code_challenge, &auth_code.code_challenge_method)
    else {
        return Err(GrantError::InvalidGrant("Missing PKCE challenge"));
    };

    if !pkce::verify(code_verifier, challenge, method) {
        return Err(GrantError::InvalidGrant("PKCE verification failed"));
    }

    Ok(tokens::issue_token_pair(
        store,
        auth_code.user_id,
        &client.client_id,
        &auth_code.scope,
        &auth_code.granted_fields,
    )
    .await)
}

async fn handle_refresh_grant(
    store: &OAuthStore,
    req: &TokenRequest,
    client: &Client,
) -> Result<TokenPair, GrantError> {
    let Some(refresh_token) = &req.refresh_token else {
        return Err(GrantError::InvalidRequest("Missing refresh_token"));
    };

    tokens::rotate_refresh_token(store, refresh_token, &client.client_id).await
}

/// Build `granted_fields` from a consent form's `scope:field` selections.
///
/// Each entry splits at its last `:` (scope names themselves contain one).
/// Entries outside the requested scope set or the scope catalog are dropped
/// rather than rejected, so a stale consent form cannot widen a grant.
#[must_use]
pub fn filter_granted_fields(requested_scope: &str, selections: &[String]) -> GrantedFields {
    let requested: Vec<&str> = requested_scope.split_whitespace().collect();
    let mut granted = GrantedFields::new();

    for entry in selections {
        let Some(split_at) = entry.rfind(':') else { continue };
        let (scope, field) = (&entry[..split_at], &entry[split_at + 1..]);

        if !requested.contains(&scope) {
            continue;
        }
        let Some(catalog_fields) = scopes::fields_for(scope) else { continue };
        if !catalog_fields.contains(&field) {
            continue;
        }

        granted.entry(scope.to_owned()).or_default().push(field.to_owned());
    }

    granted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public_client() -> Client {
        Client {
            client_id: "cid1".to_owned(),
            client_secret_hash: None,
            client_name: "Public App".to_owned(),
            redirect_uris: vec!["https://app.example/cb".to_owned()],
            scope: "profile:basic".to_owned(),
            auth_method: ClientAuthMethod::None,
            created_at: unix_now(),
        }
    }

    fn confidential_client(secret: &str) -> Client {
        // Minimum bcrypt cost keeps the test fast; production uses policy::BCRYPT_COST.
        let hash = bcrypt::hash(secret, 4).unwrap();
        Client {
            client_id: "cid2".to_owned(),
            client_secret_hash: Some(hash),
            client_name: "Backend App".to_owned(),
            redirect_uris: vec!["https://app.example/cb".to_owned()],
            scope: "profile:basic".to_owned(),
            auth_method: ClientAuthMethod::ClientSecretPost,
            created_at: unix_now(),
        }
    }

    #[tokio::test]
    async fn test_public_client_skips_secret_checks() {
        let client = public_client();
        assert!(authenticate_client(&client, None).await.is_ok());
        assert!(authenticate_client(&client, Some("ignored")).await.is_ok());
    }

    #[tokio::test]
    async fn test_confidential_client_auth_matrix() {
        let client = confidential_client("s3cret");

        assert!(authenticate_client(&client, Some("s3cret")).await.is_ok());

        let err = authenticate_client(&client, None).await.unwrap_err();
        assert_eq!(err, GrantError::InvalidClient("Missing client_secret"));

        let err = authenticate_client(&client, Some("wrong")).await.unwrap_err();
        assert_eq!(err, GrantError::InvalidClient("Invalid client_secret"));

        let mut broken = client;
        broken.client_secret_hash = None;
        let err = authenticate_client(&broken, Some("s3cret")).await.unwrap_err();
        assert_eq!(err, GrantError::InvalidClient("Client misconfigured"));
    }

    #[tokio::test]
    async fn test_unknown_client_and_grant_type() {
        let store = OAuthStore::new();

        let req = TokenRequest { client_id: "ghost".to_owned(), ..TokenRequest::default() };
        let err = handle_token_request(&store, &req).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_client");

        let registered = store
            .register_client(
                "App",
                &["https://app.example/cb".to_owned()],
                &["profile:basic".to_owned()],
                false,
            )
            .await
            .unwrap();
        let req = TokenRequest {
            grant_type: "password".to_owned(),
            client_id: registered.client.client_id,
            ..TokenRequest::default()
        };
        let err = handle_token_request(&store, &req).await.unwrap_err();
        assert_eq!(err, GrantError::UnsupportedGrantType);
    }

    #[test]
    fn test_filter_granted_fields() {
        let selections = vec![
            "profile:basic:name".to_owned(),
            "profile:basic:prn".to_owned(),
            "profile:contact:email".to_owned(),   // not requested
            "profile:basic:password".to_owned(),  // not in catalog
            "malformed".to_owned(),
        ];
        let granted = filter_granted_fields("profile:basic", &selections);

        assert_eq!(granted.len(), 1);
        assert_eq!(granted["profile:basic"], vec!["name", "prn"]);
    }
}
