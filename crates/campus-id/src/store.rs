//! Shared OAuth state store with atomic claim-or-fail transitions.
//!
//! All tables live behind a single `RwLock` so the two correctness-critical
//! operations, [`OAuthStore::claim_auth_code`] and
//! [`OAuthStore::claim_refresh_token`], run test-and-set plus any cascade
//! revocation inside one write guard. This is the in-process equivalent of
//! `UPDATE ... WHERE used = false RETURNING *`: two requests racing on the
//! same code or refresh token see exactly one winner, never a read-then-write
//! interleaving. A relational backend would map each claim to a single
//! conditional UPDATE.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::{policy, scopes};
use crate::error::RegistrationError;
use crate::models::{
    AuthorizationCode, Client, ClientAuthMethod, GrantedFields, Token, unix_now,
};

/// Outcome of an authorization-code claim.
#[derive(Debug)]
pub enum CodeClaim {
    /// First claim: the row transitioned `used = false -> true`.
    Claimed(AuthorizationCode),
    /// The code was already consumed: a theft signal. Every token for the
    /// code's `(client_id, user_id)` has been revoked in the same guard.
    Reused {
        user_id: i64,
        revoked: usize,
    },
    /// No row matches that code for this client.
    NotFound,
}

/// Outcome of a refresh-token claim.
#[derive(Debug)]
pub enum RefreshClaim {
    /// First claim: the row is now revoked and returned for inspection.
    Claimed(Token),
    /// The refresh token was already spent: the whole token family for its
    /// `(client_id, user_id)` has been revoked in the same guard.
    Reused {
        client_id: String,
        user_id: i64,
        revoked: usize,
    },
    /// No row carries that refresh token.
    NotFound,
}

/// A freshly registered client, with the plain secret shown exactly once.
#[derive(Debug)]
pub struct RegisteredClient {
    pub client: Client,
    /// Present only for confidential clients; never stored in plain form.
    pub client_secret: Option<String>,
}

/// Parameters for minting an authorization code at the consent boundary.
#[derive(Debug, Clone)]
pub struct NewAuthCode {
    pub user_id: i64,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub granted_fields: GrantedFields,
}

#[derive(Default)]
struct Tables {
    clients: HashMap<String, Client>,
    users: HashMap<i64, serde_json::Value>,
    auth_codes: HashMap<String, AuthorizationCode>,
    /// Keyed by access token.
    tokens: HashMap<String, Token>,
    /// refresh token -> access token key. Entries survive revocation so a
    /// replayed refresh token is recognized as reuse, not reported unknown.
    refresh_index: HashMap<String, String>,
}

impl Tables {
    /// Revoke every token row for `(client_id, user_id)`. Monotonic: rows
    /// already revoked stay revoked.
    fn revoke_family(&mut self, client_id: &str, user_id: i64) -> usize {
        let mut revoked = 0;
        for token in self.tokens.values_mut() {
            if token.client_id == client_id && token.user_id == user_id && !token.revoked {
                token.revoked = true;
                revoked += 1;
            }
        }
        revoked
    }
}

/// Shared OAuth state store.
#[derive(Clone)]
pub struct OAuthStore {
    inner: Arc<RwLock<Tables>>,
}

impl OAuthStore {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(Tables::default())) }
    }

    /// Generate a random opaque token using two UUIDs (64 URL-safe chars).
    #[must_use]
    pub fn generate_token() -> String {
        format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
    }

    // ─── Clients ─────────────────────────────────────────────────────────────

    /// Register an OAuth client.
    ///
    /// Public clients get `auth_method = none` and no secret; confidential
    /// clients get a generated secret returned once, with only its bcrypt
    /// hash stored. Redirect URIs must parse as absolute http/https URLs.
    pub async fn register_client(
        &self,
        client_name: &str,
        redirect_uris: &[String],
        requested_scopes: &[String],
        confidential: bool,
    ) -> Result<RegisteredClient, RegistrationError> {
        let client_name = client_name.trim();
        if client_name.is_empty() {
            return Err(RegistrationError::MissingName);
        }

        let redirect_uris: Vec<String> = redirect_uris
            .iter()
            .filter(|uri| {
                url::Url::parse(uri)
                    .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if redirect_uris.is_empty() {
            return Err(RegistrationError::NoValidRedirectUri);
        }

        if requested_scopes.is_empty() {
            return Err(RegistrationError::InvalidScope(String::new()));
        }
        for scope in requested_scopes {
            if !scopes::is_known(scope) {
                return Err(RegistrationError::InvalidScope(scope.clone()));
            }
        }

        let (client_secret, client_secret_hash, auth_method) = if confidential {
            let plain = Self::generate_token();
            let hash = bcrypt::hash(&plain, policy::BCRYPT_COST)?;
            (Some(plain), Some(hash), ClientAuthMethod::ClientSecretPost)
        } else {
            (None, None, ClientAuthMethod::None)
        };

        let client = Client {
            client_id: uuid::Uuid::new_v4().simple().to_string(),
            client_secret_hash,
            client_name: client_name.to_owned(),
            redirect_uris,
            scope: requested_scopes.join(" "),
            auth_method,
            created_at: unix_now(),
        };

        self.inner.write().await.clients.insert(client.client_id.clone(), client.clone());

        tracing::info!(client_id = %client.client_id, confidential, "Registered OAuth client");

        Ok(RegisteredClient { client, client_secret })
    }

    /// Look up a client by ID.
    pub async fn get_client(&self, client_id: &str) -> Option<Client> {
        self.inner.read().await.clients.get(client_id).cloned()
    }

    /// Delete a client, dropping its unused codes and revoking all of its
    /// issued tokens. In-flight grants for the client then fail their
    /// lookups safely.
    pub async fn delete_client(&self, client_id: &str) -> bool {
        let mut tables = self.inner.write().await;
        if tables.clients.remove(client_id).is_none() {
            return false;
        }

        tables.auth_codes.retain(|_, code| code.client_id != client_id);

        let mut revoked = 0;
        for token in tables.tokens.values_mut() {
            if token.client_id == client_id && !token.revoked {
                token.revoked = true;
                revoked += 1;
            }
        }

        tracing::info!(client_id = %client_id, revoked, "Deleted client and revoked its tokens");
        true
    }

    // ─── Users ───────────────────────────────────────────────────────────────

    /// Insert or replace a user's profile blob.
    pub async fn upsert_user(&self, user_id: i64, profile: serde_json::Value) {
        self.inner.write().await.users.insert(user_id, profile);
    }

    /// Look up a user's profile blob.
    pub async fn user_profile(&self, user_id: i64) -> Option<serde_json::Value> {
        self.inner.read().await.users.get(&user_id).cloned()
    }

    // ─── Authorization codes ─────────────────────────────────────────────────

    /// Mint an authorization code with the standard 10-minute TTL.
    pub async fn create_auth_code(&self, params: NewAuthCode) -> String {
        self.create_auth_code_at(params, unix_now() + policy::AUTH_CODE_TTL).await
    }

    /// Mint an authorization code with an explicit expiry. This is the
    /// storage primitive; [`Self::create_auth_code`] applies policy.
    pub async fn create_auth_code_at(&self, params: NewAuthCode, expires_at: i64) -> String {
        let code = Self::generate_token();

        self.inner.write().await.auth_codes.insert(
            code.clone(),
            AuthorizationCode {
                code: code.clone(),
                client_id: params.client_id,
                user_id: params.user_id,
                redirect_uri: params.redirect_uri,
                scope: params.scope,
                code_challenge: params.code_challenge,
                code_challenge_method: params.code_challenge_method,
                granted_fields: params.granted_fields,
                expires_at,
                used: false,
            },
        );

        code
    }

    /// Atomically claim an authorization code for `client_id`.
    ///
    /// The transition `used = false -> true` happens exactly once; the first
    /// caller gets [`CodeClaim::Claimed`] with the row. A claim of an
    /// already-used code revokes every token for the row's
    /// `(client_id, user_id)` before returning, all under the same guard.
    ///
    /// Expiry and redirect-URI equality are declarative checks left to the
    /// caller; they are not concurrency hazards and stay outside the claim.
    pub async fn claim_auth_code(&self, code: &str, client_id: &str) -> CodeClaim {
        let mut tables = self.inner.write().await;

        let Some(row) = tables.auth_codes.get_mut(code) else {
            return CodeClaim::NotFound;
        };
        if row.client_id != client_id {
            return CodeClaim::NotFound;
        }

        if row.used {
            let user_id = row.user_id;
            let revoked = tables.revoke_family(client_id, user_id);
            tracing::warn!(
                client_id = %client_id,
                user_id,
                revoked,
                "Authorization code reuse detected, token family revoked"
            );
            return CodeClaim::Reused { user_id, revoked };
        }

        row.used = true;
        CodeClaim::Claimed(row.clone())
    }

    // ─── Tokens ──────────────────────────────────────────────────────────────

    /// Persist a token row and index its refresh token.
    pub async fn insert_token(&self, token: Token) {
        let mut tables = self.inner.write().await;
        if let Some(refresh) = &token.refresh_token {
            tables.refresh_index.insert(refresh.clone(), token.access_token.clone());
        }
        tables.tokens.insert(token.access_token.clone(), token);
    }

    /// Look up an access token that is neither revoked nor past its TTL.
    pub async fn find_valid_access_token(&self, access_token: &str) -> Option<Token> {
        let tables = self.inner.read().await;
        let token = tables.tokens.get(access_token)?;
        if token.revoked || token.is_access_expired(unix_now()) {
            return None;
        }
        Some(token.clone())
    }

    /// Atomically claim a refresh token, revoking it in the same step.
    ///
    /// Refresh tokens are strictly single-use. The first caller gets
    /// [`RefreshClaim::Claimed`] with the now-revoked row; a claim of an
    /// already-revoked token revokes the entire family for its
    /// `(client_id, user_id)` under the same guard.
    ///
    /// Client ownership and the refresh window are checked by the caller
    /// after the claim, matching the code-claim split.
    pub async fn claim_refresh_token(&self, refresh_token: &str) -> RefreshClaim {
        let mut tables = self.inner.write().await;

        let Some(access_key) = tables.refresh_index.get(refresh_token).cloned() else {
            return RefreshClaim::NotFound;
        };
        let Some(row) = tables.tokens.get_mut(&access_key) else {
            return RefreshClaim::NotFound;
        };

        if row.revoked {
            let client_id = row.client_id.clone();
            let user_id = row.user_id;
            let revoked = tables.revoke_family(&client_id, user_id);
            tracing::warn!(
                client_id = %client_id,
                user_id,
                revoked,
                "Refresh token reuse detected, token family revoked"
            );
            return RefreshClaim::Reused { client_id, user_id, revoked };
        }

        row.revoked = true;
        RefreshClaim::Claimed(row.clone())
    }

    /// Revoke every token for `(client_id, user_id)`. Used for logout and by
    /// collaborators outside the grant paths.
    pub async fn revoke_tokens_for(&self, client_id: &str, user_id: i64) -> usize {
        self.inner.write().await.revoke_family(client_id, user_id)
    }

    /// Revoke a single token row by access token.
    pub async fn revoke_access_token(&self, access_token: &str) -> bool {
        let mut tables = self.inner.write().await;
        match tables.tokens.get_mut(access_token) {
            Some(token) if !token.revoked => {
                token.revoked = true;
                true
            }
            _ => false,
        }
    }
}

impl Default for OAuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OAuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthStore").finish()
    }
}
