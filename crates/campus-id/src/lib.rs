//! Campus-ID OAuth 2.0 Authorization Server
//!
//! An OAuth 2.0 Authorization Code provider with mandatory PKCE (S256),
//! issuing delegated, scope-limited access to user identity profiles.
//!
//! # Features
//!
//! - **Single-use authorization codes**: atomic claim-or-fail, 10-minute TTL
//! - **PKCE required**: S256 only, public clients carry no secret
//! - **Refresh rotation**: strictly single-use refresh tokens with reuse
//!   (theft) detection and token-family revocation
//! - **Scoped profiles**: tokens carry per-scope field grants resolved at
//!   the resource endpoint
//!
//! # Example
//!
//! ```no_run
//! use campus_id::{config::Config, server::create_router, store::OAuthStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = OAuthStore::new();
//!     let app = create_router(store, config);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod grants;
pub mod models;
pub mod pkce;
pub mod server;
pub mod store;
pub mod tokens;

pub use config::Config;
pub use error::{GrantError, RegistrationError};
pub use store::OAuthStore;
