//! Engine-level tests exercising the grant dispatcher without HTTP:
//! claim races, rotation families, and a client disappearing mid-flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use campus_id::error::GrantError;
use campus_id::grants::{TokenRequest, handle_token_request};
use campus_id::models::GrantedFields;
use campus_id::store::{NewAuthCode, OAuthStore};

const REDIRECT_URI: &str = "https://app.example/cb";
const VERIFIER: &str = "engine-test-verifier-0123456789abcdef";

async fn setup_client_and_code(store: &OAuthStore) -> (String, String) {
    let client_id = store
        .register_client(
            "Engine Test App",
            &[REDIRECT_URI.to_owned()],
            &["profile:basic".to_owned()],
            false,
        )
        .await
        .unwrap()
        .client
        .client_id;

    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(VERIFIER.as_bytes()));
    let code = store
        .create_auth_code(NewAuthCode {
            user_id: 7,
            client_id: client_id.clone(),
            redirect_uri: REDIRECT_URI.to_owned(),
            scope: "profile:basic".to_owned(),
            code_challenge: Some(challenge),
            code_challenge_method: Some("S256".to_owned()),
            granted_fields: GrantedFields::new(),
        })
        .await;

    (client_id, code)
}

fn exchange_request(client_id: &str, code: &str) -> TokenRequest {
    TokenRequest {
        grant_type: "authorization_code".to_owned(),
        code: Some(code.to_owned()),
        redirect_uri: Some(REDIRECT_URI.to_owned()),
        client_id: client_id.to_owned(),
        code_verifier: Some(VERIFIER.to_owned()),
        ..TokenRequest::default()
    }
}

#[tokio::test]
async fn test_concurrent_exchange_has_one_winner() {
    let store = OAuthStore::new();
    let (client_id, code) = setup_client_and_code(&store).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let req = exchange_request(&client_id, &code);
        handles.push(tokio::spawn(async move { handle_token_request(&store, &req).await }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_rotation_family_revocation_through_dispatcher() {
    let store = OAuthStore::new();
    let (client_id, code) = setup_client_and_code(&store).await;

    let pair = handle_token_request(&store, &exchange_request(&client_id, &code)).await.unwrap();

    let refresh_req = |token: &str| TokenRequest {
        grant_type: "refresh_token".to_owned(),
        refresh_token: Some(token.to_owned()),
        client_id: client_id.clone(),
        ..TokenRequest::default()
    };

    let rotated = handle_token_request(&store, &refresh_req(&pair.refresh_token)).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    // Replaying the spent token revokes the whole family.
    let err =
        handle_token_request(&store, &refresh_req(&pair.refresh_token)).await.unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");

    assert!(store.find_valid_access_token(&rotated.access_token).await.is_none());
    let err =
        handle_token_request(&store, &refresh_req(&rotated.refresh_token)).await.unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");
}

#[tokio::test]
async fn test_refresh_token_bound_to_client() {
    let store = OAuthStore::new();
    let (client_id, code) = setup_client_and_code(&store).await;
    let pair = handle_token_request(&store, &exchange_request(&client_id, &code)).await.unwrap();

    let other_client_id = store
        .register_client(
            "Other App",
            &[REDIRECT_URI.to_owned()],
            &["profile:basic".to_owned()],
            false,
        )
        .await
        .unwrap()
        .client
        .client_id;

    let err = handle_token_request(
        &store,
        &TokenRequest {
            grant_type: "refresh_token".to_owned(),
            refresh_token: Some(pair.refresh_token),
            client_id: other_client_id,
            ..TokenRequest::default()
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.error_code(), "invalid_grant");
}

#[tokio::test]
async fn test_client_deleted_mid_flow_fails_safely() {
    let store = OAuthStore::new();
    let (client_id, code) = setup_client_and_code(&store).await;

    store.delete_client(&client_id).await;

    let err =
        handle_token_request(&store, &exchange_request(&client_id, &code)).await.unwrap_err();
    assert_eq!(err, GrantError::InvalidClient("Unknown client_id"));
}
