//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements S256 code challenge verification per RFC 7636. The `plain`
//! method is not supported: anything other than the literal `S256` fails.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Verify a PKCE code challenge.
///
/// Computes `BASE64URL(SHA256(code_verifier))` without padding and compares
/// byte-exact to the stored challenge. Returns `false` for any method other
/// than `S256`.
#[must_use]
pub fn verify(code_verifier: &str, code_challenge: &str, method: &str) -> bool {
    if method != "S256" {
        return false;
    }
    let hash = Sha256::digest(code_verifier.as_bytes());
    let computed = URL_SAFE_NO_PAD.encode(hash);
    computed == code_challenge
}
