//! PKCE and state-token generation for the OAuth authorization-code flows.
//!
//! All outputs are URL-safe base64 without padding, suitable for query
//! parameters and form bodies as-is.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a PKCE code verifier from 32 bytes of OS randomness.
///
/// 32 bytes encode to 43 characters, comfortably inside the 43..=128
/// range RFC 7636 requires.
pub fn generate_code_verifier() -> String {
    random_token(32)
}

/// Generate an opaque state token binding the callback to the initiating
/// request. Doubles as the pending-authorization lookup key.
pub fn generate_state() -> String {
    random_token(32)
}

/// Derive the S256 code challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64_url::encode(&digest)
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    // OsRng-backed; failure here means a broken platform, not a recoverable
    // request error.
    rand::thread_rng().fill_bytes(&mut bytes);
    base64_url::encode(&bytes)
}
