//! Marketplace account-deletion webhook support.
//!
//! The platform validates the endpoint with a challenge handshake: it calls
//! with a `challenge_code` and expects back the hex SHA-256 of
//! challenge ‖ verification-token ‖ endpoint URL, in exactly that order.

use sha2::{Digest, Sha256};

/// Compute the challenge response digest for the verification handshake
pub fn challenge_response(challenge: &str, verification_token: &str, endpoint: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(challenge.as_bytes());
    hasher.update(verification_token.as_bytes());
    hasher.update(endpoint.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
