//! HMAC-SHA256 request signing with the service's own key.
//!
//! The secret store authenticates the calling service, never the end
//! user: signatures are derived from key material configured at startup,
//! and no caller-supplied credentials participate.

use sha2::{Digest, Sha256};

const BLOCK_SIZE: usize = 64;

/// Signing key material for the service identity.
#[derive(Clone)]
pub struct ServiceKey {
    key_id: String,
    secret: Vec<u8>,
}

impl std::fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("ServiceKey")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl ServiceKey {
    /// Creates a key from its identifier and secret material.
    #[must_use]
    pub fn new(key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret: secret.into().into_bytes(),
        }
    }

    /// Returns the key identifier.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Signs a request, producing a hex-encoded signature over
    /// `METHOD\nPATH\nDATE`.
    #[must_use]
    pub fn sign(&self, method: &str, path: &str, date: &str) -> String {
        let message = format!("{method}\n{path}\n{date}");
        hex::encode(hmac_sha256(&self.secret, message.as_bytes()))
    }
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        let digest = Sha256::digest(key);
        padded[..digest.len()].copy_from_slice(&digest);
    } else {
        padded[..key.len()].copy_from_slice(key);
    }

    let mut ipad = [0x36u8; BLOCK_SIZE];
    let mut opad = [0x5cu8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        ipad[i] ^= padded[i];
        opad[i] ^= padded[i];
    }

    let inner = Sha256::new()
        .chain_update(ipad)
        .chain_update(message)
        .finalize();
    let outer = Sha256::new()
        .chain_update(opad)
        .chain_update(inner)
        .finalize();
    outer.into()
}
