// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HMAC-SHA256 signing via `ring`, the teacher's own crypto dependency.

use ring::hmac;

use crate::hex;

/// A process-wide HMAC key, established out of band (config/env).
#[derive(Clone)]
pub struct SigningKey {
    key: hmac::Key,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey").finish_non_exhaustive()
    }
}

impl SigningKey {
    pub fn new(secret: &[u8]) -> Self {
        Self { key: hmac::Key::new(hmac::HMAC_SHA256, secret) }
    }

    /// Hex-encoded HMAC-SHA256 tag over `message`.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(hmac::sign(&self.key, message).as_ref())
    }

    /// Constant-time verification of a hex-encoded tag.
    ///
    /// `ring::hmac::verify` is constant-time by construction; a malformed
    /// (non-hex) tag is treated as simply not matching.
    pub fn verify_hex(&self, message: &[u8], tag_hex: &str) -> bool {
        match hex::decode(tag_hex) {
            Some(tag) => hmac::verify(&self.key, message, &tag).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_succeeds() {
        let key = SigningKey::new(b"secret");
        let tag = key.sign_hex(b"payload");
        assert!(key.verify_hex(b"payload", &tag));
    }

    #[test]
    fn verify_fails_for_wrong_key() {
        let a = SigningKey::new(b"secret-a");
        let b = SigningKey::new(b"secret-b");
        let tag = a.sign_hex(b"payload");
        assert!(!b.verify_hex(b"payload", &tag));
    }

    #[test]
    fn verify_fails_for_malformed_tag() {
        let key = SigningKey::new(b"secret");
        assert!(!key.verify_hex(b"payload", "not-hex!!"));
    }

    #[test]
    fn verify_fails_when_message_differs() {
        let key = SigningKey::new(b"secret");
        let tag = key.sign_hex(b"payload-a");
        assert!(!key.verify_hex(b"payload-b", &tag));
    }
}
