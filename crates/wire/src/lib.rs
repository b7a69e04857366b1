// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The signed-request codec (C1): HMAC-SHA256 over a canonical request
//! tuple, plus the replay-nonce store that backs it.
//!
//! Transport-agnostic by design — this crate knows nothing about HTTP
//! headers or axum. `relay-gateway` and `relay-agent` map `X-Timestamp` /
//! `X-Nonce` / `X-Signature` / `X-Run-Id` / `X-Capability-Token` headers
//! onto [`SignableRequest`] and [`verify`] on either side of the wire.

pub mod canonical;
pub mod hex;
pub mod hmac;
pub mod nonce;

use serde::{Deserialize, Serialize};

pub use hmac::SigningKey;
pub use nonce::NonceStore;

/// Header names used by the signed-request codec.
pub mod headers {
    pub const TIMESTAMP: &str = "x-timestamp";
    pub const NONCE: &str = "x-nonce";
    pub const SIGNATURE: &str = "x-signature";
    pub const RUN_ID: &str = "x-run-id";
    pub const CAPABILITY_TOKEN: &str = "x-capability-token";
}

/// Everything needed to compute or verify one request's signature.
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub body: &'a [u8],
    pub timestamp_secs: u64,
    pub nonce: &'a str,
    pub run_id: Option<&'a str>,
    pub capability_token: Option<&'a str>,
}

/// Why a signed request was rejected.
///
/// Mirrors the `auth.*` kinds in `relay_core::ErrorCode`; kept as a
/// standalone enum here so this crate has no dependency on the gateway's
/// HTTP error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireError {
    BadSignature,
    Skew,
    Replay,
}

impl WireError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadSignature => "auth.bad_signature",
            Self::Skew => "auth.skew",
            Self::Replay => "auth.replay",
        }
    }
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for WireError {}

/// Sign `req` with `key`, returning the hex-encoded HMAC-SHA256 tag.
pub fn sign(key: &SigningKey, req: &SignableRequest<'_>) -> String {
    let tuple = canonical::tuple(req);
    key.sign_hex(tuple.as_bytes())
}

/// Verify a request end to end: signature, clock skew, then replay.
///
/// Order matters for the error the caller sees: a forged signature is
/// reported as `BadSignature` even if its (forged) timestamp is stale,
/// since the timestamp can't be trusted until the signature checks out.
/// On success the nonce is recorded against `now_secs`.
#[allow(clippy::too_many_arguments)]
pub fn verify(
    key: &SigningKey,
    req: &SignableRequest<'_>,
    signature_hex: &str,
    now_secs: u64,
    clock_skew_secs: u64,
    nonces: &NonceStore,
) -> Result<(), WireError> {
    let tuple = canonical::tuple(req);
    if !key.verify_hex(tuple.as_bytes(), signature_hex) {
        return Err(WireError::BadSignature);
    }

    let skew = now_secs.abs_diff(req.timestamp_secs);
    if skew > clock_skew_secs {
        return Err(WireError::Skew);
    }

    if !nonces.check_and_record(req.nonce, now_secs) {
        return Err(WireError::Replay);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req<'a>(nonce: &'a str, timestamp_secs: u64) -> SignableRequest<'a> {
        SignableRequest {
            method: "POST",
            path: "/api/runs/claim",
            body: b"{}",
            timestamp_secs,
            nonce,
            run_id: Some("run-abc"),
            capability_token: Some("cap-xyz"),
        }
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let key = SigningKey::new(b"top-secret");
        let nonces = NonceStore::new(600);
        let request = req("nonce-1", 1_000);
        let sig = sign(&key, &request);

        assert!(verify(&key, &request, &sig, 1_000, 300, &nonces).is_ok());
    }

    #[test]
    fn a_tampered_signature_is_rejected() {
        let key = SigningKey::new(b"top-secret");
        let nonces = NonceStore::new(600);
        let request = req("nonce-2", 1_000);
        let mut sig = sign(&key, &request);
        sig.replace_range(0..2, "ff");

        assert_eq!(verify(&key, &request, &sig, 1_000, 300, &nonces), Err(WireError::BadSignature));
    }

    #[test]
    fn excess_clock_skew_is_rejected_in_either_direction() {
        let key = SigningKey::new(b"top-secret");
        let request = req("nonce-3", 1_000);
        let sig = sign(&key, &request);

        let nonces_future = NonceStore::new(600);
        assert_eq!(
            verify(&key, &request, &sig, 2_000, 300, &nonces_future),
            Err(WireError::Skew)
        );

        let nonces_past = NonceStore::new(600);
        assert_eq!(verify(&key, &request, &sig, 1_000, 300, &nonces_past), Ok(()));
    }

    #[test]
    fn a_replayed_nonce_is_rejected_within_the_window_but_not_after() {
        let key = SigningKey::new(b"top-secret");
        let nonces = NonceStore::new(600);
        let request = req("nonce-4", 1_000);
        let sig = sign(&key, &request);

        assert!(verify(&key, &request, &sig, 1_000, 300, &nonces).is_ok());
        assert_eq!(verify(&key, &request, &sig, 1_100, 300, &nonces), Err(WireError::Replay));
        // Past the expiry window, the nonce is forgotten and the request succeeds again.
        assert!(verify(&key, &request, &sig, 1_700, 300, &nonces).is_ok());
    }
}
