// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical signing tuple: `method || path || bodyHash || timestamp ||
//! nonce || runId? || capabilityToken?`.

use ring::digest;

use crate::hex::encode as hex_encode;
use crate::SignableRequest;

const SEPARATOR: char = '\n';

/// SHA-256 of the raw request body, hex-encoded (the empty-body hash for GETs).
pub fn body_hash(body: &[u8]) -> String {
    hex_encode(digest::digest(&digest::SHA256, body).as_ref())
}

/// Build the canonical tuple that gets signed/verified.
///
/// `runId`/`capabilityToken` are included only when present so unscoped
/// requests (e.g. `register`, `claim`) sign a shorter tuple without the
/// trailing separators suggesting fields that don't apply.
pub fn tuple(req: &SignableRequest<'_>) -> String {
    let mut parts = vec![
        req.method.to_owned(),
        req.path.to_owned(),
        body_hash(req.body),
        req.timestamp_secs.to_string(),
        req.nonce.to_owned(),
    ];
    if let Some(run_id) = req.run_id {
        parts.push(run_id.to_owned());
    }
    if let Some(token) = req.capability_token {
        parts.push(token.to_owned());
    }
    parts.join(&SEPARATOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_hashes_to_the_well_known_sha256_empty_digest() {
        assert_eq!(
            body_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn run_scoped_and_unscoped_requests_produce_different_shaped_tuples() {
        let unscoped = SignableRequest {
            method: "POST",
            path: "/api/runs/claim",
            body: b"{}",
            timestamp_secs: 1,
            nonce: "n",
            run_id: None,
            capability_token: None,
        };
        let scoped = SignableRequest { run_id: Some("run-1"), capability_token: Some("cap-1"), ..unscoped.clone() };

        assert_eq!(tuple(&unscoped).matches(SEPARATOR).count(), 4);
        assert_eq!(tuple(&scoped).matches(SEPARATOR).count(), 6);
    }
}
