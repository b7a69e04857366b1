// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay-protection nonce store. Gateway-local, write-once-per-nonce;
//! entries older than the configured window are purged lazily on each
//! verification rather than by a background sweep.

use std::collections::HashMap;
use std::sync::Mutex;

pub struct NonceStore {
    window_secs: u64,
    seen: Mutex<HashMap<String, u64>>,
}

impl NonceStore {
    pub fn new(window_secs: u64) -> Self {
        Self { window_secs, seen: Mutex::new(HashMap::new()) }
    }

    /// Record `nonce` at `now_secs` if it hasn't been seen within the
    /// window. Returns `true` when newly recorded, `false` on replay.
    ///
    /// Lazily purges expired entries first so the map doesn't grow without
    /// bound under steady traffic.
    pub fn check_and_record(&self, nonce: &str, now_secs: u64) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        seen.retain(|_, recorded_at| now_secs.saturating_sub(*recorded_at) <= self.window_secs);

        if seen.contains_key(nonce) {
            return false;
        }
        seen.insert(nonce.to_owned(), now_secs);
        true
    }

    /// Number of nonces currently retained (for tests/metrics).
    pub fn len(&self) -> usize {
        match self.seen.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
