// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The driver-local, append-and-TTL processed-command-id set backing
//! at-least-once command idempotency (C7), mirrored on the wire crate's
//! `NonceStore` — lazy purge on each check rather than a background sweep.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct ProcessedIds {
    ttl: Duration,
    seen: HashMap<String, Instant>,
}

impl ProcessedIds {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, seen: HashMap::new() }
    }

    /// Record `id` as processed now if it hasn't been seen within the TTL.
    /// Returns `true` when newly recorded (the caller should execute the
    /// command), `false` when it's a duplicate still inside the window (the
    /// caller should skip re-execution).
    pub fn mark_if_new(&mut self, id: &str) -> bool {
        let now = Instant::now();
        self.seen.retain(|_, recorded_at| now.duration_since(*recorded_at) <= self.ttl);

        if self.seen.contains_key(id) {
            return false;
        }
        self.seen.insert(id.to_owned(), now);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_fresh_id_is_processed_a_repeat_within_ttl_is_skipped() {
        let mut ids = ProcessedIds::new(Duration::from_secs(600));
        assert!(ids.mark_if_new("cmd-1"));
        assert!(!ids.mark_if_new("cmd-1"));
    }

    #[test]
    fn an_id_past_its_ttl_is_treated_as_fresh_again() {
        let mut ids = ProcessedIds::new(Duration::from_millis(10));
        assert!(ids.mark_if_new("cmd-1"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(ids.mark_if_new("cmd-1"));
    }

    #[test]
    fn expired_entries_are_purged_on_each_check() {
        let mut ids = ProcessedIds::new(Duration::from_millis(10));
        ids.mark_if_new("cmd-1");
        std::thread::sleep(Duration::from_millis(30));
        ids.mark_if_new("cmd-2");
        assert_eq!(ids.len(), 1);
    }
}
