// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking-prompt detection (C7): a small regex family over raw stdout/
//! stderr chunks, precompiled once the way [`relay_core::Redactor`]
//! precompiles its own patterns.

use regex::RegexSet;

/// Detects lines that look like a worker is blocked waiting on interactive
/// input, so the driver can surface a `prompt_waiting` event.
#[derive(Debug, Clone)]
pub struct PromptDetector {
    set: RegexSet,
}

fn patterns() -> Vec<&'static str> {
    vec![
        r"(?i)would you like",
        r"(?i)continue\?",
        r"\[[Yy]/[Nn]\]",
        r"(?i)press enter",
        r"\?\s*$",
    ]
}

impl PromptDetector {
    pub fn new() -> Self {
        // The fixed pattern family above is known-valid and covered by this
        // module's own tests.
        let set = RegexSet::new(patterns()).unwrap_or_else(|_| RegexSet::empty());
        Self { set }
    }

    /// Whether `chunk` matches any blocking-prompt pattern.
    pub fn is_blocking_prompt(&self, chunk: &str) -> bool {
        let trimmed = chunk.trim_end_matches(['\n', '\r']);
        self.set.is_match(trimmed)
    }
}

impl Default for PromptDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use yare::parameterized;

    use super::*;

    #[parameterized(
        would_you_like = { "Would you like to proceed with these changes?" },
        continue_prompt = { "Continue? " },
        yn_bracket = { "Overwrite existing file [Y/n]" },
        press_enter = { "Press Enter to continue" },
        trailing_question_mark = { "Do you trust this workspace?" },
    )]
    fn recognizes_blocking_prompt_shapes(line: &str) {
        let detector = PromptDetector::new();
        assert!(detector.is_blocking_prompt(line));
    }

    #[test]
    fn ordinary_stdout_is_not_a_blocking_prompt() {
        let detector = PromptDetector::new();
        assert!(!detector.is_blocking_prompt("Compiling relay-agent v0.1.0"));
        assert!(!detector.is_blocking_prompt("applied 3 edits to src/lib.rs"));
    }

    #[test]
    fn trailing_whitespace_and_newlines_do_not_hide_a_match() {
        let detector = PromptDetector::new();
        assert!(detector.is_blocking_prompt("Continue?\n"));
        assert!(detector.is_blocking_prompt("Continue?\r\n"));
    }
}
