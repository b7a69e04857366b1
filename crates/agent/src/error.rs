// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-side error taxonomy: the same `kind.sub_kind` machine codes as
//! [`relay_core::ErrorCode`], wrapped with a human message, the way the
//! gateway's `GatewayError` wraps its own HTTP-facing errors.

use relay_core::ErrorCode;

#[derive(Debug, Clone)]
pub struct AgentError {
    pub code: ErrorCode,
    pub message: String,
}

impl AgentError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SubprocessSpawnFailed, message)
    }

    pub fn exited_nonzero(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SubprocessExitedNonzero, message)
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceExhausted, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, message)
    }

    /// Exit code this error should surface as from the CLI: 0 success (never
    /// constructed as an `AgentError`), 1 operational failure, 2 bad config.
    pub fn exit_code(&self) -> i32 {
        match self.code {
            ErrorCode::Validation => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AgentError {}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        Self::spawn_failed(err.to_string())
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "internal agent error");
        Self::new(ErrorCode::Internal, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_exit_with_code_two() {
        let err = AgentError::validation("missing --agent-id");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn operational_errors_exit_with_code_one() {
        let err = AgentError::spawn_failed("no such file");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn display_includes_the_machine_code() {
        let err = AgentError::resource_exhausted("max concurrent reached");
        assert_eq!(err.to_string(), "resource.exhausted: max concurrent reached");
    }
}
