// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy and JSON error envelope.
//!
//! Machine-readable `kind.sub_kind` codes (e.g. `auth.replay`) rather than
//! numeric identifiers, per the dispatch-plane error taxonomy: callers branch
//! on the code, operators read the message.

use serde::{Deserialize, Serialize};

/// Canonical error codes surfaced by the gateway's HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    AuthBadSignature,
    AuthSkew,
    AuthReplay,
    AuthCapability,
    Validation,
    NotFound,
    Conflict,
    ResourceExhausted,
    SubprocessSpawnFailed,
    SubprocessExitedNonzero,
    Transport,
    RedactorError,
    Internal,
}

impl ErrorCode {
    /// HTTP status this error kind maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AuthBadSignature | Self::AuthSkew | Self::AuthReplay | Self::AuthCapability => {
                401
            }
            Self::Validation | Self::Conflict => 400,
            Self::NotFound => 404,
            Self::ResourceExhausted => 409,
            Self::SubprocessSpawnFailed | Self::SubprocessExitedNonzero => 500,
            Self::Transport => 502,
            Self::RedactorError | Self::Internal => 500,
        }
    }

    /// Machine-readable `kind.sub_kind` code, matching the taxonomy in the
    /// error handling design (e.g. `auth.replay`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthBadSignature => "auth.bad_signature",
            Self::AuthSkew => "auth.skew",
            Self::AuthReplay => "auth.replay",
            Self::AuthCapability => "auth.capability",
            Self::Validation => "validation.invalid",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::ResourceExhausted => "resource.exhausted",
            Self::SubprocessSpawnFailed => "subprocess.spawn_failed",
            Self::SubprocessExitedNonzero => "subprocess.exited_nonzero",
            Self::Transport => "transport.error",
            Self::RedactorError => "redactor.error",
            Self::Internal => "internal",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine code + human message, nested under `error` in every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Top-level JSON error envelope returned by the gateway's HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { error: code.to_error_body(message) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_kinds_map_to_401() {
        for code in [
            ErrorCode::AuthBadSignature,
            ErrorCode::AuthSkew,
            ErrorCode::AuthReplay,
            ErrorCode::AuthCapability,
        ] {
            assert_eq!(code.http_status(), 401);
        }
    }

    #[test]
    fn codes_use_dotted_machine_names() {
        assert_eq!(ErrorCode::AuthReplay.as_str(), "auth.replay");
        assert_eq!(ErrorCode::ResourceExhausted.as_str(), "resource.exhausted");
    }
}
