// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cached UI-auth bearer token (`login`/`logout`/`whoami`), grounded in the
//! teacher's `credential::persist` module: one JSON file, atomic
//! temp-and-rename writes, no encryption beyond filesystem permissions.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::config::UiClientConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCredential {
    pub gateway_url: String,
    pub token: String,
}

/// Load the cached credential, if any file exists at `path` yet.
pub fn load(path: &str) -> Option<CachedCredential> {
    let bytes = std::fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Write `credential` to `path`, creating parent directories as needed.
pub fn save(path: &str, credential: &CachedCredential) -> Result<(), AgentError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let bytes = serde_json::to_vec_pretty(credential)
        .map_err(|e| AgentError::validation(format!("failed to serialize credential: {e}")))?;
    let tmp = format!("{path}.tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Remove the cached credential file, if any. Not finding one is not an
/// error — `logout` is idempotent.
pub fn clear(path: &str) -> Result<(), AgentError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// The effective bearer token for a UI-facing call: an explicit
/// `--token`/`AGENT_UI_AUTH_TOKEN` wins outright, falling back to whatever
/// `login` cached on disk.
pub fn resolve_token(config: &UiClientConfig) -> Option<String> {
    config.token.clone().or_else(|| load(&config.credential_file).map(|c| c.token))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn path(dir: &TempDir) -> anyhow::Result<String> {
        dir.path()
            .join("creds.json")
            .to_str()
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("non-utf8 tempdir path"))
    }

    #[test]
    fn save_then_load_round_trips() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let file = path(&dir)?;
        let cred = CachedCredential { gateway_url: "http://gw".to_owned(), token: "tok-1".to_owned() };
        save(&file, &cred)?;

        let Some(loaded) = load(&file) else { unreachable!("just-saved credential must load back") };
        assert_eq!(loaded.token, "tok-1");
        assert_eq!(loaded.gateway_url, "http://gw");
        Ok(())
    }

    #[test]
    fn loading_with_no_cached_file_yields_none() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        assert!(load(&path(&dir)?).is_none());
        Ok(())
    }

    #[test]
    fn clear_on_a_missing_file_is_not_an_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        clear(&path(&dir)?).map_err(anyhow::Error::msg)?;
        Ok(())
    }

    #[test]
    fn explicit_token_wins_over_the_cached_file() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let file = path(&dir)?;
        save(&file, &CachedCredential { gateway_url: "http://gw".to_owned(), token: "cached".to_owned() })?;

        let config = UiClientConfig {
            gateway_url: "http://gw".to_owned(),
            token: Some("explicit".to_owned()),
            credential_file: file,
        };
        assert_eq!(resolve_token(&config), Some("explicit".to_owned()));
        Ok(())
    }

    #[test]
    fn falls_back_to_the_cached_file_when_no_explicit_token_is_set() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let file = path(&dir)?;
        save(&file, &CachedCredential { gateway_url: "http://gw".to_owned(), token: "cached".to_owned() })?;

        let config = UiClientConfig { gateway_url: "http://gw".to_owned(), token: None, credential_file: file };
        assert_eq!(resolve_token(&config), Some("cached".to_owned()));
        Ok(())
    }
}
