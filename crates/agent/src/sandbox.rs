// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working-directory containment for `cd`/`pwd` (C7). The only sandboxing
//! this spec requires: a run's initial working directory is its root, and
//! no `cd` may resolve outside it.

use std::path::{Path, PathBuf};

/// A run's sandbox root plus its current working directory, both always
/// absolute and lexically normalized.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    current: PathBuf,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = normalize(&root.into());
        Self { current: root.clone(), root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current(&self) -> &Path {
        &self.current
    }

    /// Path of `current` relative to `root`, for `pwd`'s reply. `.` at the
    /// root itself.
    pub fn relative_current(&self) -> PathBuf {
        self.current.strip_prefix(&self.root).map(Path::to_path_buf).unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Attempt a `cd`. Rejects `~` and bare `-` per spec, and any target that
    /// lexically resolves outside the sandbox root. On success, updates
    /// `current` and returns the new absolute path.
    pub fn change_dir(&mut self, target: &str) -> Result<PathBuf, String> {
        let trimmed = target.trim();
        if trimmed.is_empty() || trimmed == "~" || trimmed.starts_with("~/") || trimmed == "-" {
            return Err(format!("Cannot change directory: unsupported target \"{trimmed}\""));
        }

        let joined = if Path::new(trimmed).is_absolute() {
            PathBuf::from(trimmed)
        } else {
            self.current.join(trimmed)
        };
        let resolved = normalize(&joined);

        if !within(&self.root, &resolved) {
            return Err(format!(
                "Cannot change directory: path is outside sandbox ({})",
                self.root.display()
            ));
        }

        self.current = resolved.clone();
        Ok(resolved)
    }
}

/// Lexical (no filesystem access) normalization: resolves `.`/`..` segments
/// against an assumed-absolute base, the way a shell's `cd` would without
/// following symlinks.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            std::path::Component::RootDir | std::path::Component::Prefix(_) => {}
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Whether `candidate` is `root` itself or nested under it.
fn within(root: &Path, candidate: &Path) -> bool {
    candidate == root || candidate.starts_with(root)
}
