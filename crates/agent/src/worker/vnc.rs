// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The VNC pseudo-worker: a run whose subprocess is a desktop-sharing
//! server rather than an LLM CLI. Its only driver-visible behavior is
//! reacting to the `__START_VNC_STREAM__` magic verb (see C10); there is no
//! per-run model/provider variance, so unlike the LLM recipes this one
//! isn't parameterized by agent config beyond the binary name.

use relay_core::{Run, WorkerType};

use super::WorkerRecipe;
use crate::config::ListenConfig;

pub struct VncRecipe {
    binary: String,
}

impl VncRecipe {
    pub fn new(_config: &ListenConfig) -> Self {
        Self { binary: "x11vnc".to_owned() }
    }
}

impl WorkerRecipe for VncRecipe {
    fn worker_type(&self) -> WorkerType {
        WorkerType::Vnc
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    fn build_argv(&self, _run: &Run) -> Vec<String> {
        vec!["-forever".to_owned(), "-shared".to_owned(), "-rfbport".to_owned(), "5900".to_owned()]
    }

    fn build_env(&self, _run: &Run) -> Vec<(String, String)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests_support::listen_config;

    #[test]
    fn binds_a_fixed_vnc_port() {
        let recipe = VncRecipe::new(&listen_config());
        assert!(recipe.build_argv(&relay_core::Run::create(relay_core::NewRun::default(), 0)).contains(&"5900".to_owned()));
    }
}
