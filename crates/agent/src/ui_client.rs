// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin HTTP client over the gateway's UI-facing surface (§6), used by the
//! CLI's `list`/`show`/`stop`/`halt`/`escape`/`input`/`restart`/`resume`
//! wrappers. Bearer-authenticated rather than signed, grounded in the
//! teacher's `UpstreamClient`/broker HTTP client shape.

use relay_core::{Command, Event, NewRun, Run, RunState};
use serde::{Deserialize, Serialize};

use crate::config::UiClientConfig;
use crate::credential::resolve_token;
use crate::error::AgentError;

pub struct UiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRunRequest {
    pub command: Option<String>,
    pub worker_type: Option<String>,
    pub model: Option<String>,
    pub working_dir: Option<String>,
    pub autonomous: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRunResponse {
    pub id: String,
    pub capability_token: String,
    pub status: String,
}

impl UiClient {
    pub fn new(config: &UiClientConfig) -> Self {
        let http = reqwest::Client::builder().timeout(std::time::Duration::from_secs(30)).build().unwrap_or_default();
        Self { base_url: config.gateway_url.trim_end_matches('/').to_owned(), token: resolve_token(config), http }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder, AgentError> {
        let Some(token) = self.token.as_deref() else {
            return Err(AgentError::validation("not logged in; run `relay-agent login` or pass --token"));
        };
        Ok(self.http.request(method, format!("{}{path}", self.base_url)).bearer_auth(token))
    }

    pub async fn create_run(&self, req: CreateRunRequest) -> Result<CreateRunResponse, AgentError> {
        let resp = self.request(reqwest::Method::POST, "/api/runs")?.json(&req).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn list_runs(&self) -> Result<Vec<Run>, AgentError> {
        let resp = self.request(reqwest::Method::GET, "/api/runs")?.send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn show_run(&self, run_id: &str) -> Result<Run, AgentError> {
        let resp =
            self.request(reqwest::Method::GET, &format!("/api/runs/{run_id}"))?.send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn run_events(&self, run_id: &str, after: u64) -> Result<Vec<Event>, AgentError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/api/runs/{run_id}/events?after={after}"))?
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn run_state(&self, run_id: &str) -> Result<Option<RunState>, AgentError> {
        let resp =
            self.request(reqwest::Method::GET, &format!("/api/runs/{run_id}/state"))?.send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn send_command(&self, run_id: &str, command: &str) -> Result<Command, AgentError> {
        #[derive(Serialize)]
        struct Req<'a> {
            command: &'a str,
        }
        let resp = self
            .request(reqwest::Method::POST, &format!("/api/runs/{run_id}/command"))?
            .json(&Req { command })
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn send_input(&self, run_id: &str, input: &str, escape: bool) -> Result<Command, AgentError> {
        #[derive(Serialize)]
        struct Req<'a> {
            input: &'a str,
            escape: bool,
        }
        let resp = self
            .request(reqwest::Method::POST, &format!("/api/runs/{run_id}/input"))?
            .json(&Req { input, escape })
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    async fn control(&self, run_id: &str, verb: &str) -> Result<Command, AgentError> {
        let resp = self
            .request(reqwest::Method::POST, &format!("/api/runs/{run_id}/{verb}"))?
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn stop(&self, run_id: &str) -> Result<Command, AgentError> {
        self.control(run_id, "stop").await
    }

    pub async fn halt(&self, run_id: &str) -> Result<Command, AgentError> {
        self.control(run_id, "halt").await
    }

    pub async fn escape(&self, run_id: &str) -> Result<Command, AgentError> {
        self.control(run_id, "escape").await
    }

    /// `restart` and `resume` share the same endpoint; `resume: true` is the
    /// only distinguishing flag an agent-side caller needs to send, since
    /// the gateway enforces the terminal-state precondition and derives the
    /// seeded working directory from the source run's saved state itself.
    pub async fn restart(
        &self,
        run_id: &str,
        override_command: Option<String>,
        resume: bool,
    ) -> Result<CreateRunResponse, AgentError> {
        #[derive(Serialize)]
        struct Req {
            command: Option<String>,
            resume: bool,
        }
        let resp = self
            .request(reqwest::Method::POST, &format!("/api/runs/{run_id}/restart"))?
            .json(&Req { command: override_command, resume })
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn delete_run(&self, run_id: &str) -> Result<(), AgentError> {
        self.request(reqwest::Method::DELETE, &format!("/api/runs/{run_id}"))?.send().await?.error_for_status()?;
        Ok(())
    }
}

impl From<NewRun> for CreateRunRequest {
    fn from(run: NewRun) -> Self {
        Self {
            command: run.command,
            worker_type: run.worker_type.map(|w| w.as_str().to_owned()),
            model: run.model,
            working_dir: run.working_dir,
            autonomous: run.autonomous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> UiClientConfig {
        UiClientConfig {
            gateway_url: "http://127.0.0.1:8900/".to_owned(),
            token: token.map(str::to_owned),
            credential_file: "./does-not-exist.json".to_owned(),
        }
    }

    #[test]
    fn base_url_drops_a_trailing_slash() {
        let client = UiClient::new(&config(Some("t")));
        assert_eq!(client.base_url, "http://127.0.0.1:8900");
    }

    #[test]
    fn request_without_a_token_fails_validation() {
        let client = UiClient::new(&config(None));
        let Err(err) = client.request(reqwest::Method::GET, "/api/runs") else {
            unreachable!("a client with no resolvable token must refuse to build a request")
        };
        assert_eq!(err.code, relay_core::ErrorCode::Validation);
    }
}
