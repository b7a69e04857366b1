// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The signed-request HTTP client an agent uses to talk to its gateway's
//! connect-back surface (C1), grounded in the teacher's `UpstreamClient`
//! shape — a thin `reqwest::Client` wrapper with a base URL and an auth
//! helper, except here every request is HMAC-signed rather than
//! bearer-authenticated.

use relay_core::{Command, CommandId, Event, EventType, Run, RunId, RunState};
use relay_wire::{headers, SignableRequest, SigningKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgentError;

pub struct GatewayClient {
    base_url: String,
    agent_id: String,
    signing_key: SigningKey,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestEventResponse {
    pub ok: bool,
    pub event_id: String,
}

impl GatewayClient {
    pub fn new(base_url: String, agent_id: String, hmac_secret: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { base_url, agent_id, signing_key: SigningKey::new(hmac_secret.as_bytes()), http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn now_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Sign and send one request, scoped to `run_id`/`capability_token` when
    /// given, returning the deserialized JSON body.
    async fn signed_request<T: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &T,
        run_id: Option<&str>,
        capability_token: Option<&str>,
    ) -> Result<R, AgentError> {
        let body_bytes = serde_json::to_vec(body).map_err(|e| AgentError::validation(e.to_string()))?;
        let timestamp_secs = self.now_secs();
        let nonce = Uuid::new_v4().simple().to_string();

        let signable = SignableRequest {
            method: method.as_str(),
            path,
            body: &body_bytes,
            timestamp_secs,
            nonce: &nonce,
            run_id,
            capability_token,
        };
        let signature = relay_wire::sign(&self.signing_key, &signable);

        let mut req = self
            .http
            .request(method, self.url(path))
            .header(headers::TIMESTAMP, timestamp_secs.to_string())
            .header(headers::NONCE, &nonce)
            .header(headers::SIGNATURE, &signature)
            .header("content-type", "application/json")
            .body(body_bytes);
        if let Some(run_id) = run_id {
            req = req.header(headers::RUN_ID, run_id);
        }
        if let Some(token) = capability_token {
            req = req.header(headers::CAPABILITY_TOKEN, token);
        }

        let resp = req.send().await?.error_for_status()?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| AgentError::transport(e.to_string()))
    }

    pub async fn register(
        &self,
        label: &str,
        version: &str,
        capabilities: &[relay_core::WorkerType],
    ) -> Result<(), AgentError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            agent_id: &'a str,
            label: &'a str,
            version: &'a str,
            capabilities: &'a [relay_core::WorkerType],
        }
        let _: serde_json::Value = self
            .signed_request(
                reqwest::Method::POST,
                "/api/clients/register",
                &Req { agent_id: &self.agent_id, label, version, capabilities },
                None,
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn heartbeat(&self) -> Result<(), AgentError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            agent_id: &'a str,
        }
        let _: serde_json::Value = self
            .signed_request(
                reqwest::Method::POST,
                "/api/clients/heartbeat",
                &Req { agent_id: &self.agent_id },
                None,
                None,
            )
            .await?;
        Ok(())
    }

    /// `null` when the gateway has nothing claimable right now.
    pub async fn claim(&self) -> Result<Option<Run>, AgentError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            agent_id: &'a str,
        }
        self.signed_request(
            reqwest::Method::POST,
            "/api/runs/claim",
            &Req { agent_id: &self.agent_id },
            None,
            None,
        )
        .await
    }

    pub async fn ingest_event(
        &self,
        run_id: &RunId,
        capability_token: &str,
        kind: EventType,
        data: &str,
        sequence: Option<u64>,
    ) -> Result<IngestEventResponse, AgentError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            #[serde(rename = "type")]
            kind: EventType,
            data: &'a str,
            sequence: Option<u64>,
        }
        self.signed_request(
            reqwest::Method::POST,
            "/api/ingest/event",
            &Req { kind, data, sequence },
            Some(run_id.as_str()),
            Some(capability_token),
        )
        .await
    }

    pub async fn list_commands(
        &self,
        run_id: &RunId,
        capability_token: &str,
    ) -> Result<Vec<Command>, AgentError> {
        self.signed_request(
            reqwest::Method::GET,
            &format!("/api/runs/{}/commands", run_id.as_str()),
            &serde_json::json!({}),
            Some(run_id.as_str()),
            Some(capability_token),
        )
        .await
    }

    pub async fn ack_command(
        &self,
        run_id: &RunId,
        capability_token: &str,
        command_id: &CommandId,
        result: Option<String>,
        error: Option<String>,
    ) -> Result<Command, AgentError> {
        #[derive(Serialize)]
        struct Req {
            result: Option<String>,
            error: Option<String>,
        }
        self.signed_request(
            reqwest::Method::POST,
            &format!("/api/runs/{}/commands/{}/ack", run_id.as_str(), command_id.as_str()),
            &Req { result, error },
            Some(run_id.as_str()),
            Some(capability_token),
        )
        .await
    }

    pub async fn post_state(
        &self,
        run_id: &RunId,
        capability_token: &str,
        state: &RunState,
    ) -> Result<(), AgentError> {
        let _: serde_json::Value = self
            .signed_request(
                reqwest::Method::POST,
                &format!("/api/runs/{}/state", run_id.as_str()),
                state,
                Some(run_id.as_str()),
                Some(capability_token),
            )
            .await?;
        Ok(())
    }

    /// Multipart artifact upload. The signature covers a hash of the exact
    /// bytes sent on the wire, so the multipart body is built by hand with
    /// a fixed boundary rather than via `reqwest::multipart::Form` (which
    /// picks a fresh random boundary per build — if the signed bytes and
    /// the sent bytes diverged even in the boundary string, the gateway's
    /// body-hash verification would never match).
    pub async fn upload_artifact(
        &self,
        run_id: &RunId,
        capability_token: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), AgentError> {
        let path = format!("/api/runs/{}/artifacts", run_id.as_str());
        let boundary = format!("relay-agent-{}", Uuid::new_v4().simple());
        let body = build_multipart_body(&boundary, name, &bytes);

        let timestamp_secs = self.now_secs();
        let nonce = Uuid::new_v4().simple().to_string();
        let signable = SignableRequest {
            method: "POST",
            path: &path,
            body: &body,
            timestamp_secs,
            nonce: &nonce,
            run_id: Some(run_id.as_str()),
            capability_token: Some(capability_token),
        };
        let signature = relay_wire::sign(&self.signing_key, &signable);

        self.http
            .post(self.url(&path))
            .header(headers::TIMESTAMP, timestamp_secs.to_string())
            .header(headers::NONCE, &nonce)
            .header(headers::SIGNATURE, &signature)
            .header(headers::RUN_ID, run_id.as_str())
            .header(headers::CAPABILITY_TOKEN, capability_token)
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Hand-build a single-part multipart/form-data body so the bytes signed
/// and the bytes sent are byte-for-byte identical.
fn build_multipart_body(boundary: &str, field_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{field_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_carries_the_field_name_and_bytes_verbatim() {
        let body = build_multipart_body("b1", "latest.diff", b"diff --git a b");
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("name=\"latest.diff\""));
        assert!(text.contains("diff --git a b"));
        assert!(text.starts_with("--b1\r\n"));
        assert!(text.trim_end().ends_with("--b1--"));
    }
}
