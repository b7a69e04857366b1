// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenario tests driving the real `build_router` over an
//! in-process `axum_test::TestServer`, mirroring the numbered scenarios
//! and boundary behaviors called out for the gateway's external surface.
//! Every agent-facing call is HMAC-signed by hand here (no `relay-agent`
//! dependency) so the signing codec, the middleware, and the run/command
//! state machine are all exercised together rather than in isolation.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use relay_core::FakeClock;
use relay_gateway::test_support::StateBuilder;
use relay_gateway::transport::build_router;
use relay_wire::{headers, sign, SignableRequest, SigningKey};
use serde_json::json;

const HMAC_SECRET: &str = "test-secret";

fn signed_request(
    server: &axum_test::TestServer,
    method: &str,
    path: &str,
    body: &serde_json::Value,
    now_secs: u64,
    run_id: Option<&str>,
    capability_token: Option<&str>,
) -> axum_test::TestRequest {
    // GET carries no body over the wire, so the signature must cover the
    // same empty bytes the middleware will actually read back.
    let body_bytes = if method == "GET" { Vec::new() } else { serde_json::to_vec(body).unwrap_or_default() };
    let key = SigningKey::new(HMAC_SECRET.as_bytes());
    let signable = SignableRequest {
        method,
        path,
        body: &body_bytes,
        timestamp_secs: now_secs,
        nonce: &uuid::Uuid::new_v4().simple().to_string(),
        run_id,
        capability_token,
    };
    let signature = sign(&key, &signable);

    let mut req = match method {
        "GET" => server.get(path),
        "POST" => server.post(path).json(body),
        other => unimplemented!("unused in these scenarios: {other}"),
    };
    req = req
        .add_header(HeaderName::from_static(headers::TIMESTAMP), HeaderValue::from_str(&now_secs.to_string()).unwrap_or(HeaderValue::from_static("0")))
        .add_header(HeaderName::from_static(headers::NONCE), HeaderValue::from_str(signable.nonce).unwrap_or(HeaderValue::from_static("")))
        .add_header(HeaderName::from_static(headers::SIGNATURE), HeaderValue::from_str(&signature).unwrap_or(HeaderValue::from_static("")));
    if let Some(run_id) = run_id {
        req = req.add_header(HeaderName::from_static(headers::RUN_ID), HeaderValue::from_str(run_id).unwrap_or(HeaderValue::from_static("")));
    }
    if let Some(token) = capability_token {
        req = req.add_header(HeaderName::from_static(headers::CAPABILITY_TOKEN), HeaderValue::from_str(token).unwrap_or(HeaderValue::from_static("")));
    }
    req
}

fn server_with_clock(clock: FakeClock) -> axum_test::TestServer {
    let state = Arc::new(StateBuilder::new().clock(clock).build());
    axum_test::TestServer::new(build_router(state)).unwrap_or_else(|e| panic!("test server: {e}"))
}

/// Scenario 1: happy path — create, claim, started marker, stdout event,
/// finished marker.
#[tokio::test]
async fn happy_path_create_claim_stream_finish() -> anyhow::Result<()> {
    let server = server_with_clock(FakeClock::new(1_000));

    let create = server.post("/api/runs").json(&json!({"workerType": "claude", "command": "hello"})).await;
    create.assert_status(StatusCode::OK);
    let created: serde_json::Value = create.json();
    assert_eq!(created["status"], "pending");
    let run_id = created["id"].as_str().ok_or_else(|| anyhow::anyhow!("missing run id"))?.to_owned();
    let token = created["capabilityToken"].as_str().ok_or_else(|| anyhow::anyhow!("missing token"))?.to_owned();

    let register = signed_request(
        &server,
        "POST",
        "/api/clients/register",
        &json!({"agentId": "agt-1", "label": "agent-1", "version": "0.1.0", "capabilities": ["claude"]}),
        999,
        None,
        None,
    );
    register.await.assert_status(StatusCode::OK);

    let claim_req = signed_request(&server, "POST", "/api/runs/claim", &json!({"agentId": "agt-1"}), 1_000, None, None);
    let claimed = claim_req.await;
    claimed.assert_status(StatusCode::OK);
    let claimed_run: serde_json::Value = claimed.json();
    assert_eq!(claimed_run["id"], run_id);

    let marker_data = serde_json::to_string(
        &json!({"pid": 1, "command": "claude hello", "workingDir": "/w", "event": "started"}),
    )?;
    let marker = json!({"type": "marker", "data": marker_data});
    let ingest =
        signed_request(&server, "POST", "/api/ingest/event", &marker, 1_001, Some(&run_id), Some(&token)).await;
    ingest.assert_status(StatusCode::OK);

    let run_after_start = server.get(&format!("/api/runs/{run_id}")).await;
    let run_after_start: serde_json::Value = run_after_start.json();
    assert_eq!(run_after_start["status"], "running");

    let stdout_event = json!({"type": "stdout", "data": "hi\n"});
    let ingest2 =
        signed_request(&server, "POST", "/api/ingest/event", &stdout_event, 1_002, Some(&run_id), Some(&token)).await;
    ingest2.assert_status(StatusCode::OK);

    let events = server.get(&format!("/api/runs/{run_id}/events")).await;
    let events: Vec<serde_json::Value> = events.json();
    assert!(events.len() >= 2);
    let seqs: Vec<u64> = events.iter().map(|e| e["seq"].as_u64().unwrap_or(0)).collect();
    assert!(seqs.windows(2).all(|pair| pair[0] <= pair[1]));

    Ok(())
}

/// Scenario 2: replay — the same nonce reused within the window is
/// rejected with `auth.replay`; outside the window it's treated as fresh.
#[tokio::test]
async fn replayed_nonce_is_rejected_within_the_window() -> anyhow::Result<()> {
    let server = server_with_clock(FakeClock::new(1_000));
    let body = json!({"agentId": "agt-1"});
    let body_bytes = serde_json::to_vec(&body)?;
    let key = SigningKey::new(HMAC_SECRET.as_bytes());
    let signable = SignableRequest {
        method: "POST",
        path: "/api/runs/claim",
        body: &body_bytes,
        timestamp_secs: 1_000,
        nonce: "fixed-nonce",
        run_id: None,
        capability_token: None,
    };
    let signature = sign(&key, &signable);

    let first = server
        .post("/api/runs/claim")
        .json(&body)
        .add_header(HeaderName::from_static(headers::TIMESTAMP), HeaderValue::from_static("1000"))
        .add_header(HeaderName::from_static(headers::NONCE), HeaderValue::from_static("fixed-nonce"))
        .add_header(HeaderName::from_static(headers::SIGNATURE), HeaderValue::from_str(&signature)?)
        .await;
    first.assert_status(StatusCode::OK);

    let second = server
        .post("/api/runs/claim")
        .json(&body)
        .add_header(HeaderName::from_static(headers::TIMESTAMP), HeaderValue::from_static("1000"))
        .add_header(HeaderName::from_static(headers::NONCE), HeaderValue::from_static("fixed-nonce"))
        .add_header(HeaderName::from_static(headers::SIGNATURE), HeaderValue::from_str(&signature)?)
        .await;
    second.assert_status(StatusCode::UNAUTHORIZED);
    let err: serde_json::Value = second.json();
    assert_eq!(err["code"], "auth.replay");

    Ok(())
}

/// Scenario 3: stop escalation — a running run receiving `stop` is
/// reflected in its command queue for the agent to act on, and finishing
/// with a non-zero exit after a stop request lands the run as failed.
#[tokio::test]
async fn stop_then_finish_with_nonzero_exit_marks_the_run_failed() -> anyhow::Result<()> {
    let server = server_with_clock(FakeClock::new(2_000));

    let created: serde_json::Value =
        server.post("/api/runs").json(&json!({"workerType": "claude", "command": "hello"})).await.json();
    let run_id = created["id"].as_str().ok_or_else(|| anyhow::anyhow!("missing id"))?.to_owned();
    let token = created["capabilityToken"].as_str().ok_or_else(|| anyhow::anyhow!("missing token"))?.to_owned();

    let started_data = serde_json::to_string(
        &json!({"pid": 1, "command": "claude", "workingDir": "/w", "event": "started"}),
    )?;
    let started = json!({"type": "marker", "data": started_data});
    signed_request(&server, "POST", "/api/ingest/event", &started, 2_000, Some(&run_id), Some(&token)).await;

    let stop = server.post(&format!("/api/runs/{run_id}/stop")).await;
    stop.assert_status(StatusCode::OK);

    let commands = signed_request(&server, "GET", &format!("/api/runs/{run_id}/commands"), &json!({}), 2_001, Some(&run_id), Some(&token)).await;
    let commands: Vec<serde_json::Value> = commands.json();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0]["command"], "__STOP__");

    let finished_data = serde_json::to_string(
        &json!({"exitCode": 1, "stopRequested": true, "haltRequested": false, "event": "finished"}),
    )?;
    let finished = json!({"type": "marker", "data": finished_data});
    signed_request(&server, "POST", "/api/ingest/event", &finished, 2_010, Some(&run_id), Some(&token)).await;

    let run = server.get(&format!("/api/runs/{run_id}")).await;
    let run: serde_json::Value = run.json();
    assert_eq!(run["status"], "failed");

    Ok(())
}

/// Scenario 4: sandbox escape — enforced agent-side (`relay_agent::sandbox`,
/// covered in that crate's own tests); at the gateway layer this asserts
/// only that an arbitrary shell command is queued verbatim for the agent
/// to evaluate, since the gateway has no filesystem of its own to sandbox.
#[tokio::test]
async fn arbitrary_commands_are_queued_verbatim_for_agent_side_sandboxing() -> anyhow::Result<()> {
    let server = server_with_clock(FakeClock::new(3_000));
    let created: serde_json::Value =
        server.post("/api/runs").json(&json!({"workerType": "claude", "command": "hello"})).await.json();
    let run_id = created["id"].as_str().ok_or_else(|| anyhow::anyhow!("missing id"))?.to_owned();

    let enqueue = server.post(&format!("/api/runs/{run_id}/command")).json(&json!({"command": "cd ../../etc"})).await;
    enqueue.assert_status(StatusCode::OK);
    let command: serde_json::Value = enqueue.json();
    assert_eq!(command["command"], "cd ../../etc");

    Ok(())
}

/// Scenario 5: restart with override — a new run is created, the source
/// run is untouched.
#[tokio::test]
async fn restart_with_override_creates_a_new_run_and_leaves_the_source_alone() -> anyhow::Result<()> {
    let server = server_with_clock(FakeClock::new(4_000));
    let created: serde_json::Value =
        server.post("/api/runs").json(&json!({"workerType": "claude", "command": "hello"})).await.json();
    let run_id = created["id"].as_str().ok_or_else(|| anyhow::anyhow!("missing id"))?.to_owned();

    let restarted = server.post(&format!("/api/runs/{run_id}/restart")).json(&json!({"command": "hello again"})).await;
    restarted.assert_status(StatusCode::OK);
    let restarted: serde_json::Value = restarted.json();
    assert_ne!(restarted["id"], run_id);
    assert_eq!(restarted["status"], "pending");

    let original = server.get(&format!("/api/runs/{run_id}")).await;
    let original: serde_json::Value = original.json();
    assert_eq!(original["status"], "pending");

    Ok(())
}

/// `resume` rejects a source run that hasn't reached a terminal state.
#[tokio::test]
async fn resume_is_rejected_while_the_source_run_is_still_pending() -> anyhow::Result<()> {
    let server = server_with_clock(FakeClock::new(4_100));
    let created: serde_json::Value =
        server.post("/api/runs").json(&json!({"workerType": "claude", "command": "hello"})).await.json();
    let run_id = created["id"].as_str().ok_or_else(|| anyhow::anyhow!("missing id"))?.to_owned();

    let resumed = server.post(&format!("/api/runs/{run_id}/restart")).json(&json!({"resume": true})).await;
    resumed.assert_status(StatusCode::BAD_REQUEST);

    Ok(())
}

/// `resume` on a terminal run re-seeds the new run's working directory from
/// the source's last reported state and records `resumedFrom`.
#[tokio::test]
async fn resume_seeds_working_dir_from_saved_state_and_sets_resumed_from() -> anyhow::Result<()> {
    let server = server_with_clock(FakeClock::new(4_200));
    let created: serde_json::Value = server
        .post("/api/runs")
        .json(&json!({"workerType": "claude", "command": "hello", "workingDir": "/srv/w"}))
        .await
        .json();
    let run_id = created["id"].as_str().ok_or_else(|| anyhow::anyhow!("missing id"))?.to_owned();
    let token = created["capabilityToken"].as_str().ok_or_else(|| anyhow::anyhow!("missing token"))?.to_owned();

    let register = signed_request(
        &server,
        "POST",
        "/api/clients/register",
        &json!({"agentId": "agt-1", "label": "agent-1", "version": "0.1.0", "capabilities": ["claude"]}),
        4_199,
        None,
        None,
    );
    register.await.assert_status(StatusCode::OK);

    let marker_data = serde_json::to_string(
        &json!({"pid": 1, "command": "claude hello", "workingDir": "/srv/w", "event": "started"}),
    )?;
    let marker = json!({"type": "marker", "data": marker_data});
    signed_request(&server, "POST", "/api/ingest/event", &marker, 4_200, Some(&run_id), Some(&token)).await;

    let state_report = signed_request(
        &server,
        "POST",
        &format!("/api/runs/{run_id}/state"),
        &json!({"workingDir": "/srv/w/sub"}),
        4_201,
        Some(&run_id),
        Some(&token),
    );
    state_report.await.assert_status(StatusCode::OK);

    let finished = json!({"type": "marker", "data": serde_json::to_string(&json!({"event": "finished", "exitCode": 0}))?});
    signed_request(&server, "POST", "/api/ingest/event", &finished, 4_202, Some(&run_id), Some(&token)).await;

    let resumed = server.post(&format!("/api/runs/{run_id}/restart")).json(&json!({"resume": true})).await;
    resumed.assert_status(StatusCode::OK);
    let resumed: serde_json::Value = resumed.json();
    let resumed_id = resumed["id"].as_str().ok_or_else(|| anyhow::anyhow!("missing resumed id"))?.to_owned();

    let resumed_run = server.get(&format!("/api/runs/{resumed_id}")).await;
    let resumed_run: serde_json::Value = resumed_run.json();
    assert_eq!(resumed_run["resumedFrom"], run_id);
    assert_eq!(resumed_run["restartedFrom"], run_id);
    assert_eq!(resumed_run["workingDir"], "/srv/w/sub");

    Ok(())
}

/// Scenario 6: duplicate command delivery — polling twice without acking
/// returns the same command both times (at-least-once; the agent's own
/// processed-id set is what dedups, covered in `relay_agent::processed_ids`).
#[tokio::test]
async fn unacked_commands_are_redelivered_on_the_next_poll() -> anyhow::Result<()> {
    let server = server_with_clock(FakeClock::new(5_000));
    let created: serde_json::Value =
        server.post("/api/runs").json(&json!({"workerType": "claude", "command": "hello"})).await.json();
    let run_id = created["id"].as_str().ok_or_else(|| anyhow::anyhow!("missing id"))?.to_owned();
    let token = created["capabilityToken"].as_str().ok_or_else(|| anyhow::anyhow!("missing token"))?.to_owned();

    server.post(&format!("/api/runs/{run_id}/command")).json(&json!({"command": "git status"})).await;

    let first = signed_request(&server, "GET", &format!("/api/runs/{run_id}/commands"), &json!({}), 5_001, Some(&run_id), Some(&token)).await;
    let first: Vec<serde_json::Value> = first.json();
    assert_eq!(first.len(), 1);
    let command_id = first[0]["id"].as_str().ok_or_else(|| anyhow::anyhow!("missing command id"))?.to_owned();

    let second = signed_request(&server, "GET", &format!("/api/runs/{run_id}/commands"), &json!({}), 5_002, Some(&run_id), Some(&token)).await;
    let second: Vec<serde_json::Value> = second.json();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0]["id"], command_id);

    let ack_path = format!("/api/runs/{run_id}/commands/{command_id}/ack");
    let ack = signed_request(&server, "POST", &ack_path, &json!({"result": "ok"}), 5_003, Some(&run_id), Some(&token)).await;
    ack.assert_status(StatusCode::OK);

    let third = signed_request(&server, "GET", &format!("/api/runs/{run_id}/commands"), &json!({}), 5_004, Some(&run_id), Some(&token)).await;
    let third: Vec<serde_json::Value> = third.json();
    assert!(third.is_empty());

    Ok(())
}

/// Boundary: health is exempt from both auth layers.
#[tokio::test]
async fn health_requires_no_auth() {
    let server = server_with_clock(FakeClock::new(0));
    server.get("/api/health").await.assert_status(StatusCode::OK);
}
