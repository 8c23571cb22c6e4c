//! End-to-end tests against a running server
//!
//! These tests require the API server running with its resolver reachable
//! (the built-in `/api/result` simulator or the `mock-resolver` binary).
//! Runs with `AUTH_ENABLED=false` unless `E2E_TOKEN` is provided.
//!
//! Run with: cargo test --test e2e_test -- --ignored --nocapture
//!
//! Set API_BASE_URL to override default (http://localhost:8080)

mod fixtures;
mod helpers;

use std::time::Duration;

use fixtures::VALID_QUERIES;
use helpers::poll_job_status;
use serde_json::Value;

/// The resolver may take up to a minute; leave room for queueing.
const JOB_TIMEOUT: Duration = Duration::from_secs(120);

fn get_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

fn get_token() -> Option<String> {
    std::env::var("E2E_TOKEN").ok().filter(|t| !t.is_empty())
}

#[tokio::test]
#[ignore] // Requires a running API server
async fn test_e2e_health_check() {
    let base_url = get_base_url();
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .expect("Health check failed");

    assert!(
        response.status().is_success(),
        "Health check returned non-success status: {}",
        response.status()
    );

    let ping: Value = client
        .get(format!("{}/api/v1/ping", base_url))
        .send()
        .await
        .expect("Ping failed")
        .json()
        .await
        .expect("Ping body unreadable");
    assert_eq!(ping["message"], "pong");

    println!("✓ Health check passed");
}

#[tokio::test]
#[ignore] // Requires a running API server
async fn test_e2e_query_lifecycle() {
    let fixture = &VALID_QUERIES[0];
    let base_url = get_base_url();
    let token = get_token();
    let client = reqwest::Client::new();

    println!("Submitting {} - {}", fixture.cadastral_number, fixture.description);

    let mut request = client
        .post(format!("{}/api/v1/query", base_url))
        .json(&fixture.body());
    if let Some(token) = &token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.expect("Submit failed");
    assert_eq!(response.status().as_u16(), 202);

    let accepted: Value = response.json().await.expect("Submit body unreadable");
    assert_eq!(accepted["status"], "pending");
    let id = accepted["id"].as_str().expect("job id").to_string();

    let finished = poll_job_status(&client, &base_url, &id, token.as_deref(), JOB_TIMEOUT)
        .await
        .expect("Job never finished");

    match finished["status"].as_str() {
        Some("completed") => assert!(finished["result"].is_boolean()),
        Some("failed") => assert!(finished.get("result").is_none()),
        other => panic!("unexpected terminal status {other:?}"),
    }
    assert!(finished["completed_at"].is_string());

    let mut history = client.get(format!(
        "{}/api/v1/history/{}",
        base_url, fixture.cadastral_number
    ));
    if let Some(token) = &token {
        history = history.bearer_auth(token);
    }
    let jobs: Vec<Value> = history
        .send()
        .await
        .expect("History failed")
        .json()
        .await
        .expect("History body unreadable");
    assert!(jobs.iter().any(|j| j["id"] == id.as_str()));

    println!("✓ Job {} finished as {}", id, finished["status"]);
}

#[tokio::test]
#[ignore] // Requires a running API server
async fn test_e2e_batch_queries() {
    let base_url = get_base_url();
    let token = get_token();
    let client = reqwest::Client::new();

    let mut ids = Vec::new();
    for fixture in VALID_QUERIES {
        let mut request = client
            .post(format!("{}/api/v1/query", base_url))
            .json(&fixture.body());
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        let accepted: Value = request
            .send()
            .await
            .expect("Submit failed")
            .json()
            .await
            .expect("Submit body unreadable");
        ids.push(accepted["id"].as_str().expect("job id").to_string());
    }

    let polls = ids
        .iter()
        .map(|id| poll_job_status(&client, &base_url, id, token.as_deref(), JOB_TIMEOUT));
    let results = futures::future::join_all(polls).await;

    for (id, result) in ids.iter().zip(results) {
        let body = result.unwrap_or_else(|e| panic!("job {id}: {e}"));
        println!("✓ {} -> {}", id, body["status"]);
    }
}
