//! End-to-end batch checks against a mocked Cedar Agent.

use std::time::Duration;

use anyhow::Result;
use cedar_batch_client::{
    Action, BatchCheckError, BatchInput, BatchOptions, CancelCause, CedarAgentClient, Client,
    ClientConfig, DomainError, Request, Resource,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IS_AUTHORIZED: &str = "/v1/is_authorized";

/// Agent that allows `read` and denies everything else.
async fn start_read_only_agent() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IS_AUTHORIZED))
        .and(body_partial_json(json!({"action": "read"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "decision": "Allow",
            "diagnostics": {"reason": ["readers"], "errors": []},
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(IS_AUTHORIZED))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "decision": "Deny",
            "diagnostics": {"reason": [], "errors": []},
        })))
        .mount(&server)
        .await;
    server
}

fn client_for(server: &MockServer, options: BatchOptions) -> Client {
    let agent = CedarAgentClient::new(reqwest::Client::new()).with_base_url(server.uri());
    Client::new(agent, options)
}

#[tokio::test]
async fn test_grouped_batch_against_agent() -> Result<()> {
    // Arrange
    let server = start_read_only_agent().await;
    let client = client_for(&server, BatchOptions::default());
    let input = BatchInput::grouped(
        "alice",
        [
            (
                Action::from("read"),
                vec![Resource::from("doc1"), Resource::from("doc2")],
            ),
            (Action::from("write"), vec![Resource::from("doc1")]),
        ],
    );

    // Act
    let decisions = client.check_batch(input).await.into_result()?;

    // Assert
    assert_eq!(decisions.len(), 3);
    assert!(decisions[&Request::new("alice", "read", "doc1")].allowed);
    assert!(decisions[&Request::new("alice", "read", "doc2")].allowed);
    assert!(!decisions[&Request::new("alice", "write", "doc1")].allowed);
    assert_eq!(
        decisions[&Request::new("alice", "read", "doc1")]
            .diagnostics
            .reason,
        vec!["readers"]
    );
    Ok(())
}

#[tokio::test]
async fn test_client_from_config_reaches_agent() -> Result<()> {
    let server = start_read_only_agent().await;
    let mut config = ClientConfig::default();
    config.agent.base_url = server.uri();
    config.batch.parallelism = 4;

    let client = Client::from_config(&config)?;
    let requests: Vec<Request> = (0..20)
        .map(|i| Request::new("bob", "read", format!("doc{i}")))
        .collect();

    let decisions = client.check_batch(requests).await.into_result()?;

    assert_eq!(decisions.len(), 20);
    assert!(decisions.values().all(|d| d.allowed));
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 20);
    Ok(())
}

#[tokio::test]
async fn test_agent_error_aborts_batch_with_failing_request() -> Result<()> {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IS_AUTHORIZED))
        .and(body_partial_json(json!({"resource": "doc3"})))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(IS_AUTHORIZED))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"decision": "Allow"}))
                .set_delay(Duration::from_millis(5)),
        )
        .mount(&server)
        .await;
    let client = client_for(&server, BatchOptions::new(1));
    let requests: Vec<Request> = (0..10)
        .map(|i| Request::new("carol", "read", format!("doc{i}")))
        .collect();

    // Act
    let (decisions, error) = client.check_batch(requests).await.into_parts();

    // Assert
    let error = error.expect("batch should fail");
    assert!(error.is_evaluation());
    let message = error.to_string();
    assert!(message.contains("principal carol"), "got: {message}");
    assert!(message.contains("resource doc3"), "got: {message}");
    assert!(decisions.len() <= 3);
    assert!(!decisions.contains_key(&Request::new("carol", "read", "doc3")));
    Ok(())
}

#[tokio::test]
async fn test_malformed_agent_response_is_reported() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;
    let client = client_for(&server, BatchOptions::default());

    let error = client
        .check_batch(vec![Request::new("dave", "read", "doc1")])
        .await
        .into_result()
        .unwrap_err();

    match error {
        BatchCheckError::Evaluation { source, .. } => {
            assert!(matches!(source, DomainError::InvalidResponse { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_slow_agent_hits_batch_timeout() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"decision": "Allow"}))
                .set_delay(Duration::from_secs(1)),
        )
        .mount(&server)
        .await;
    let client = client_for(&server, BatchOptions::new(2));
    let requests: Vec<Request> = (0..6)
        .map(|i| Request::new("erin", "read", format!("doc{i}")))
        .collect();

    let started = std::time::Instant::now();
    let outcome = client
        .check_batch_with(
            requests,
            BatchOptions::new(2).with_timeout(Duration::from_millis(100)),
        )
        .await;

    assert!(matches!(
        outcome.error,
        Some(BatchCheckError::Cancelled {
            cause: CancelCause::DeadlineExceeded
        })
    ));
    // In-flight calls finish on their own; no new ones start after the deadline.
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(server.received_requests().await.unwrap_or_default().len() <= 3);
    Ok(())
}

#[tokio::test]
async fn test_caller_cancellation_stops_batch() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"decision": "Allow"}))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;
    let client = client_for(&server, BatchOptions::new(2));
    let requests: Vec<Request> = (0..40)
        .map(|i| Request::new("frank", "read", format!("doc{i}")))
        .collect();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        canceller.cancel();
    });

    let outcome = client.check_batch_cancellable(requests, token).await;

    assert!(matches!(
        outcome.error,
        Some(BatchCheckError::Cancelled {
            cause: CancelCause::Caller
        })
    ));
    assert!(outcome.decisions.len() < 40);
    Ok(())
}
