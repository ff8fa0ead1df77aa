mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use common::FakeBackend;
use toolbridge::mcp::{ConnectionManager, ConnectionState, McpToolResult, ToolContent};
use toolbridge::BridgeError;

#[tokio::test]
async fn test_invoke_routes_to_named_backend() {
    let weather = Arc::new(
        FakeBackend::with_tools(&["get_current_weather"])
            .returning("get_current_weather", McpToolResult::text("21°C")),
    );
    let other = Arc::new(FakeBackend::with_tools(&["get_current_weather"]));
    let mut manager = ConnectionManager::new(None);
    manager.attach("weather", weather.clone());
    manager.attach("other", other.clone());

    let result = manager
        .invoke("weather", "get_current_weather", json!({"city": "Rome"}))
        .await
        .unwrap();

    assert_eq!(result.joined_text(), "21°C");
    assert_eq!(weather.recorded_calls().len(), 1);
    assert!(other.recorded_calls().is_empty());
}

#[tokio::test]
async fn test_error_result_becomes_invocation_error() {
    let backend = Arc::new(FakeBackend::with_tools(&["query"]).returning(
        "query",
        McpToolResult {
            content: vec![ToolContent::text("syntax error near SELEC")],
            is_error: Some(true),
        },
    ));
    let mut manager = ConnectionManager::new(None);
    manager.attach("sqlite", backend);

    let err = manager.invoke("sqlite", "query", json!({})).await.unwrap_err();

    assert!(matches!(err, BridgeError::Invocation(ref msg) if msg == "syntax error near SELEC"));
}

#[tokio::test]
async fn test_unknown_backend_is_not_found() {
    let manager = ConnectionManager::default();

    let err = manager.invoke("ghost", "anything", json!({})).await.unwrap_err();

    assert!(matches!(err, BridgeError::NotFound { kind: "Backend", .. }));
}

#[tokio::test(start_paused = true)]
async fn test_slow_tool_times_out() {
    let backend = Arc::new(FakeBackend {
        delay: Some(Duration::from_secs(60)),
        ..FakeBackend::with_tools(&["slow"]).returning("slow", McpToolResult::text("late"))
    });
    let mut manager = ConnectionManager::new(Some(Duration::from_secs(5)));
    manager.attach("slow", backend);

    let err = manager.invoke("slow", "slow", json!({})).await.unwrap_err();

    assert!(err.to_string().contains("timed out after 5 seconds"));
}

#[tokio::test]
async fn test_close_all_continues_past_failures() {
    let broken = Arc::new(FakeBackend {
        fail_close: true,
        ..FakeBackend::default()
    });
    let healthy = Arc::new(FakeBackend::default());
    let mut manager = ConnectionManager::new(None);
    manager.attach("broken", broken.clone());
    manager.attach("healthy", healthy.clone());

    let failures = manager.close_all().await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "broken");
    assert!(broken.is_closed());
    assert!(healthy.is_closed());
    assert_eq!(manager.get("broken").unwrap().state(), ConnectionState::Closed);
    assert_eq!(manager.get("healthy").unwrap().state(), ConnectionState::Closed);
    assert!(manager.is_empty());

    // closing twice is a no-op
    assert!(manager.close_all().await.is_empty());
}
