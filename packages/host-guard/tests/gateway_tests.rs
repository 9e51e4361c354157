//! Integration tests for the channel authorization gateway.
//!
//! Tests the full authorization path:
//! - Closed allow-list and payload shapes of the built-in table
//! - Consent prompting, caching and revocation
//! - The consent broker as the live prompt
//! - Redaction at the trust boundary

mod common;

use common::TestHarness;
use host_guard_core::common::SystemClock;
use host_guard_core::domains::channels::{
    ChannelGateway, ChannelRegistry, ConsentDecision, GatewayError, Grant, RequesterContext,
};
use host_guard_core::kernel::ConsentBroker;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_context::test_context;

fn requester() -> RequesterContext {
    RequesterContext::new("main-window")
}

// ============================================================================
// Validation
// ============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn test_unregistered_channels_are_rejected(ctx: &TestHarness) {
    for name in ["shell:exec", "fs:write-file", "PLUGIN:START", "plugin:start\n"] {
        let result = ctx.gateway().authorize(name, None, &requester()).await;
        assert_eq!(result, Err(GatewayError::UnknownChannel(name.to_string())));
    }
    assert!(ctx.prompt().asked().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_payload_shapes_enforced(ctx: &TestHarness) {
    let cases = [
        ("settings:update", json!({"key": "theme"})),
        ("plugin:start", json!({"pluginId": "x", "args": "--flag"})),
        ("fs:read-file", json!({"path": "/tmp/a", "encoding": "latin1"})),
        ("llm:generate", json!({"prompt": "hi", "unexpected": true})),
        ("auth:logout", json!({"everything": true})),
        ("plugin:list", json!([])),
    ];

    for (channel, payload) in cases {
        let result = ctx
            .gateway()
            .authorize(channel, Some(&payload), &requester())
            .await;
        assert!(
            matches!(result, Err(GatewayError::PayloadSchemaViolation { .. })),
            "{} accepted {}",
            channel,
            payload
        );
    }
    assert!(ctx.prompt().asked().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_open_channels_never_prompt(ctx: &TestHarness) {
    let calls = [
        ("settings:get", None),
        ("plugin:list", None),
        ("plugin:stop", Some(json!({"pluginId": "weather"}))),
        ("llm:generate", Some(json!({"prompt": "hello", "stream": true}))),
        ("auth:request-otp", Some(json!({"email": "user@example.com"}))),
        ("auth:logout", None),
    ];

    for (channel, payload) in calls {
        let grant = ctx
            .gateway()
            .authorize(channel, payload.as_ref(), &requester())
            .await
            .unwrap();
        assert_eq!(grant, Grant::NotRequired, "{}", channel);
    }
    assert!(ctx.prompt().asked().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_absent_payload_still_goes_through_consent(ctx: &TestHarness) {
    let result = ctx
        .gateway()
        .authorize("shell:open-external", None, &requester())
        .await;

    assert!(matches!(result, Err(GatewayError::UserDenied { .. })));
    assert_eq!(ctx.prompt().asked().len(), 1);
}

// ============================================================================
// Consent
// ============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn test_always_allow_persists_until_cleared(ctx: &TestHarness) {
    ctx.prompt().push_answer(ConsentDecision::AlwaysAllow);
    let payload = json!({"url": "https://example.org"});
    let op = requester().with_operation("Open example.org");

    assert_eq!(
        ctx.gateway()
            .authorize("shell:open-external", Some(&payload), &op)
            .await,
        Ok(Grant::Always)
    );
    for _ in 0..3 {
        assert_eq!(
            ctx.gateway()
                .authorize("shell:open-external", Some(&payload), &op)
                .await,
            Ok(Grant::Cached)
        );
    }
    assert_eq!(ctx.prompt().asked().len(), 1);

    ctx.gateway().clear_consent().await;

    // Script is exhausted, so the fresh prompt is a denial
    assert!(matches!(
        ctx.gateway()
            .authorize("shell:open-external", Some(&payload), &op)
            .await,
        Err(GatewayError::UserDenied { .. })
    ));
    assert_eq!(ctx.prompt().asked().len(), 2);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_grant_for_one_channel_does_not_cover_another(ctx: &TestHarness) {
    ctx.prompt().push_answer(ConsentDecision::AlwaysAllow);
    ctx.prompt().push_answer(ConsentDecision::AllowOnce);
    let op = requester().with_operation("Work on notes.txt");

    ctx.gateway()
        .authorize("fs:read-file", Some(&json!({"path": "notes.txt"})), &op)
        .await
        .unwrap();
    let grant = ctx
        .gateway()
        .authorize("plugin:start", Some(&json!({"pluginId": "notes"})), &op)
        .await
        .unwrap();

    assert_eq!(grant, Grant::Once);
    assert_eq!(ctx.prompt().asked().len(), 2);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_denial_reason_is_redacted(ctx: &TestHarness) {
    ctx.prompt().push_answer(ConsentDecision::Deny);
    let op = requester().with_operation("Read /home/alice/.ssh/id_ed25519");

    let err = ctx
        .gateway()
        .authorize(
            "fs:read-file",
            Some(&json!({"path": "/home/alice/.ssh/id_ed25519"})),
            &op,
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "user_denied");
    assert_eq!(
        err.boundary_message(),
        "user denied 'Read [path]' on fs:read-file"
    );
    assert_eq!(
        ctx.gateway().sanitize_error(&err.to_string()),
        err.boundary_message()
    );
}

// ============================================================================
// Consent broker as the live prompt
// ============================================================================

fn broker_gateway(timeout: Option<Duration>) -> (Arc<ChannelGateway>, Arc<ConsentBroker>) {
    let broker = Arc::new(ConsentBroker::new(timeout, Arc::new(SystemClock)));
    let gateway = Arc::new(ChannelGateway::new(
        Arc::new(ChannelRegistry::builtin()),
        broker.clone(),
    ));
    (gateway, broker)
}

#[tokio::test]
async fn test_broker_answer_reaches_waiting_request() {
    let (gateway, broker) = broker_gateway(None);
    let mut queue = broker.subscribe();

    let waiting = {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            gateway
                .authorize(
                    "plugin:start",
                    Some(&json!({"pluginId": "weather"})),
                    &requester().with_operation("Start plugin weather"),
                )
                .await
        })
    };

    let prompt = queue.recv().await.unwrap();
    assert_eq!(prompt.request.channel, "plugin:start");
    assert_eq!(prompt.request.operation, "Start plugin weather");

    broker
        .respond(prompt.id, ConsentDecision::AlwaysAllow)
        .await
        .unwrap();

    assert_eq!(waiting.await.unwrap(), Ok(Grant::Always));
    assert_eq!(gateway.consent_store().len().await, 1);
}

#[tokio::test]
async fn test_pending_prompt_does_not_block_other_requests() {
    let (gateway, broker) = broker_gateway(None);
    let mut queue = broker.subscribe();

    let waiting = {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            gateway
                .authorize(
                    "shell:open-external",
                    Some(&json!({"url": "https://example.org"})),
                    &requester(),
                )
                .await
        })
    };
    let prompt = queue.recv().await.unwrap();

    // Unrelated traffic flows while the user thinks
    assert_eq!(
        gateway.authorize("plugin:list", None, &requester()).await,
        Ok(Grant::NotRequired)
    );
    gateway.clear_consent().await;
    assert!(!waiting.is_finished());

    broker.dismiss(prompt.id).await.unwrap();
    assert!(matches!(
        waiting.await.unwrap(),
        Err(GatewayError::UserDenied { .. })
    ));
}

#[tokio::test]
async fn test_unanswered_prompt_times_out_as_denial() {
    let (gateway, broker) = broker_gateway(Some(Duration::from_millis(25)));

    let result = gateway
        .authorize(
            "fs:read-file",
            Some(&json!({"path": "report.pdf"})),
            &requester(),
        )
        .await;

    assert!(matches!(result, Err(GatewayError::UserDenied { .. })));
    assert!(broker.list_pending().await.is_empty());
}
