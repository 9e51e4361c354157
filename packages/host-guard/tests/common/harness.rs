//! Test harness for integration testing.
//!
//! Everything is in memory, so each test gets a completely fresh set of
//! stores, a manual clock and mock collaborators.

use axum::extract::ConnectInfo;
use axum::Extension;
use axum::Router;
use host_guard_core::common::ManualClock;
use host_guard_core::domains::auth::OtpEngine;
use host_guard_core::domains::channels::ChannelGateway;
use host_guard_core::kernel::{
    ConsentBroker, RecordingDelivery, ScriptedConsentPrompt, ServerDeps, TestDependencies,
};
use host_guard_core::server::middleware::{HostUiToken, TrustedProxies};
use host_guard_core::server::{build_app, build_host_ui_app};
use host_guard_core::SecurityConfig;
use std::net::{IpAddr, SocketAddr};
use test_context::AsyncTestContext;

/// Test harness with a fresh dependency container
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     ctx.otp().request_otp("user@example.com").await.unwrap();
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    /// Mock collaborators and the manual clock
    pub mocks: TestDependencies,
    /// The container handlers see
    pub deps: ServerDeps,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }

    async fn teardown(self) {
        // In-memory stores are dropped with the harness
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(TestDependencies::security_config())
    }

    pub fn with_config(config: SecurityConfig) -> Self {
        init_tracing();
        let mocks = TestDependencies::new();
        let deps = mocks.into_server_deps(config);
        Self { mocks, deps }
    }

    /// Consent prompts wait in the broker until answered over the host UI
    pub fn with_broker() -> Self {
        init_tracing();
        let mocks = TestDependencies::new();
        let deps = mocks.into_brokered_server_deps(TestDependencies::security_config());
        Self { mocks, deps }
    }

    pub fn otp(&self) -> &OtpEngine {
        &self.deps.otp
    }

    pub fn gateway(&self) -> &ChannelGateway {
        &self.deps.gateway
    }

    pub fn clock(&self) -> &ManualClock {
        &self.mocks.clock
    }

    pub fn delivery(&self) -> &RecordingDelivery {
        &self.mocks.delivery
    }

    pub fn broker(&self) -> &ConsentBroker {
        &self.deps.consent_broker
    }

    pub fn prompt(&self) -> &ScriptedConsentPrompt {
        &self.mocks.prompt
    }

    /// Most recent code delivered to `email` (already normalized)
    pub fn last_code(&self, email: &str) -> String {
        self.mocks
            .delivery
            .last_code_for(email)
            .expect("no code was delivered")
    }

    /// Public router as served, reached from a local socket
    pub fn app(&self) -> Router {
        self.app_from(IpAddr::from([127, 0, 0, 1]))
    }

    /// Public router reached directly from `peer`, with no trusted proxies
    pub fn app_from(&self, peer: IpAddr) -> Router {
        build_app(self.deps.clone(), TrustedProxies::default())
            .layer(Extension(ConnectInfo(SocketAddr::new(peer, 40_000))))
    }

    /// Public router reached through `proxy`, which is trusted
    pub fn app_behind_proxy(&self, proxy: IpAddr) -> Router {
        build_app(self.deps.clone(), TrustedProxies::new(vec![proxy]))
            .layer(Extension(ConnectInfo(SocketAddr::new(proxy, 40_000))))
    }

    /// Host UI router, reached from loopback
    pub fn host_ui_app(&self) -> Router {
        self.host_ui_app_from(IpAddr::from([127, 0, 0, 1]))
    }

    pub fn host_ui_app_from(&self, peer: IpAddr) -> Router {
        build_host_ui_app(self.deps.clone(), HostUiToken::new(HOST_UI_TOKEN))
            .layer(Extension(ConnectInfo(SocketAddr::new(peer, 40_001))))
    }
}

/// Capability the test host UI presents
pub const HOST_UI_TOKEN: &str = "host-ui-test-token-0123456789abcdef";

fn init_tracing() {
    // Run tests with: RUST_LOG=debug cargo test -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
