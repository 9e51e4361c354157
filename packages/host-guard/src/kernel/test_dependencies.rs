// TestDependencies - mock implementations for testing
//
// Provides mock collaborators that can be injected into ServerDeps for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{BaseConsentPrompt, BaseOtpDelivery, ConsentBroker, ServerDeps};
use crate::common::ManualClock;
use crate::config::{HashCost, SecurityConfig};
use crate::domains::auth::{JwtService, OtpEngine};
use crate::domains::channels::{ChannelGateway, ChannelRegistry, ConsentDecision, ConsentRequest};

// =============================================================================
// Recording Delivery
// =============================================================================

/// Captures every code instead of sending it
pub struct RecordingDelivery {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail_next: AtomicBool,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next delivery attempt fail
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Every `(identifier, code)` delivered so far
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_code_for(&self, identifier: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == identifier)
            .map(|(_, code)| code.clone())
    }
}

impl Default for RecordingDelivery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseOtpDelivery for RecordingDelivery {
    async fn deliver(&self, identifier: &str, code: &str) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("mail relay unavailable"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((identifier.to_string(), code.to_string()));
        Ok(())
    }
}

// =============================================================================
// Scripted Consent Prompt
// =============================================================================

/// Answers prompts from a script and records what it was asked.
/// Once the script runs out every prompt is denied.
pub struct ScriptedConsentPrompt {
    answers: Mutex<Vec<ConsentDecision>>,
    asked: Mutex<Vec<ConsentRequest>>,
}

impl ScriptedConsentPrompt {
    pub fn new(answers: Vec<ConsentDecision>) -> Self {
        Self {
            answers: Mutex::new(answers),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Queue another answer
    pub fn push_answer(&self, decision: ConsentDecision) {
        self.answers.lock().unwrap().push(decision);
    }

    pub fn asked(&self) -> Vec<ConsentRequest> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseConsentPrompt for ScriptedConsentPrompt {
    async fn prompt_user(&self, request: ConsentRequest) -> ConsentDecision {
        self.asked.lock().unwrap().push(request);
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            ConsentDecision::Deny
        } else {
            answers.remove(0)
        }
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mock collaborators plus a controllable clock
pub struct TestDependencies {
    pub delivery: Arc<RecordingDelivery>,
    pub prompt: Arc<ScriptedConsentPrompt>,
    pub clock: Arc<ManualClock>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            delivery: Arc::new(RecordingDelivery::new()),
            prompt: Arc::new(ScriptedConsentPrompt::new(Vec::new())),
            clock: Arc::new(ManualClock::starting_now()),
        }
    }

    /// Security defaults with the cheapest Argon2 parameters
    pub fn security_config() -> SecurityConfig {
        SecurityConfig::builder()
            .hash_cost(HashCost::minimal())
            .build()
    }

    /// Wire the mocks into a full dependency container.
    /// The gateway prompts through the script; the broker is idle.
    pub fn into_server_deps(&self, config: SecurityConfig) -> ServerDeps {
        let broker = Arc::new(ConsentBroker::new(None, self.clock.clone()));
        self.wire(config, self.prompt.clone(), broker)
    }

    /// Like [`into_server_deps`](Self::into_server_deps), but the gateway
    /// prompts through the broker, so prompts wait for the host UI routes.
    pub fn into_brokered_server_deps(&self, config: SecurityConfig) -> ServerDeps {
        let broker = Arc::new(ConsentBroker::new(None, self.clock.clone()));
        self.wire(config, broker.clone(), broker)
    }

    fn wire(
        &self,
        config: SecurityConfig,
        prompt: Arc<dyn BaseConsentPrompt>,
        broker: Arc<ConsentBroker>,
    ) -> ServerDeps {
        let gateway = ChannelGateway::new(Arc::new(ChannelRegistry::builtin()), prompt);
        let otp = OtpEngine::new(config, self.delivery.clone(), self.clock.clone())
            .expect("test security config is valid");
        let jwt = JwtService::new("test_secret_key", "host-guard-test".to_string());

        ServerDeps::new(Arc::new(gateway), Arc::new(otp), broker, Arc::new(jwt))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
