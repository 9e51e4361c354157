//! Server dependencies (using traits for testability)
//!
//! Central container handed to the HTTP surface and scheduled tasks. All
//! external collaborators sit behind trait objects so tests can swap them.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::common::SharedClock;
use crate::config::Config;
use crate::domains::auth::{JwtService, OtpEngine};
use crate::domains::channels::{ChannelGateway, ChannelRegistry};
use crate::kernel::{BaseOtpDelivery, ConsentBroker};

/// Everything a request handler may touch
#[derive(Clone)]
pub struct ServerDeps {
    pub gateway: Arc<ChannelGateway>,
    pub otp: Arc<OtpEngine>,
    /// Pending consent prompts, answered through the consent routes
    pub consent_broker: Arc<ConsentBroker>,
    /// JWT service for session tokens
    pub jwt_service: Arc<JwtService>,
}

impl ServerDeps {
    pub fn new(
        gateway: Arc<ChannelGateway>,
        otp: Arc<OtpEngine>,
        consent_broker: Arc<ConsentBroker>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            gateway,
            otp,
            consent_broker,
            jwt_service,
        }
    }

    /// Production wiring: the built-in channel table, the consent broker as
    /// the gateway's prompt, and the given delivery collaborator.
    pub fn from_config(
        config: &Config,
        delivery: Arc<dyn BaseOtpDelivery>,
        clock: SharedClock,
    ) -> Result<Self> {
        let broker = Arc::new(ConsentBroker::new(
            config.security.consent_prompt_timeout,
            clock.clone(),
        ));
        let gateway = ChannelGateway::new(Arc::new(ChannelRegistry::builtin()), broker.clone());
        let otp = OtpEngine::new(config.security.clone(), delivery, clock)
            .context("Invalid security configuration")?;
        let jwt_service = JwtService::new(&config.jwt_secret, config.jwt_issuer.clone())
            .with_lifetime(config.session_lifetime);

        Ok(Self::new(
            Arc::new(gateway),
            Arc::new(otp),
            broker,
            Arc::new(jwt_service),
        ))
    }
}
