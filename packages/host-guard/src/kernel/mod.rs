//! Kernel module - collaborators, dependency container and background tasks.

pub mod consent_broker;
pub mod delivery;
pub mod deps;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;

pub use consent_broker::{ConsentBroker, PendingConsent};
pub use delivery::{OtpMessage, OutboxDelivery};
pub use deps::ServerDeps;
pub use scheduled_tasks::start_scheduler;
pub use test_dependencies::{RecordingDelivery, ScriptedConsentPrompt, TestDependencies};
pub use traits::*;
