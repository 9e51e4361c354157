//! Channels domain - authorization of UI-to-host requests
//!
//! Responsibilities:
//! - Closed allow-list of channel names (anything unregistered is rejected)
//! - Structural payload validation before any user is bothered
//! - Consent gating for privileged channels, with per-session "always allow" caching
//! - Redaction of every error that crosses back to the UI

pub mod consent;
pub mod errors;
pub mod gateway;
pub mod payload;
pub mod registry;

pub use consent::{ConsentDecision, ConsentKey, ConsentRequest, ConsentStore, LOCAL_SESSION};
pub use errors::{GatewayError, RegistryError};
pub use gateway::{ChannelGateway, Grant, RequesterContext};
pub use payload::{FieldSpec, FieldType, PayloadShape};
pub use registry::{ChannelDescriptor, ChannelRegistry};
