// Host Guard - privileged host security core
//
// Mediates the two trust boundaries of a desktop AI-assistant host:
// UI-to-host channel requests (allow-list, payload shapes, user consent)
// and passwordless email login via one-time passcodes.
//
// Domain logic lives in domains/*; collaborators (consent UI, mail outbox,
// scheduler) are wired in kernel/; the HTTP surface lives in server/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
