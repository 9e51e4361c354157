// HTTP routes
pub mod auth;
pub mod channels;
pub mod consent;
pub mod health;

pub use auth::*;
pub use channels::*;
pub use consent::*;
pub use health::*;
