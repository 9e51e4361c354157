// HTTP middleware
pub mod host_ui_auth;
pub mod ip_extractor;
pub mod jwt_auth;

pub use host_ui_auth::*;
pub use ip_extractor::*;
pub use jwt_auth::*;
