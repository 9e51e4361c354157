pub mod auth;
pub mod channels;
