pub mod identifier;
pub mod otp_record;

pub use identifier::NormalizedIdentifier;
pub use otp_record::{AttemptTicket, OtpRecord, OtpStore};
