//! State behind the email verification screen: the six-slot code form, the
//! resend countdown and the calls it makes against the auth API.

pub mod api;
pub mod cooldown;
pub mod otp_form;
pub mod verification;

pub use api::{AuthClient, ClientError};
pub use cooldown::{ResendCooldown, RESEND_COOLDOWN_SECS};
pub use otp_form::OtpForm;
pub use verification::{Notice, NoticeKind, OtpBackend, OtpVerification};
