pub mod email;
pub mod persistent_jobs;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::errors::CustomError;

/// An email waiting to be rendered and delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailJob {
    pub to: String,
    pub full_name: String,
    pub kind: MailKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MailKind {
    Otp { code: String, ttl_minutes: i64 },
    VerifyAccount { link: String, ttl_minutes: i64 },
    PasswordReset { link: String, ttl_minutes: i64 },
    LoginConfirmation { login_time: String },
}

/// Hands mail jobs over for delivery without waiting for the SMTP exchange.
pub trait Notifier: Send + Sync {
    fn dispatch(&self, job: MailJob) -> BoxFuture<'_, Result<(), CustomError>>;
}
