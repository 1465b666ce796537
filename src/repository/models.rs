use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::secrets::{PendingSecret, Rejection, SecretKind};
use crate::errors::CustomError;

#[derive(Debug, Deserialize, FromRow, Serialize, Clone, PartialEq)]
pub struct User {
    pub id: uuid::Uuid,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub verified: bool,
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_token_expires_at: Option<DateTime<Utc>>,
    pub verification_token: Option<String>,
    pub verification_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
}

/// How a pending secret is looked up when it is consumed.
#[derive(Debug, Clone, Copy)]
pub enum SecretLookup<'a> {
    /// The secret of a known user, compared against the submitted value.
    Owner { user_id: uuid::Uuid, submitted: &'a str },
    /// The user holding this exact token.
    Token(&'a str),
}

/// State transition applied when a secret is accepted.
#[derive(Debug, Clone)]
pub enum OnConsume {
    MarkVerified,
    SetPassword(String),
}

impl User {
    fn slots(&mut self, kind: SecretKind) -> (&mut Option<String>, &mut Option<DateTime<Utc>>) {
        match kind {
            SecretKind::Otp => (&mut self.otp_code, &mut self.otp_expires_at),
            SecretKind::PasswordReset => (
                &mut self.password_reset_token,
                &mut self.password_reset_token_expires_at,
            ),
            SecretKind::Verification => (
                &mut self.verification_token,
                &mut self.verification_token_expires_at,
            ),
        }
    }

    /// The live secret of `kind`, only when both halves of the pair are set.
    pub fn pending(&self, kind: SecretKind) -> Option<PendingSecret> {
        let (value, expires_at) = match kind {
            SecretKind::Otp => (&self.otp_code, &self.otp_expires_at),
            SecretKind::PasswordReset => (
                &self.password_reset_token,
                &self.password_reset_token_expires_at,
            ),
            SecretKind::Verification => (
                &self.verification_token,
                &self.verification_token_expires_at,
            ),
        };
        match (value, expires_at) {
            (Some(value), Some(expires_at)) => Some(PendingSecret {
                value: value.clone(),
                expires_at: *expires_at,
            }),
            _ => None,
        }
    }

    /// Replaces whatever secret of `kind` was pending.
    pub fn set_secret(&mut self, kind: SecretKind, secret: PendingSecret) {
        let (value, expires_at) = self.slots(kind);
        *value = Some(secret.value);
        *expires_at = Some(secret.expires_at);
    }

    pub fn clear_secret(&mut self, kind: SecretKind) {
        let (value, expires_at) = self.slots(kind);
        *value = None;
        *expires_at = None;
    }

    /// Validates `submitted` against the pending secret of `kind` and applies
    /// `effect` on success. The secret is cleared on success and on expiry;
    /// callers must persist the record in both cases.
    pub fn consume_secret(
        &mut self,
        kind: SecretKind,
        submitted: &str,
        effect: OnConsume,
        now: DateTime<Utc>,
    ) -> Result<(), CustomError> {
        let pending = self.pending(kind).ok_or(CustomError::InvalidCode)?;
        match pending.check(submitted, now) {
            Err(Rejection::Expired) => {
                self.clear_secret(kind);
                Err(CustomError::ExpiredCode)
            }
            Err(Rejection::Mismatch) => Err(CustomError::InvalidCode),
            Ok(()) => {
                self.clear_secret(kind);
                match effect {
                    OnConsume::MarkVerified => self.verified = true,
                    OnConsume::SetPassword(hash) => self.password = hash,
                }
                self.updated_at = now;
                Ok(())
            }
        }
    }
}

/// Whether a consume outcome changed the record and must be written back.
pub fn needs_write_back(outcome: &Result<(), CustomError>) -> bool {
    matches!(outcome, Ok(()) | Err(CustomError::ExpiredCode))
}

#[cfg(test)]
pub(crate) fn sample_user() -> User {
    let now = Utc::now();
    User {
        id: uuid::Uuid::new_v4(),
        full_name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        password: "hash".to_string(),
        verified: false,
        otp_code: None,
        otp_expires_at: None,
        password_reset_token: None,
        password_reset_token_expires_at: None,
        verification_token: None,
        verification_token_expires_at: None,
        created_at: now,
        updated_at: now,
    }
}
