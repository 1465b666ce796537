use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, Rng, RngCore};

pub const OTP_LENGTH: usize = 6;
const TOKEN_BYTES: usize = 32;

/// Six uniformly random decimal digits, zero padded.
pub fn generate_otp() -> String {
    let code: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:0width$}", code, width = OTP_LENGTH)
}

/// Url-safe opaque token, meant to be embedded in a link.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Which secret column pair of a user a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Otp,
    PasswordReset,
    Verification,
}

impl SecretKind {
    /// (value column, expiry column)
    pub fn columns(self) -> (&'static str, &'static str) {
        match self {
            SecretKind::Otp => ("otp_code", "otp_expires_at"),
            SecretKind::PasswordReset => {
                ("password_reset_token", "password_reset_token_expires_at")
            }
            SecretKind::Verification => {
                ("verification_token", "verification_token_expires_at")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Expired,
    Mismatch,
}

/// A code or token waiting to be consumed, together with its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSecret {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingSecret {
    pub fn issue(value: String, ttl_minutes: i64, now: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at: now + Duration::minutes(ttl_minutes),
        }
    }

    /// Still valid at `expires_at` itself; expired only strictly after it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Expiry wins over a wrong value: a stale secret is reported as expired
    /// whatever was submitted.
    pub fn check(&self, submitted: &str, now: DateTime<Utc>) -> Result<(), Rejection> {
        if self.is_expired(now) {
            return Err(Rejection::Expired);
        }
        if !constant_time_eq(self.value.as_bytes(), submitted.as_bytes()) {
            return Err(Rejection::Mismatch);
        }
        Ok(())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
