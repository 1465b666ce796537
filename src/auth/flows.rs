//! Account flows: registration, login, email verification (code or link) and
//! password reset. Handlers pass `now` so expiry stays testable.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::password::{hash_password, validate_new_password, verify_password};
use super::secrets::{generate_otp, generate_token, PendingSecret, SecretKind, OTP_LENGTH};
use crate::errors::CustomError;
use crate::jobs::{MailJob, MailKind};
use crate::repository::models::{NewUser, OnConsume, SecretLookup, User};
use crate::AppState;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_registration(full_name: &str, email: &str) -> Result<(), CustomError> {
    if full_name.trim().is_empty() {
        return Err(CustomError::bad_request("Full name is required"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(CustomError::bad_request("Email address is not valid")),
    }
}

pub async fn register(
    state: &AppState,
    full_name: &str,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<User, CustomError> {
    let email = normalize_email(email);
    validate_registration(full_name, &email)?;
    validate_new_password(password)?;

    if state.store.find_by_email(&email).await?.is_some() {
        return Err(CustomError::bad_request("Email already exists"));
    }

    let user = state
        .store
        .create_user(NewUser {
            full_name: full_name.trim().to_string(),
            email,
            password_hash: hash_password(password)?,
        })
        .await?;
    log::info!("Registered user {}", user.id);

    // the account already exists; `/resend-verification` recovers a lost link
    if let Err(e) = issue_verification_link(state, &user, now).await {
        log::warn!("Verification link for {} not queued: {}", user.id, e);
    }
    Ok(user)
}

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<User, CustomError> {
    let email = normalize_email(email);
    let user = match state.store.find_by_email(&email).await? {
        Some(user) => user,
        None => {
            log::info!("User not found");
            return Err(CustomError::InvalidCredentials);
        }
    };
    if !verify_password(password, &user.password) {
        return Err(CustomError::InvalidCredentials);
    }
    Ok(user)
}

/// Best effort: a failed confirmation email never fails the login itself.
pub async fn notify_login(state: &AppState, user: &User, now: DateTime<Utc>) {
    let job = MailJob {
        to: user.email.clone(),
        full_name: user.full_name.clone(),
        kind: MailKind::LoginConfirmation {
            login_time: now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        },
    };
    if let Err(e) = state.notifier.dispatch(job).await {
        log::warn!("Login confirmation for {} not queued: {}", user.id, e);
    }
}

pub async fn update_password(
    state: &AppState,
    user: &User,
    current_password: &str,
    new_password: &str,
) -> Result<(), CustomError> {
    if !verify_password(current_password, &user.password) {
        return Err(CustomError::InvalidCredentials);
    }
    validate_new_password(new_password)?;
    state
        .store
        .update_password(user.id, hash_password(new_password)?)
        .await
}

/// Issues a fresh OTP for `user`, replacing any unconsumed one, and mails it.
pub async fn issue_otp(state: &AppState, user: &User, now: DateTime<Utc>) -> Result<(), CustomError> {
    if user.verified {
        return Err(CustomError::bad_request("Email already verified"));
    }
    let ttl_minutes = state.env.otp_ttl_minutes;
    let secret = PendingSecret::issue(generate_otp(), ttl_minutes, now);
    let code = secret.value.clone();
    state.store.store_secret(user.id, SecretKind::Otp, secret).await?;

    state
        .notifier
        .dispatch(MailJob {
            to: user.email.clone(),
            full_name: user.full_name.clone(),
            kind: MailKind::Otp { code, ttl_minutes },
        })
        .await
}

pub async fn verify_otp(
    state: &AppState,
    user_id: Uuid,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<User, CustomError> {
    let submitted = submitted.trim();
    if submitted.len() != OTP_LENGTH || !submitted.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CustomError::InvalidCode);
    }
    let user = state
        .store
        .consume_secret(
            SecretKind::Otp,
            SecretLookup::Owner { user_id, submitted },
            OnConsume::MarkVerified,
            now,
        )
        .await?;
    log::info!("User {} verified their email with a code", user.id);
    Ok(user)
}

pub async fn issue_verification_link(
    state: &AppState,
    user: &User,
    now: DateTime<Utc>,
) -> Result<(), CustomError> {
    if user.verified {
        return Err(CustomError::bad_request("Email already verified"));
    }
    let ttl_minutes = state.env.verification_token_ttl_minutes;
    let secret = PendingSecret::issue(generate_token(), ttl_minutes, now);
    let link = format!("{}/verify-email/{}", state.env.client_origin, secret.value);
    state
        .store
        .store_secret(user.id, SecretKind::Verification, secret)
        .await?;

    state
        .notifier
        .dispatch(MailJob {
            to: user.email.clone(),
            full_name: user.full_name.clone(),
            kind: MailKind::VerifyAccount { link, ttl_minutes },
        })
        .await
}

pub async fn verify_email(
    state: &AppState,
    token: &str,
    now: DateTime<Utc>,
) -> Result<User, CustomError> {
    let user = state
        .store
        .consume_secret(
            SecretKind::Verification,
            SecretLookup::Token(token),
            OnConsume::MarkVerified,
            now,
        )
        .await?;
    log::info!("User {} verified their email with a link", user.id);
    Ok(user)
}

/// Unknown addresses are accepted silently so callers cannot tell which accounts exist.
pub async fn request_password_reset(
    state: &AppState,
    email: &str,
    now: DateTime<Utc>,
) -> Result<(), CustomError> {
    let email = normalize_email(email);
    let Some(user) = state.store.find_by_email(&email).await? else {
        log::info!("Password reset requested for an unknown email");
        return Ok(());
    };

    let ttl_minutes = state.env.reset_token_ttl_minutes;
    let secret = PendingSecret::issue(generate_token(), ttl_minutes, now);
    let link = format!("{}/reset-password/{}", state.env.client_origin, secret.value);
    state
        .store
        .store_secret(user.id, SecretKind::PasswordReset, secret)
        .await?;

    // answered the same way as an unknown address
    let job = MailJob {
        to: user.email,
        full_name: user.full_name,
        kind: MailKind::PasswordReset { link, ttl_minutes },
    };
    if let Err(e) = state.notifier.dispatch(job).await {
        log::error!("Password reset email for {} not queued: {}", user.id, e);
    }
    Ok(())
}

pub async fn reset_password(
    state: &AppState,
    token: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> Result<User, CustomError> {
    validate_new_password(new_password)?;
    let password_hash = hash_password(new_password)?;
    let user = state
        .store
        .consume_secret(
            SecretKind::PasswordReset,
            SecretLookup::Token(token),
            OnConsume::SetPassword(password_hash),
            now,
        )
        .await?;
    log::info!("User {} reset their password", user.id);
    Ok(user)
}
