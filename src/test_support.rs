//! In-memory doubles for the store, the session whitelist and the mail queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use uuid::Uuid;

use crate::auth::secrets::{PendingSecret, SecretKind};
use crate::config::Config;
use crate::errors::CustomError;
use crate::jobs::{MailJob, MailKind, Notifier};
use crate::repository::models::{NewUser, OnConsume, SecretLookup, User};
use crate::repository::sessions::SessionStore;
use crate::repository::users::{StoreResult, UserStore};
use crate::AppState;

pub fn test_private_key() -> String {
    general_purpose::STANDARD.encode(include_str!("../fixtures/jwt_private_key.pem"))
}

pub fn test_public_key() -> String {
    general_purpose::STANDARD.encode(include_str!("../fixtures/jwt_public_key.pem"))
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: "8000".to_string(),
        postgres_host: "localhost".to_string(),
        postgres_port: 5432,
        postgres_password: "postgres".to_string(),
        postgres_user: "postgres".to_string(),
        postgres_db: "auth".to_string(),
        enable_auto_migrate: false,
        redis_url: "redis://127.0.0.1:6379".to_string(),
        client_origin: "http://localhost:3000".to_string(),
        access_token_private_key: test_private_key(),
        access_token_public_key: test_public_key(),
        access_token_max_age: 15,
        refresh_token_private_key: test_private_key(),
        refresh_token_public_key: test_public_key(),
        refresh_token_max_age: 60,
        otp_ttl_minutes: 15,
        reset_token_ttl_minutes: 15,
        verification_token_ttl_minutes: 15,
        smtp_host: "localhost".to_string(),
        smtp_port: 1025,
        smtp_user: "mailer@example.com".to_string(),
        smtp_pass: "secret".to_string(),
        smtp_from: "mailer@example.com".to_string(),
        email_from_name: "AnimateHub".to_string(),
        support_email: "support@example.com".to_string(),
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn seed_secret(&self, user_id: Uuid, kind: SecretKind, secret: PendingSecret) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(&user_id) {
            user.set_secret(kind, secret);
        }
    }

    pub fn get(&self, user_id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&user_id).cloned()
    }
}

impl UserStore for MemoryUserStore {
    fn create_user(&self, new_user: NewUser) -> StoreResult<'_, User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == new_user.email) {
            return async { Err(CustomError::bad_request("Email already exists")) }.boxed();
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            full_name: new_user.full_name,
            email: new_user.email,
            password: new_user.password_hash,
            verified: false,
            otp_code: None,
            otp_expires_at: None,
            password_reset_token: None,
            password_reset_token_expires_at: None,
            verification_token: None,
            verification_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        async move { Ok(user) }.boxed()
    }

    fn find_by_email<'a>(&'a self, email: &'a str) -> StoreResult<'a, Option<User>> {
        let user = self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned();
        async move { Ok(user) }.boxed()
    }

    fn find_by_id(&self, id: Uuid) -> StoreResult<'_, Option<User>> {
        let user = self.get(id);
        async move { Ok(user) }.boxed()
    }

    fn update_password(&self, id: Uuid, password_hash: String) -> StoreResult<'_, ()> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(&id) {
            user.password = password_hash;
        }
        async move { Ok(()) }.boxed()
    }

    fn store_secret(
        &self,
        id: Uuid,
        kind: SecretKind,
        secret: PendingSecret,
    ) -> StoreResult<'_, ()> {
        let result = match self.users.lock().unwrap().get_mut(&id) {
            Some(user) => {
                user.set_secret(kind, secret);
                Ok(())
            }
            None => Err(CustomError::Unauthorized),
        };
        async move { result }.boxed()
    }

    fn consume_secret<'a>(
        &'a self,
        kind: SecretKind,
        lookup: SecretLookup<'a>,
        effect: OnConsume,
        now: DateTime<Utc>,
    ) -> StoreResult<'a, User> {
        let result = {
            let mut users = self.users.lock().unwrap();
            let found = match lookup {
                SecretLookup::Owner { user_id, submitted } => users
                    .get_mut(&user_id)
                    .map(|u| (u, submitted))
                    .ok_or(CustomError::Unauthorized),
                SecretLookup::Token(token) => users
                    .values_mut()
                    .find(|u| u.pending(kind).map(|p| p.value == token).unwrap_or(false))
                    .map(|u| (u, token))
                    .ok_or(CustomError::TokenNotFound),
            };
            found.and_then(|(user, submitted)| {
                user.consume_secret(kind, submitted, effect, now)
                    .map(|()| user.clone())
            })
        };
        async move { result }.boxed()
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Uuid>>,
}

impl SessionStore for MemorySessionStore {
    fn save(
        &self,
        token_uuid: Uuid,
        user_id: Uuid,
        _max_age_minutes: i64,
    ) -> BoxFuture<'_, Result<(), CustomError>> {
        self.sessions.lock().unwrap().insert(token_uuid, user_id);
        async { Ok(()) }.boxed()
    }

    fn user_for(&self, token_uuid: Uuid) -> BoxFuture<'_, Result<Option<Uuid>, CustomError>> {
        let user_id = self.sessions.lock().unwrap().get(&token_uuid).copied();
        async move { Ok(user_id) }.boxed()
    }

    fn revoke<'a>(&'a self, token_uuids: &'a [Uuid]) -> BoxFuture<'a, Result<(), CustomError>> {
        let mut sessions = self.sessions.lock().unwrap();
        for token_uuid in token_uuids {
            sessions.remove(token_uuid);
        }
        async { Ok(()) }.boxed()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<MailJob>>,
    fail_next: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<MailJob> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_code(&self) -> Option<String> {
        self.sent().into_iter().rev().find_map(|job| match job.kind {
            MailKind::Otp { code, .. } => Some(code),
            _ => None,
        })
    }

    pub fn last_link(&self) -> Option<String> {
        self.sent().into_iter().rev().find_map(|job| match job.kind {
            MailKind::VerifyAccount { link, .. } | MailKind::PasswordReset { link, .. } => {
                Some(link)
            }
            _ => None,
        })
    }

    pub fn last_link_token(&self) -> Option<String> {
        self.last_link()
            .and_then(|link| link.rsplit('/').next().map(str::to_owned))
    }
}

impl Notifier for RecordingNotifier {
    fn dispatch(&self, job: MailJob) -> BoxFuture<'_, Result<(), CustomError>> {
        let result = if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(CustomError::MailDeliveryFailure)
        } else {
            self.sent.lock().unwrap().push(job);
            Ok(())
        };
        async move { result }.boxed()
    }
}

pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryUserStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryUserStore::default());
        let sessions = Arc::new(MemorySessionStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(
            test_config(),
            store.clone(),
            sessions.clone(),
            notifier.clone(),
        );
        Self {
            state,
            store,
            sessions,
            notifier,
        }
    }
}
