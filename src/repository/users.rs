use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::models::{needs_write_back, NewUser, OnConsume, SecretLookup, User};
use crate::auth::secrets::{PendingSecret, SecretKind};
use crate::errors::CustomError;

pub type StoreResult<'a, T> = BoxFuture<'a, Result<T, CustomError>>;

/// Persistence of user records and of the secrets attached to them.
///
/// `consume_secret` is a check-and-clear: implementations must hold the record
/// exclusively between reading the pending secret and writing the outcome, so
/// two concurrent submissions of the same code cannot both succeed.
pub trait UserStore: Send + Sync {
    fn create_user(&self, new_user: NewUser) -> StoreResult<'_, User>;

    fn find_by_email<'a>(&'a self, email: &'a str) -> StoreResult<'a, Option<User>>;

    fn find_by_id(&self, id: Uuid) -> StoreResult<'_, Option<User>>;

    fn update_password(&self, id: Uuid, password_hash: String) -> StoreResult<'_, ()>;

    /// Stores `secret`, overwriting any unconsumed secret of the same kind.
    fn store_secret(&self, id: Uuid, kind: SecretKind, secret: PendingSecret)
        -> StoreResult<'_, ()>;

    fn consume_secret<'a>(
        &'a self,
        kind: SecretKind,
        lookup: SecretLookup<'a>,
        effect: OnConsume,
        now: DateTime<Utc>,
    ) -> StoreResult<'a, User>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl UserStore for PgUserStore {
    fn create_user(&self, new_user: NewUser) -> StoreResult<'_, User> {
        async move {
            let user = sqlx::query_as::<_, User>(
                "INSERT INTO users (full_name, email, password) VALUES ($1, $2, $3) RETURNING *",
            )
            .bind(new_user.full_name)
            .bind(new_user.email)
            .bind(new_user.password_hash)
            .fetch_one(&self.db)
            .await?;
            Ok(user)
        }
        .boxed()
    }

    fn find_by_email<'a>(&'a self, email: &'a str) -> StoreResult<'a, Option<User>> {
        async move {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.db)
                .await?;
            Ok(user)
        }
        .boxed()
    }

    fn find_by_id(&self, id: Uuid) -> StoreResult<'_, Option<User>> {
        async move {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
            Ok(user)
        }
        .boxed()
    }

    fn update_password(&self, id: Uuid, password_hash: String) -> StoreResult<'_, ()> {
        async move {
            sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
                .bind(password_hash)
                .bind(id)
                .execute(&self.db)
                .await?;
            Ok(())
        }
        .boxed()
    }

    fn store_secret(
        &self,
        id: Uuid,
        kind: SecretKind,
        secret: PendingSecret,
    ) -> StoreResult<'_, ()> {
        async move {
            let (value_col, expires_col) = kind.columns();
            let query = format!(
                "UPDATE users SET {value_col} = $1, {expires_col} = $2, updated_at = NOW() WHERE id = $3"
            );
            let result = sqlx::query(&query)
                .bind(secret.value)
                .bind(secret.expires_at)
                .bind(id)
                .execute(&self.db)
                .await?;
            if result.rows_affected() == 0 {
                log::info!("No user {} to attach a {:?} to", id, kind);
                return Err(CustomError::Unauthorized);
            }
            Ok(())
        }
        .boxed()
    }

    fn consume_secret<'a>(
        &'a self,
        kind: SecretKind,
        lookup: SecretLookup<'a>,
        effect: OnConsume,
        now: DateTime<Utc>,
    ) -> StoreResult<'a, User> {
        async move {
            let mut tx = self.db.begin().await?;

            let (value_col, _) = kind.columns();
            let (row, submitted) = match lookup {
                SecretLookup::Owner { user_id, submitted } => {
                    let row = sqlx::query_as::<_, User>(
                        "SELECT * FROM users WHERE id = $1 FOR UPDATE",
                    )
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                    (row.ok_or(CustomError::Unauthorized)?, submitted)
                }
                SecretLookup::Token(token) => {
                    let query = format!("SELECT * FROM users WHERE {value_col} = $1 FOR UPDATE");
                    let row = sqlx::query_as::<_, User>(&query)
                        .bind(token)
                        .fetch_optional(&mut *tx)
                        .await?;
                    (row.ok_or(CustomError::TokenNotFound)?, token)
                }
            };

            let mut user = row;
            let outcome = user.consume_secret(kind, submitted, effect, now);
            if !needs_write_back(&outcome) {
                tx.rollback().await?;
                return outcome.map(|()| user);
            }

            let user = write_back(&mut tx, &user).await?;
            tx.commit().await?;
            outcome.map(|()| user)
        }
        .boxed()
    }
}

async fn write_back(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user: &User,
) -> Result<User, CustomError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            password = $2,
            verified = $3,
            otp_code = $4,
            otp_expires_at = $5,
            password_reset_token = $6,
            password_reset_token_expires_at = $7,
            verification_token = $8,
            verification_token_expires_at = $9,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&user.password)
    .bind(user.verified)
    .bind(&user.otp_code)
    .bind(user.otp_expires_at)
    .bind(&user.password_reset_token)
    .bind(user.password_reset_token_expires_at)
    .bind(&user.verification_token)
    .bind(user.verification_token_expires_at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(user)
}
