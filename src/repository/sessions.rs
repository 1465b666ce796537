use futures::future::{BoxFuture, FutureExt};
use redis::{AsyncCommands, Client as RedisClient};
use uuid::Uuid;

use crate::errors::CustomError;

/// Whitelist of issued jwt ids. A token whose id is missing here is refused
/// even if its signature and expiry are valid.
pub trait SessionStore: Send + Sync {
    fn save(&self, token_uuid: Uuid, user_id: Uuid, max_age_minutes: i64)
        -> BoxFuture<'_, Result<(), CustomError>>;

    fn user_for(&self, token_uuid: Uuid) -> BoxFuture<'_, Result<Option<Uuid>, CustomError>>;

    fn revoke<'a>(&'a self, token_uuids: &'a [Uuid]) -> BoxFuture<'a, Result<(), CustomError>>;
}

#[derive(Clone)]
pub struct RedisSessionStore {
    redis_client: RedisClient,
}

impl RedisSessionStore {
    pub fn new(redis_client: RedisClient) -> Self {
        Self { redis_client }
    }

    async fn connection(&self) -> Result<redis::aio::Connection, CustomError> {
        match self.redis_client.get_async_connection().await {
            Ok(conn) => Ok(conn),
            Err(e) => {
                log::error!("Error while getting redis connection: {:?}", e);
                Err(CustomError::InternalError)
            }
        }
    }
}

impl SessionStore for RedisSessionStore {
    fn save(
        &self,
        token_uuid: Uuid,
        user_id: Uuid,
        max_age_minutes: i64,
    ) -> BoxFuture<'_, Result<(), CustomError>> {
        async move {
            let mut conn = self.connection().await?;
            let seconds = usize::try_from(max_age_minutes * 60).unwrap_or(0);
            conn.set_ex::<_, _, ()>(token_uuid.to_string(), user_id.to_string(), seconds)
                .await?;
            Ok(())
        }
        .boxed()
    }

    fn user_for(&self, token_uuid: Uuid) -> BoxFuture<'_, Result<Option<Uuid>, CustomError>> {
        async move {
            let mut conn = self.connection().await?;
            let value: Option<String> = conn.get(token_uuid.to_string()).await?;
            let user_id = match value {
                Some(value) => match Uuid::parse_str(&value) {
                    Ok(user_id) => Some(user_id),
                    Err(_) => {
                        log::error!("Error while parsing user id from Redis");
                        None
                    }
                },
                None => None,
            };
            Ok(user_id)
        }
        .boxed()
    }

    fn revoke<'a>(&'a self, token_uuids: &'a [Uuid]) -> BoxFuture<'a, Result<(), CustomError>> {
        async move {
            let keys: Vec<String> = token_uuids.iter().map(Uuid::to_string).collect();
            if keys.is_empty() {
                return Ok(());
            }
            let mut conn = self.connection().await?;
            conn.del::<_, usize>(keys).await?;
            Ok(())
        }
        .boxed()
    }
}
