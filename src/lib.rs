use std::sync::Arc;

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod jobs;
pub mod jwt_auth_middleware;
pub mod repository;
pub mod routes;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

use config::Config;
use jobs::Notifier;
use repository::sessions::{RedisSessionStore, SessionStore};
use repository::users::{PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub notifier: Arc<dyn Notifier>,
    pub env: Config,
}

impl AppState {
    pub fn new(
        env: Config,
        store: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            sessions,
            notifier,
            env,
        }
    }

    /// Connects to postgres and redis, running migrations when enabled.
    pub async fn connect(env_config: &Config, notifier: Arc<dyn Notifier>) -> anyhow::Result<Self> {
        let db = db::get_db_conn(env_config).await?;
        let redis_client = db::get_redis_conn(env_config)?;

        Ok(Self::new(
            env_config.clone(),
            Arc::new(PgUserStore::new(db)),
            Arc::new(RedisSessionStore::new(redis_client)),
            notifier,
        ))
    }
}
