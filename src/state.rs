use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    balance::rules::BalanceRules,
    config::{AppConfig, StoreKind},
    store::{MemoryStore, MenuStore, PgStore},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MenuStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn MenuStore> = match config.store {
            StoreKind::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let db = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                Arc::new(PgStore::new(db))
            }
            StoreKind::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::default())
            }
        };

        Ok(Self::from_parts(store, Arc::new(config)))
    }

    pub fn from_parts(store: Arc<dyn MenuStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    pub fn rules(&self) -> &BalanceRules {
        &self.config.balance_rules
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::with_store(Arc::new(MemoryStore::default()))
    }

    #[cfg(test)]
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        let config = AppConfig {
            store: StoreKind::Memory,
            ..AppConfig::default()
        };
        Self::from_parts(store, Arc::new(config))
    }
}
