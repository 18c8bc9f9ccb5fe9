use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::chatbot::ChatClient;
use crate::services::fallback_store::FallbackUserStore;
use crate::services::mailer::{mailer_from_config, Mailer};

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseManager,
    pub mailer: Arc<dyn Mailer>,
    pub chat: Arc<ChatClient>,
    pub fallback_users: Arc<FallbackUserStore>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let db = DatabaseManager::connect_lazy(&config.database)?;
        let mailer = mailer_from_config(&config.mail)?;
        Ok(Self {
            db,
            mailer,
            chat: Arc::new(ChatClient::new(config.chatbot.clone())),
            fallback_users: Arc::new(FallbackUserStore::new(&config.storage.fallback_users_file)),
        })
    }

    /// Same as `from_config` but with an explicit mail transport
    pub fn with_mailer(config: &AppConfig, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let mut state = Self::from_config(config)?;
        state.mailer = mailer;
        Ok(state)
    }

    pub fn pool(&self) -> &PgPool {
        self.db.pool()
    }
}
