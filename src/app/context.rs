use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{BonusError, Result};
use crate::cache::FeedCache;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::resolver::Resolver;
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub resolver: Resolver<SqliteStore>,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path.or_else(|| config.storage.path.clone()) {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new()?);
        let cache = FeedCache::with_ttl(store.clone(), config.cache_ttl());
        let resolver = Resolver::new(
            cache,
            fetcher.clone(),
            config.sources(),
            config.retry_policy(),
        );

        Ok(Self {
            config,
            store,
            fetcher,
            resolver,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| BonusError::Config("Could not find data directory".into()))?;
        let app_dir = data_dir.join("bonusvarsler");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("bonusvarsler.db"))
    }
}
