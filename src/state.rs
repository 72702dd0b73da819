use crate::config::AppConfig;
use crate::db;
use crate::nutrition::repo::{NutritionRepo, PgNutritionRepo};
use crate::progress::repo::{PgProgressRepo, ProgressRepo};
use crate::storage::{S3PhotoStore, StorageClient};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub nutrition: Arc<dyn NutritionRepo>,
    pub progress: Arc<dyn ProgressRepo>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::connect_and_migrate(&config.database_url).await?;

        let storage =
            Arc::new(S3PhotoStore::connect(&config.storage).await?) as Arc<dyn StorageClient>;

        Ok(Self {
            nutrition: Arc::new(PgNutritionRepo::new(pool.clone())),
            progress: Arc::new(PgProgressRepo::new(pool)),
            config,
            storage,
        })
    }
}
