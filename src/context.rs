/// Shared application context
use crate::{
    config::ServerConfig,
    db,
    error::{LinkerError, LinkerResult},
    flow::{FlowCoordinator, FlowStateStore},
    idp::{IdentityProvider, WikidotIdp},
    link::LinkManager,
    pkce::ChallengeMethod,
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub link_db: SqlitePool,
    pub link_manager: Arc<LinkManager>,
    pub flow_coordinator: Arc<FlowCoordinator>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> LinkerResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let link_db = db::create_pool(&config.storage.link_db, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&link_db).await?;

        let link_manager = Arc::new(LinkManager::new(link_db.clone()));

        let idp: Arc<dyn IdentityProvider> = Arc::new(WikidotIdp::new(config.idp.clone())?);
        let method = ChallengeMethod::parse(&config.idp.challenge_method)?;

        let flow_coordinator = Arc::new(FlowCoordinator::new(
            FlowStateStore::new(config.flow.state_ttl_secs),
            LinkManager::new(link_db.clone()),
            idp,
            config.service.public_url.clone(),
            method,
        ));

        Ok(Self {
            config: Arc::new(config),
            link_db,
            link_manager,
            flow_coordinator,
        })
    }

    async fn ensure_directories(config: &ServerConfig) -> LinkerResult<()> {
        tokio::fs::create_dir_all(&config.storage.data_directory)
            .await
            .map_err(|e| {
                LinkerError::Internal(format!(
                    "Failed to create data directory {}: {}",
                    config.storage.data_directory.display(),
                    e
                ))
            })?;

        Ok(())
    }

    pub fn service_url(&self) -> &str {
        &self.config.service.public_url
    }
}
