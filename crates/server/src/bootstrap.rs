use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use wapprove_core::config::{AppConfig, ConfigError, LoadOptions};
use wapprove_db::{connect_with_settings, migrations, DbPool};
use wapprove_engine::{ApprovalWorkflow, NoopNotifier, Notifier};
use wapprove_whatsapp::twilio::TwilioClient;

use crate::notifier::WhatsAppNotifier;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub workflow: Arc<ApprovalWorkflow>,
    /// Present only when the WhatsApp channel is configured; `None` runs
    /// the noop transport.
    pub twilio: Option<Arc<TwilioClient>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let twilio = config.whatsapp.is_configured().then(|| {
        Arc::new(TwilioClient::new(
            config.whatsapp.account_sid.clone(),
            config.whatsapp.auth_token.clone(),
            config.whatsapp.from_number.clone(),
        ))
    });
    let notifier: Arc<dyn Notifier> = match &twilio {
        Some(client) => Arc::new(WhatsAppNotifier::new(client.clone())),
        None => Arc::new(NoopNotifier),
    };

    let workflow = Arc::new(ApprovalWorkflow::from_pool(db_pool.clone(), notifier));

    Ok(Application { config, db_pool, workflow, twilio })
}
