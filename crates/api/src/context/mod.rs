//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Instant;

use authbroker_core::{
    AuthEventPublisher, AuthOrchestrator, IdentityProvider, OrchestratorSettings, SessionStore,
};
use authbroker_domain::{BrokerConfig, BrokerError, Result, StoreBackend};
use authbroker_infra::{
    spawn_session_janitor, InMemorySessionStore, LogEventPublisher, OAuthIdentityProvider,
    SqliteSessionStore,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::utils::cookies::SessionCookie;
use crate::utils::health::{ComponentHealth, HealthStatus};

/// Shared state behind every handler
pub struct AppContext {
    pub config: BrokerConfig,
    pub orchestrator: Arc<AuthOrchestrator>,
    pub session_store: Arc<dyn SessionStore>,
    pub cookie: SessionCookie,
    identity_provider: String,
    janitor: Option<JoinHandle<()>>,
}

impl AppContext {
    /// Wire the production adapters selected by `config`
    ///
    /// Must be called inside a Tokio runtime: the expired-session janitor
    /// starts here.
    ///
    /// # Errors
    /// Returns `Config` for an invalid configuration or unusable verification
    /// key, and `StoreUnavailable` if the SQLite store cannot be opened.
    pub fn from_config(config: BrokerConfig) -> Result<Self> {
        config.validate()?;

        let session_store: Arc<dyn SessionStore> = match config.store.backend {
            StoreBackend::Memory => {
                warn!("Using in-memory session store; sessions are not shared between instances");
                Arc::new(InMemorySessionStore::new())
            }
            StoreBackend::Sqlite => {
                let path = config.store.sqlite_path.as_deref().ok_or_else(|| {
                    BrokerError::Config("store.sqlite_path is required for sqlite".into())
                })?;
                Arc::new(SqliteSessionStore::open(path, config.store.pool_size)?)
            }
        };

        let identity: Arc<dyn IdentityProvider> =
            Arc::new(OAuthIdentityProvider::new(config.identity_provider.clone())?);
        let events: Arc<dyn AuthEventPublisher> = Arc::new(LogEventPublisher::new());

        let mut context = Self::from_parts(config, session_store, identity, events);
        context.janitor = Some(spawn_session_janitor(
            Arc::clone(&context.session_store),
            context.config.session.cleanup_interval(),
        ));

        info!(
            store = %context.config.store.backend,
            provider = %context.identity_provider,
            session_ttl_secs = context.config.session.ttl_secs,
            "Application context initialized"
        );
        Ok(context)
    }

    /// Assemble a context from already-built adapters
    ///
    /// No background tasks are started.
    pub fn from_parts(
        config: BrokerConfig,
        session_store: Arc<dyn SessionStore>,
        identity: Arc<dyn IdentityProvider>,
        events: Arc<dyn AuthEventPublisher>,
    ) -> Self {
        let settings = OrchestratorSettings {
            session_ttl: config.session.ttl(),
            exchange_timeout: config.identity_provider.exchange_timeout(),
        };
        let identity_provider = identity.name().to_string();
        let orchestrator = Arc::new(AuthOrchestrator::new(
            Arc::clone(&session_store),
            identity,
            events,
            settings,
        ));
        let cookie = SessionCookie::new(&config.cookie);

        Self { config, orchestrator, session_store, cookie, identity_provider, janitor: None }
    }

    pub async fn health_check(&self) -> HealthStatus {
        HealthStatus::new()
            .add_component(self.check_store_health().await)
            .add_component(ComponentHealth::healthy(format!(
                "identity_provider:{}",
                self.identity_provider
            )))
            .finish()
    }

    async fn check_store_health(&self) -> ComponentHealth {
        let started = Instant::now();
        match self.session_store.ping().await {
            Ok(()) => ComponentHealth::healthy("session_store").with_latency(started.elapsed()),
            Err(e) => {
                warn!(error = %e, "session store health check failed");
                ComponentHealth::unhealthy("session_store", e.public_message())
                    .with_latency(started.elapsed())
            }
        }
    }

    /// Stop background work
    pub fn shutdown(&self) {
        info!("shutdown called on AppContext");
        if let Some(janitor) = &self.janitor {
            janitor.abort();
            info!(component = "SessionJanitor", "background task stopped");
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        if let Some(janitor) = self.janitor.take() {
            janitor.abort();
        }
    }
}
