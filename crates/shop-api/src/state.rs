//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the service catalog, the open browsing sessions and configuration.

use shop_checkout::{BoxedOutcomeSource, CheckoutSimulator, SimulatorConfig};
use shop_core::{AuthSession, ServiceCatalog, ShopError, ShopResult, ShopSession};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Idle time after which an abandoned session is evicted
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Path of the service catalog
    pub catalog_path: Option<String>,
    /// Idle time before a browsing session is evicted
    pub session_idle_timeout: Duration,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            catalog_path: std::env::var("CATALOG_PATH").ok(),
            session_idle_timeout: std::env::var("SESSION_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SESSION_IDLE_TIMEOUT),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// A browsing session and its checkout
pub struct SessionEntry {
    pub session: ShopSession,
    pub checkout: CheckoutSimulator,
    last_seen: Mutex<Instant>,
}

impl SessionEntry {
    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|p| p.into_inner()) = Instant::now();
    }

    fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        let last_seen = *self.last_seen.lock().unwrap_or_else(|p| p.into_inner());
        now.duration_since(last_seen) >= timeout
    }
}

/// Open browsing sessions, keyed by session id.
///
/// Sessions not used for `idle_timeout` are evicted and their checkout
/// timers cancelled.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionEntry>>>>,
    simulator_config: SimulatorConfig,
    outcome: Option<BoxedOutcomeSource>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(simulator_config: SimulatorConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            simulator_config,
            outcome: None,
            idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }

    /// Builder: use a fixed outcome source for every checkout
    pub fn with_outcome(mut self, outcome: BoxedOutcomeSource) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Builder: set the idle eviction timeout
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Open a fresh session with an empty cart
    pub async fn open(&self, auth: Option<AuthSession>) -> (Uuid, Arc<SessionEntry>) {
        self.evict_idle().await;

        let session = match auth {
            Some(auth) => ShopSession::new().with_auth(auth),
            None => ShopSession::new(),
        };

        let mut builder =
            CheckoutSimulator::builder(session.clone()).config(self.simulator_config.clone());
        if let Some(outcome) = &self.outcome {
            builder = builder.outcome(Arc::clone(outcome));
        }

        let entry = Arc::new(SessionEntry {
            session,
            checkout: builder.build(),
            last_seen: Mutex::new(Instant::now()),
        });
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(id, Arc::clone(&entry));
        info!(session = %id, "Session opened");
        (id, entry)
    }

    /// Look up a session and mark it as used
    pub async fn get(&self, id: Uuid) -> ShopResult<Arc<SessionEntry>> {
        let not_found = || ShopError::SessionNotFound {
            session_id: id.to_string(),
        };

        let entry = self.sessions.read().await.get(&id).cloned().ok_or_else(not_found)?;
        if entry.is_idle(Instant::now(), self.idle_timeout) {
            self.evict_idle().await;
            return Err(not_found());
        }
        entry.touch();
        Ok(entry)
    }

    /// End a session, cancelling any checkout timers it still has running
    pub async fn end(&self, id: Uuid) -> ShopResult<()> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| ShopError::SessionNotFound {
                session_id: id.to_string(),
            })?;
        entry.checkout.shutdown();
        info!(session = %id, "Session ended");
        Ok(())
    }

    /// Drop every session idle for at least the timeout; returns how many
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            if entry.is_idle(now, self.idle_timeout) {
                entry.checkout.shutdown();
                debug!(session = %id, "Idle session evicted");
                false
            } else {
                true
            }
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    /// Sweep idle sessions every `period` on the current runtime
    pub fn spawn_evictor(&self, period: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.evict_idle().await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Service catalog
    pub catalog: Arc<ServiceCatalog>,
    /// Open browsing sessions
    pub sessions: SessionRegistry,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState from the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let catalog = load_service_catalog(config.catalog_path.as_deref())?;
        let simulator_config = SimulatorConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load checkout config: {}", e))?;

        let sessions =
            SessionRegistry::new(simulator_config).with_idle_timeout(config.session_idle_timeout);

        Ok(Self::from_parts(config, catalog, sessions))
    }

    pub fn from_parts(config: AppConfig, catalog: ServiceCatalog, sessions: SessionRegistry) -> Self {
        Self {
            catalog: Arc::new(catalog),
            sessions,
            config,
        }
    }
}

/// Load service catalog from config file
fn load_service_catalog(explicit: Option<&str>) -> anyhow::Result<ServiceCatalog> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
        return parse_catalog(path, &content);
    }

    let config_paths = [
        "config/services.toml",
        "../config/services.toml",
        "../../config/services.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            return parse_catalog(path, &content);
        }
    }

    // Return empty catalog if no config found
    tracing::warn!("No service catalog found, using empty catalog");
    Ok(ServiceCatalog::new())
}

fn parse_catalog(path: &str, content: &str) -> anyhow::Result<ServiceCatalog> {
    let catalog = ServiceCatalog::from_toml(content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
    tracing::info!("Loaded {} services from {}", catalog.len(), path);
    Ok(catalog)
}
