//! Application wiring for authgate.
//!
//! `App` builds the one session manager of a client and hands it to the
//! pipeline stages, the auth actions, and the role guard. The host supplies
//! the durable store and the navigator.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::{ApiClient, Pipeline, ReqwestTransport, Transport};
use crate::auth::{AuthActions, RoleGuard, SessionManager};
use crate::cache::QueryCache;
use crate::config::{Config, StoreKind};
use crate::nav::Navigator;
use crate::store::{DurableStore, FileStore, KeyringStore, MemoryStore};

pub struct App {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
    pub cache: Arc<QueryCache>,
    pub actions: AuthActions,
    pub guard: RoleGuard,
    pub navigator: Arc<dyn Navigator>,
}

impl App {
    /// Wire everything against the configured backend.
    pub fn new(config: Config, store: Arc<dyn DurableStore>, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.api_url, config.timeout())
            .context("Failed to create HTTP transport")?;
        info!(api_url = %config.api_url, store = ?config.store, "Client starting");
        Ok(Self::with_transport(config, store, navigator, Arc::new(transport)))
    }

    pub fn with_transport(
        config: Config,
        store: Arc<dyn DurableStore>,
        navigator: Arc<dyn Navigator>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let session = Arc::new(SessionManager::rehydrate(store));
        let pipeline = Pipeline::standard(
            session.clone(),
            navigator.clone(),
            vec![
                config.endpoints.login.clone(),
                config.endpoints.register.clone(),
            ],
            config.debug,
        );
        let api = ApiClient::from_config(&config, transport, pipeline);
        let cache = Arc::new(QueryCache::default());
        let actions = AuthActions::new(api.clone(), session.clone(), cache.clone(), navigator.clone());
        let guard = RoleGuard::new(session.clone());

        Self {
            config,
            session,
            api,
            cache,
            actions,
            guard,
            navigator,
        }
    }
}

/// Open the durable store selected by `config`. A passphrase seals the
/// file store; other backends ignore it.
pub fn open_store(config: &Config, passphrase: Option<&str>) -> Result<Arc<dyn DurableStore>> {
    let store: Arc<dyn DurableStore> = match config.store {
        StoreKind::File => {
            let dir = config.data_dir()?;
            let store = match passphrase.filter(|p| !p.is_empty()) {
                Some(passphrase) => FileStore::open_sealed(dir, passphrase),
                None => FileStore::open(dir),
            }
            .context("Failed to open session store")?;
            debug!(dir = %store.dir().display(), "Using file store");
            Arc::new(store)
        }
        StoreKind::Keyring => Arc::new(KeyringStore::default()),
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
