//! Process-wide collaborator handles.
//!
//! The storage client, the authorization client and the local store are each
//! built at most once, on first use, and then shared by every workflow.
//! Construction is behind factories so tests and embedders can supply their
//! own backends.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use vaultlink_core::EnvelopeCipher;
use vaultlink_perms::DecryptionAuthorizer;
use vaultlink_store::{LocalStore, MemoryLocalStore, SqliteLocalStore, StorageClient};

use crate::config::ClientConfig;
use crate::error::ConfigError;

/// A value initialized once, on first access, even under concurrent callers.
pub struct Lazy<T: ?Sized> {
    cell: OnceCell<Arc<T>>,
}

impl<T: ?Sized> Lazy<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// The value, if already built.
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// Return the value, running `init` if this is the first access.
    ///
    /// Concurrent callers wait for the one running initializer. A failed
    /// initializer leaves the cell empty so a later call retries.
    pub async fn get_or_try_init<F, Fut, E>(&self, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>, E>>,
    {
        self.cell.get_or_try_init(init).await.cloned()
    }
}

impl<T: ?Sized> Default for Lazy<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type StorageFactory =
    Box<dyn Fn(&ClientConfig) -> Result<Arc<dyn StorageClient>, ConfigError> + Send + Sync>;

pub type AuthorizerFactory =
    Box<dyn Fn(&ClientConfig) -> Result<Arc<dyn DecryptionAuthorizer>, ConfigError> + Send + Sync>;

/// Shared collaborators for every workflow in the process.
pub struct Clients {
    config: ClientConfig,
    storage_factory: StorageFactory,
    authorizer_factory: AuthorizerFactory,
    storage: Lazy<dyn StorageClient>,
    authorizer: Lazy<dyn DecryptionAuthorizer>,
    local_store: Lazy<dyn LocalStore>,
    cipher: EnvelopeCipher,
}

impl Clients {
    pub fn new(
        config: ClientConfig,
        storage_factory: StorageFactory,
        authorizer_factory: AuthorizerFactory,
    ) -> Self {
        Self {
            config,
            storage_factory,
            authorizer_factory,
            storage: Lazy::new(),
            authorizer: Lazy::new(),
            local_store: Lazy::new(),
            cipher: EnvelopeCipher::new(),
        }
    }

    /// Wrap already-built collaborators.
    pub fn from_parts(
        config: ClientConfig,
        storage: Arc<dyn StorageClient>,
        authorizer: Arc<dyn DecryptionAuthorizer>,
    ) -> Self {
        Self::new(
            config,
            Box::new(move |_| Ok(storage.clone())),
            Box::new(move |_| Ok(authorizer.clone())),
        )
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The storage client.
    pub async fn storage(&self) -> Result<Arc<dyn StorageClient>, ConfigError> {
        self.storage
            .get_or_try_init(|| async {
                let client = (self.storage_factory)(&self.config)?;
                info!(endpoint = ?self.config.storage_endpoint, "storage client ready");
                Ok(client)
            })
            .await
    }

    /// The authorization client.
    ///
    /// Fails with [`ConfigError::Missing`] when no issuer credentials are
    /// configured.
    pub async fn authorizer(&self) -> Result<Arc<dyn DecryptionAuthorizer>, ConfigError> {
        self.authorizer
            .get_or_try_init(|| async {
                self.config.issuer_credentials()?;
                let client = (self.authorizer_factory)(&self.config)?;
                info!("authorization client ready");
                Ok(client)
            })
            .await
    }

    pub fn cipher(&self) -> EnvelopeCipher {
        self.cipher
    }

    /// The local key-value store: SQLite at `state_path`, else in memory.
    pub async fn local_store(&self) -> Result<Arc<dyn LocalStore>, ConfigError> {
        self.local_store
            .get_or_try_init(|| async {
                let store: Arc<dyn LocalStore> = match &self.config.state_path {
                    Some(path) => {
                        let store = SqliteLocalStore::open(path)
                            .map_err(|e| ConfigError::Client(e.to_string()))?;
                        debug!(path = %path.display(), "opened local state");
                        Arc::new(store)
                    }
                    None => Arc::new(MemoryLocalStore::new()),
                };
                Ok(store)
            })
            .await
    }
}
