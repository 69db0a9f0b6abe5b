//! Signer factory registry.
//!
//! Built once at startup and passed by reference into the pipeline. Lookups
//! take a read lock; registration takes a write lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::account::RestAccountSource;
use crate::config::{ChainConfig, SigningConfig};
use crate::error::{DispatchError, DispatchResult};
use crate::signer::{KeyManager, KeySource, LocalSigningAgent, SigningAgent, SimulateSigningAgent};

/// Builds a signing agent from configuration.
pub type SignerFactory =
    Arc<dyn Fn(&SigningConfig, &ChainConfig) -> DispatchResult<Arc<dyn SigningAgent>> + Send + Sync>;

pub const LOCAL_SIGNER: &str = "local";
pub const SIMULATE_SIGNER: &str = "simulate";

#[derive(Default)]
pub struct SignerRegistry {
    factories: RwLock<HashMap<String, SignerFactory>>,
}

impl SignerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `local` and `simulate` backends.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(LOCAL_SIGNER, Arc::new(local_factory));
        registry.register(SIMULATE_SIGNER, Arc::new(simulate_factory));
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register(&self, name: impl Into<String>, factory: SignerFactory) {
        self.factories.write().insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the agent named by `signing.signer_type`.
    pub fn create(
        &self,
        signing: &SigningConfig,
        chain: &ChainConfig,
    ) -> DispatchResult<Arc<dyn SigningAgent>> {
        let factory = self
            .factories
            .read()
            .get(&signing.signer_type)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownSigner(signing.signer_type.clone()))?;
        let agent = factory(signing, chain)?;
        info!(signer = agent.name(), "Created signing agent");
        Ok(agent)
    }
}

fn key_source(signing: &SigningConfig) -> DispatchResult<KeySource> {
    if let Some(path) = &signing.key_file {
        return Ok(KeySource::File { path: path.clone() });
    }
    if let Some(var_name) = &signing.key_env_var {
        return Ok(KeySource::EnvVar {
            var_name: var_name.clone(),
        });
    }
    Err(DispatchError::Signing(
        "local signer needs key_file or key_env_var".to_string(),
    ))
}

fn check_address(address: &str, prefix: &str) -> DispatchResult<()> {
    if address.is_empty() {
        return Err(DispatchError::Account("signing address is not configured".to_string()));
    }
    if !address.starts_with(&format!("{prefix}1")) {
        return Err(DispatchError::Account(format!(
            "signing address {address} does not use chain prefix {prefix}"
        )));
    }
    Ok(())
}

fn local_factory(
    signing: &SigningConfig,
    chain: &ChainConfig,
) -> DispatchResult<Arc<dyn SigningAgent>> {
    check_address(&signing.address, &chain.prefix)?;
    let keys = KeyManager::load(&key_source(signing)?)?;
    let accounts = Arc::new(RestAccountSource::new(&chain.rest_address)?);
    Ok(Arc::new(LocalSigningAgent::new(keys, signing.address.clone(), accounts)))
}

fn simulate_factory(
    _signing: &SigningConfig,
    _chain: &ChainConfig,
) -> DispatchResult<Arc<dyn SigningAgent>> {
    Ok(Arc::new(SimulateSigningAgent::default()))
}
