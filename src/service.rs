//! Wires configuration into the cache, bridge supervisor, client and
//! orchestrator that a UI holds for its lifetime.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::bridge::BackendSupervisor;
use crate::cache::TranslationCache;
use crate::client::{TranslationClient, Translator};
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::Orchestrator;

pub struct TranslationService {
    config: Config,
    supervisor: Arc<BackendSupervisor>,
    orchestrator: Orchestrator,
    runtime: Handle,
}

impl TranslationService {
    /// Build every component from `config`. Requests run on `runtime`.
    pub fn from_config(config: Config, runtime: Handle) -> Result<Self> {
        let supervisor = Arc::new(BackendSupervisor::from_config(&config.bridge)?);
        let client = TranslationClient::from_config(&config)?.with_readiness(supervisor.probe());
        let cache = Arc::new(TranslationCache::new(config.cache.capacity));

        Ok(Self::with_parts(config, supervisor, Arc::new(client), cache, runtime))
    }

    pub fn with_parts(
        config: Config,
        supervisor: Arc<BackendSupervisor>,
        translator: Arc<dyn Translator>,
        cache: Arc<TranslationCache>,
        runtime: Handle,
    ) -> Self {
        let orchestrator = Orchestrator::new(cache, translator, runtime.clone(), &config.translation);
        Self {
            config,
            supervisor,
            orchestrator,
            runtime,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn supervisor(&self) -> &Arc<BackendSupervisor> {
        &self.supervisor
    }

    /// Start the bridge in the background when translation is enabled and
    /// auto-start is configured. Failures only leave translation in
    /// passthrough mode.
    pub fn start_backend(&self) {
        if !self.orchestrator.is_enabled() {
            debug!("Translation disabled, not starting bridge");
            return;
        }
        if !self.config.bridge.auto_start {
            debug!("Bridge auto-start disabled");
            return;
        }

        let supervisor = Arc::clone(&self.supervisor);
        self.runtime.spawn(async move {
            if let Err(e) = supervisor.start().await {
                warn!("Bridge unavailable, UI stays in the source language: {}", e);
            }
        });
    }

    /// Stop a bridge this service spawned.
    pub async fn shutdown(&self) -> Result<()> {
        let stats = self.orchestrator.stats();
        info!(
            hits = stats.hits,
            misses = stats.misses,
            timed_out = stats.timed_out,
            healed = stats.healed,
            cached = self.orchestrator.cache().size(),
            "Shutting down translation service"
        );
        self.supervisor.stop().await
    }
}
