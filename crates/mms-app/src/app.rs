//! Pipeline orchestration.
//!
//! One run:
//! 1. Read the on-chain market map and the generated map
//! 2. Consolidate and merge under the configured policy
//! 3. Pin cross-margin perpetuals to chain state (dYdX variant only)
//! 4. Compute ordered upserts, batch them, estimate gas and sign
//! 5. Print the payloads (simulate) or submit them one by one (dispatch)

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use mms_core::{MarketMap, Perpetual};
use mms_dispatch::{
    convert_upserts_to_messages, BroadcastClient, CometRpcClient, DispatchReport, Dispatcher,
    GasEstimator, GeneratedTx, RestGasEstimator, SignerRegistry, SigningAgent, Submitter,
    TxGenerator,
};
use mms_registry::{
    consolidate, get_market_map_upserts, merge_consolidated, override_cross_margin,
    ChainRestClient, MarketMapSource, PerpetualsSource,
};
use mms_telemetry::Metrics;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// External collaborators of a run.
pub struct Components {
    pub market_maps: Arc<dyn MarketMapSource>,
    pub perpetuals: Arc<dyn PerpetualsSource>,
    pub estimator: Arc<dyn GasEstimator>,
    pub signer: Arc<dyn SigningAgent>,
    pub broadcaster: Arc<dyn BroadcastClient>,
}

impl Components {
    /// Network-backed collaborators for `config`.
    pub fn from_config(config: &AppConfig, signers: &SignerRegistry) -> AppResult<Self> {
        let chain = &config.chain;
        let rest = Arc::new(ChainRestClient::new(&chain.rest_address)?);
        Ok(Self {
            market_maps: rest.clone(),
            perpetuals: rest,
            estimator: Arc::new(RestGasEstimator::new(&chain.rest_address)?),
            signer: signers.create(&config.dispatch.signing, chain)?,
            broadcaster: Arc::new(CometRpcClient::new(&chain.rpc_address)?),
        })
    }
}

/// What a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Market keys written, in dependency order.
    pub upserts: Vec<String>,
    /// Disabled on-chain markets the generated map no longer lists.
    pub removals: Vec<String>,
    pub messages: usize,
    pub txs: Vec<GeneratedTx>,
    /// Present when transactions were submitted.
    pub dispatch: Option<DispatchReport>,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    components: Components,
}

impl Application {
    pub fn new(config: AppConfig, components: Components) -> Self {
        Self { config, components }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Read the generated map from `generated_path` and run once.
    pub async fn run(&self, cancel: &CancellationToken) -> AppResult<RunReport> {
        let generated = load_generated(&self.config)?;
        self.run_with(generated, cancel).await
    }

    /// Run once against an already loaded generated map.
    pub async fn run_with(
        &self,
        generated: MarketMap,
        cancel: &CancellationToken,
    ) -> AppResult<RunReport> {
        let actual = cancellable(cancel, self.components.market_maps.market_map()).await??;
        info!(
            actual = actual.len(),
            generated = generated.len(),
            mode = ?self.config.mode,
            "Loaded market maps"
        );

        let options = &self.config.merge;
        let consolidated = consolidate(&actual, generated, options);
        let merged = merge_consolidated(&actual, &consolidated, options);
        for key in &merged.removals {
            warn!(market = %key, "Disabled on-chain market absent from generated map, removal not supported");
        }
        Metrics::record_markets_removed(merged.removals.len());

        let combined = if self.config.chain.is_dydx_variant {
            let perpetuals = self.fetch_perpetuals(cancel).await?;
            override_cross_margin(merged.combined, &actual, &consolidated, perpetuals.as_deref())?
        } else {
            merged.combined
        };

        let upserts = get_market_map_upserts(&actual, &combined, &self.config.upserts.deny_list)?;
        let mut report = RunReport {
            upserts: upserts.iter().map(|m| m.key()).collect(),
            removals: merged.removals,
            ..Default::default()
        };
        if upserts.is_empty() {
            info!("Chain market map already up to date");
            return Ok(report);
        }

        let tx_config = &self.config.dispatch.tx;
        let messages = convert_upserts_to_messages(
            &upserts,
            tx_config.max_bytes_per_tx,
            &self.config.authority,
            self.config.chain.is_dydx_variant,
        )?;
        report.messages = messages.len();
        Metrics::record_messages_built(messages.len());
        info!(
            upserts = upserts.len(),
            messages = messages.len(),
            "Built upsert messages"
        );

        let generator = TxGenerator::new(
            &self.config.chain.chain_id,
            tx_config.clone(),
            self.components.estimator.clone(),
            self.components.signer.clone(),
        );
        report.txs = cancellable(cancel, generator.generate(messages)).await??;
        Metrics::record_txs_signed(report.txs.len());

        if self.config.is_simulate_mode() {
            info!(txs = report.txs.len(), "Simulate mode, not submitting");
            return Ok(report);
        }

        let dispatcher = Dispatcher::new(Submitter::new(
            self.components.broadcaster.clone(),
            &self.config.dispatch.submitter,
        ));
        match dispatcher.dispatch(&report.txs, cancel).await {
            Ok(dispatched) => {
                for tx in &dispatched.included {
                    Metrics::record_tx_included(tx.latency.as_secs_f64() * 1_000.0);
                }
                Metrics::record_markets_upserted(report.upserts.len());
                info!(
                    txs = dispatched.included.len(),
                    hashes = ?dispatched.hashes(),
                    "All transactions included"
                );
                report.dispatch = Some(dispatched);
                Ok(report)
            }
            Err(e) => {
                let included = e.included();
                for tx in included {
                    Metrics::record_tx_included(tx.latency.as_secs_f64() * 1_000.0);
                }
                let written: usize = report.txs[..included.len()]
                    .iter()
                    .map(|tx| tx.markets.len())
                    .sum();
                Metrics::record_markets_upserted(written);
                Metrics::record_tx_failed(e.outcome());
                error!(
                    error = %e,
                    included = included.len(),
                    markets_written = written,
                    hashes = ?included.iter().map(|tx| tx.hash.as_str()).collect::<Vec<_>>(),
                    "Dispatch failed"
                );
                Err(e.into())
            }
        }
    }

    /// Fetch perpetuals, mapping a failed read to `None` so the override refuses to run.
    async fn fetch_perpetuals(
        &self,
        cancel: &CancellationToken,
    ) -> AppResult<Option<Vec<Perpetual>>> {
        match cancellable(cancel, self.components.perpetuals.all_perpetuals()).await? {
            Ok(perpetuals) => Ok(Some(perpetuals)),
            Err(e) => {
                warn!(error = %e, "Failed to fetch perpetuals");
                Ok(None)
            }
        }
    }
}

/// Read the generated market map JSON.
pub fn load_generated(config: &AppConfig) -> AppResult<MarketMap> {
    let path = &config.generated_path;
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::GeneratedMap(format!("Failed to read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        AppError::GeneratedMap(format!("Failed to parse {}: {e}", path.display()))
    })
}

async fn cancellable<T>(cancel: &CancellationToken, fut: impl Future<Output = T>) -> AppResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Shutdown),
        out = fut => Ok(out),
    }
}
