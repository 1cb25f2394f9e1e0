//! Concurrent provider lookup for one module.
//!
//! [`LookupOrchestrator`] fans a lookup out to every eligible provider of a
//! module at once, bounds each provider and the whole call by a deadline,
//! and merges whatever answers arrived in the module's priority order.
//! Provider failures never fail the lookup; they are logged and skipped.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use collectforge_common::{Error, Identifier, ModuleId, ProviderErrorKind, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::merge::{merge_assets, merge_attributes, normalize_fields, select_best};
use super::provider::{LookupProvider, ProviderAsset, ProviderResult};
use super::registry::ProviderRegistry;
use crate::config::LookupConfig;
use crate::modules::{ModuleDefinition, ModuleRegistry};

/// The merged outcome of one lookup.
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub module_key: String,
    /// Successful results in the module's provider priority order.
    pub results: Vec<ProviderResult>,
    /// Highest-confidence result; ties go to the higher-priority provider.
    pub best: Option<ProviderResult>,
    /// Per mapped field, the first non-null value in priority order.
    pub merged_attributes: BTreeMap<String, Value>,
    /// All assets, deduplicated by URL.
    pub assets: Vec<ProviderAsset>,
}

impl LookupResponse {
    fn assemble(module: &ModuleDefinition, results: Vec<ProviderResult>) -> Self {
        let best = select_best(&results).cloned();
        let merged_attributes = merge_attributes(&module.contract, &results);
        let assets = merge_assets(&results);
        Self {
            module_key: module.module_key.clone(),
            results,
            best,
            merged_attributes,
            assets,
        }
    }
}

/// A provider that will be queried, with the identifiers it will receive.
struct Candidate {
    provider: Arc<dyn LookupProvider>,
    priority: i32,
    identifiers: Vec<Identifier>,
}

/// Runs lookups against the providers a module declares.
pub struct LookupOrchestrator {
    modules: Arc<ModuleRegistry>,
    providers: Arc<ProviderRegistry>,
    provider_timeout: Duration,
    overall_timeout: Duration,
}

impl LookupOrchestrator {
    pub fn new(
        modules: Arc<ModuleRegistry>,
        providers: Arc<ProviderRegistry>,
        config: &LookupConfig,
    ) -> Self {
        Self {
            modules,
            providers,
            provider_timeout: config.provider_timeout(),
            overall_timeout: config.overall_timeout(),
        }
    }

    /// Look up `identifiers` for the module with `module_id`.
    pub async fn lookup(
        &self,
        module_id: &ModuleId,
        identifiers: &[Identifier],
    ) -> Result<LookupResponse> {
        let module = self.modules.get_by_id(module_id)?;
        self.lookup_module(module, identifiers, CancellationToken::new())
            .await
    }

    /// Look up `identifiers` for the module registered under `module_key`.
    pub async fn lookup_by_key(
        &self,
        module_key: &str,
        identifiers: &[Identifier],
    ) -> Result<LookupResponse> {
        let module = self.modules.get_by_key(module_key)?;
        self.lookup_module(module, identifiers, CancellationToken::new())
            .await
    }

    /// Look up `identifiers` for `module`.
    ///
    /// Cancelling `cancel` stops waiting immediately, aborts providers still
    /// running, and returns whatever results had already arrived.
    pub async fn lookup_module(
        &self,
        module: Arc<ModuleDefinition>,
        identifiers: &[Identifier],
        cancel: CancellationToken,
    ) -> Result<LookupResponse> {
        if identifiers.is_empty() {
            return Err(Error::invalid_argument(
                "at least one identifier is required for a lookup",
            ));
        }

        let candidates = self.eligible(&module, identifiers);
        if candidates.is_empty() {
            info!(module = %module.module_key, "No eligible providers for lookup");
            return Ok(LookupResponse::assemble(&module, Vec::new()));
        }

        info!(
            module = %module.module_key,
            providers = candidates.len(),
            identifiers = identifiers.len(),
            "Starting provider lookup"
        );

        let slots = self.fan_out(&module, candidates, cancel).await;
        let results: Vec<ProviderResult> = slots.into_iter().flatten().collect();

        info!(
            module = %module.module_key,
            results = results.len(),
            "Provider lookup finished"
        );
        Ok(LookupResponse::assemble(&module, results))
    }

    /// Providers the module declares, in priority order, that are enabled,
    /// registered, available, and accept at least one supplied identifier.
    fn eligible(&self, module: &ModuleDefinition, identifiers: &[Identifier]) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for declared in module.contract.enabled_providers() {
            let Some(provider) = self.providers.get(&declared.key) else {
                debug!(provider = %declared.key, "Declared provider is not registered");
                continue;
            };
            if !self.providers.is_available(&declared.key) {
                debug!(provider = %declared.key, "Provider is missing credentials");
                continue;
            }
            let accepted: Vec<Identifier> = identifiers
                .iter()
                .filter(|id| {
                    declared.accepts(id.id_type()) && provider.supports_identifier_type(id.id_type())
                })
                .cloned()
                .collect();
            if accepted.is_empty() {
                debug!(provider = %declared.key, "No supported identifier types supplied");
                continue;
            }
            candidates.push(Candidate {
                provider,
                priority: declared.priority,
                identifiers: accepted,
            });
        }
        candidates
    }

    /// Run every candidate concurrently. The returned vector is indexed by
    /// candidate position; `None` marks a provider that produced nothing.
    async fn fan_out(
        &self,
        module: &Arc<ModuleDefinition>,
        candidates: Vec<Candidate>,
        cancel: CancellationToken,
    ) -> Vec<Option<ProviderResult>> {
        let mut slots: Vec<Option<ProviderResult>> = vec![None; candidates.len()];
        let deadline = Instant::now() + self.overall_timeout;
        let mut tasks = JoinSet::new();

        for (slot, candidate) in candidates.into_iter().enumerate() {
            let module = Arc::clone(module);
            let timeout = self.provider_timeout;
            tasks.spawn(async move {
                let key = candidate.provider.key().to_string();
                let outcome = query_provider(&module, candidate, timeout).await;
                (slot, key, outcome)
            });
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(
                        module = %module.module_key,
                        pending = tasks.len(),
                        "Lookup cancelled, abandoning pending providers"
                    );
                    tasks.abort_all();
                    break;
                }
                joined = tokio::time::timeout_at(deadline, tasks.join_next()) => match joined {
                    Err(_) => {
                        warn!(
                            module = %module.module_key,
                            pending = tasks.len(),
                            "Lookup deadline reached, abandoning pending providers"
                        );
                        tasks.abort_all();
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Ok((slot, key, outcome)))) => match outcome {
                        Ok(Some(result)) => {
                            debug!(
                                provider = %key,
                                confidence = result.confidence.score,
                                fields = result.normalized_fields.len(),
                                "Provider returned a result"
                            );
                            slots[slot] = Some(result);
                        }
                        Ok(None) => debug!(provider = %key, "Provider found no match"),
                        Err(e) => warn!(provider = %key, error = %e, "Provider lookup failed"),
                    },
                    Ok(Some(Err(e))) => warn!(error = %e, "Provider task did not complete"),
                }
            }
        }
        slots
    }
}

/// Query one provider under its own timeout and turn the answer into a
/// [`ProviderResult`].
async fn query_provider(
    module: &ModuleDefinition,
    candidate: Candidate,
    timeout: Duration,
) -> Result<Option<ProviderResult>> {
    let provider = candidate.provider.as_ref();
    let payload = match tokio::time::timeout(timeout, provider.lookup(&candidate.identifiers)).await
    {
        Ok(answer) => answer?,
        Err(_) => {
            return Err(Error::provider(
                provider.key(),
                ProviderErrorKind::Timeout,
                format!("no answer within {} ms", timeout.as_millis()),
            ))
        }
    };
    let Some(payload) = payload else {
        return Ok(None);
    };

    let confidence = provider.score_confidence(&payload, &candidate.identifiers);
    let normalized_fields = normalize_fields(&module.contract, provider.key(), &payload.raw_fields);
    Ok(Some(ProviderResult {
        provider_key: provider.key().to_string(),
        priority: candidate.priority,
        raw_fields: payload.raw_fields,
        normalized_fields,
        assets: payload.assets,
        confidence,
    }))
}
