//! Field normalization and priority merge of provider results.
//!
//! All functions here are pure: they take results already ordered by the
//! module's provider priority and never reorder them.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::trace;

use super::provider::{ProviderAsset, ProviderResult};
use crate::modules::{ModuleContract, RemotePath};

/// Extract module field values from one provider's raw record.
///
/// For every field that maps `provider_key`, the mappings are tried in
/// declaration order and the first non-null value wins. Fields with no
/// resolvable value are left out.
pub fn normalize_fields(
    contract: &ModuleContract,
    provider_key: &str,
    raw: &Value,
) -> BTreeMap<String, Value> {
    let mut normalized = BTreeMap::new();
    for field in contract.mapped_fields() {
        let value = field.mappings_for(provider_key).find_map(|mapping| {
            let path = RemotePath::parse(&mapping.path).ok()?;
            path.resolve(raw).filter(|v| !v.is_null())
        });
        if let Some(value) = value {
            trace!(provider = provider_key, field = %field.key, "Mapped field");
            normalized.insert(field.key.clone(), value.clone());
        }
    }
    normalized
}

/// The result with the highest confidence. Ties go to the earlier result.
pub fn select_best(results: &[ProviderResult]) -> Option<&ProviderResult> {
    results.iter().fold(None, |best: Option<&ProviderResult>, candidate| match best {
        Some(current) if current.confidence.score >= candidate.confidence.score => Some(current),
        _ => Some(candidate),
    })
}

/// Per mapped field, the first non-null normalized value in result order.
pub fn merge_attributes(
    contract: &ModuleContract,
    results: &[ProviderResult],
) -> BTreeMap<String, Value> {
    contract
        .mapped_fields()
        .filter_map(|field| {
            results
                .iter()
                .find_map(|r| r.normalized_fields.get(&field.key).filter(|v| !v.is_null()))
                .map(|value| (field.key.clone(), value.clone()))
        })
        .collect()
}

/// Union of all assets, deduplicated by URL, keeping the first occurrence.
pub fn merge_assets(results: &[ProviderResult]) -> Vec<ProviderAsset> {
    let mut seen = HashSet::new();
    results
        .iter()
        .flat_map(|r| r.assets.iter())
        .filter(|asset| seen.insert(asset.identity().to_string()))
        .cloned()
        .collect()
}
