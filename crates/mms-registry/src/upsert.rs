//! Upsert diffing.
//!
//! Computes the minimal, dependency-ordered list of markets to write so the
//! chain converges on the generated map:
//!
//! 1. Prune providers normalizing against disabled markets, and markets left
//!    with too few providers
//! 2. Short-circuit when nothing differs
//! 3. Diff against current state
//! 4. Pull in normalize targets that are not on chain yet
//! 5. Drop deny-listed tickers
//! 6. Order normalize targets before their dependents
//! 7. Validate each market and the resulting map, collecting every failure

use crate::error::{RegistryError, RegistryResult};
use mms_core::{CurrencyPair, Market, MarketMap, ValidationErrors};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Markets to upsert so `current` converges on `generated`.
///
/// Returns an empty list when the pruned generated map already equals
/// `current`.
pub fn get_market_map_upserts(
    current: &MarketMap,
    generated: &MarketMap,
    deny_list: &[String],
) -> RegistryResult<Vec<Market>> {
    let pruned = prune_markets(current, generated);
    if pruned == *current {
        debug!("Generated market map matches chain, nothing to upsert");
        return Ok(Vec::new());
    }

    let mut upserts: Vec<Market> = pruned
        .values()
        .filter(|market| current.get(&market.key()) != Some(*market))
        .cloned()
        .collect();

    close_over_dependencies(current, &pruned, &mut upserts)?;

    if !deny_list.is_empty() {
        let denied: HashSet<&str> = deny_list.iter().map(String::as_str).collect();
        upserts.retain(|market| {
            let key = market.key();
            let keep = !denied.contains(key.as_str());
            if !keep {
                info!(market = %key, "Skipping deny-listed market");
            }
            keep
        });
    }

    let ordered = order_by_dependencies(upserts);
    validate_upserts(current, &ordered)?;

    info!(count = ordered.len(), "Computed market upserts");
    Ok(ordered)
}

/// Availability of a normalize target after this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetState {
    Enabled,
    Disabled,
    /// Not known anywhere; left for dependency resolution to report.
    Unknown,
}

/// Drop providers that normalize against disabled markets, then drop enabled
/// markets left below their minimum provider count.
///
/// Repeats until stable, since dropping a market can disable another
/// market's normalize target. Disabled markets are not pruned.
pub fn prune_markets(current: &MarketMap, generated: &MarketMap) -> MarketMap {
    let mut pruned = generated.clone();
    let mut dropped: HashSet<String> = HashSet::new();

    let target_state = |pruned: &MarketMap, dropped: &HashSet<String>, pair: &CurrencyPair| {
        let key = pair.to_string();
        if let Some(market) = pruned.get(&key) {
            return state_of(market);
        }
        match current.get(&key) {
            Some(market) => state_of(market),
            None if dropped.contains(&key) => TargetState::Disabled,
            None => TargetState::Unknown,
        }
    };

    loop {
        let mut changed = false;
        let keys: Vec<String> = pruned.keys().cloned().collect();

        for key in keys {
            let Some(market) = pruned.get(&key) else {
                continue;
            };
            if !market.is_enabled() {
                continue;
            }

            let mut kept = market.clone();
            kept.provider_configs.retain(|provider| match &provider.normalize_by_pair {
                Some(pair) => target_state(&pruned, &dropped, pair) != TargetState::Disabled,
                None => true,
            });

            if (kept.provider_configs.len() as u64) < kept.ticker.min_provider_count {
                debug!(
                    market = %key,
                    providers = kept.provider_configs.len(),
                    min = kept.ticker.min_provider_count,
                    "Dropping market with too few usable providers"
                );
                pruned.remove(&key);
                dropped.insert(key);
                changed = true;
            } else if kept.provider_configs.len() != market.provider_configs.len() {
                debug!(market = %key, "Pruned providers normalizing by disabled markets");
                pruned.insert(kept);
                changed = true;
            }
        }

        if !changed {
            return pruned;
        }
    }
}

fn state_of(market: &Market) -> TargetState {
    if market.is_enabled() {
        TargetState::Enabled
    } else {
        TargetState::Disabled
    }
}

/// Add normalize targets that are not on chain yet.
///
/// Targets are taken from `generated`; a target missing from both sides is a
/// dependency error. Newly added targets are themselves checked.
fn close_over_dependencies(
    current: &MarketMap,
    generated: &MarketMap,
    upserts: &mut Vec<Market>,
) -> RegistryResult<()> {
    let mut working = current.clone();
    for market in upserts.iter() {
        working.insert(market.clone());
    }

    let mut i = 0;
    while i < upserts.len() {
        let dependent = upserts[i].key();
        let targets: Vec<CurrencyPair> = upserts[i].normalize_targets().cloned().collect();

        for target in targets {
            if working.contains_pair(&target) {
                continue;
            }
            let market = generated.get_pair(&target).ok_or_else(|| {
                RegistryError::Dependency(format!(
                    "market {dependent} normalizes by {target}, which is neither on chain nor generated"
                ))
            })?;
            debug!(market = %target, dependent = %dependent, "Adding normalize target to upserts");
            working.insert(market.clone());
            upserts.push(market.clone());
        }
        i += 1;
    }
    Ok(())
}

/// Stable reorder putting normalize targets before the markets using them.
///
/// Targets come first in first-seen order, each preceded by its own targets,
/// followed by the remaining markets in their original order.
pub fn order_by_dependencies(markets: Vec<Market>) -> Vec<Market> {
    let index: HashMap<String, usize> = markets
        .iter()
        .enumerate()
        .map(|(i, market)| (market.key(), i))
        .collect();

    let mut placed = vec![false; markets.len()];
    let mut order: Vec<usize> = Vec::with_capacity(markets.len());

    fn place(
        i: usize,
        markets: &[Market],
        index: &HashMap<String, usize>,
        placed: &mut [bool],
        order: &mut Vec<usize>,
    ) {
        if placed[i] {
            return;
        }
        placed[i] = true;
        for target in markets[i].normalize_targets() {
            if let Some(&j) = index.get(&target.to_string()) {
                place(j, markets, index, placed, order);
            }
        }
        order.push(i);
    }

    for market in &markets {
        for target in market.normalize_targets() {
            if let Some(&j) = index.get(&target.to_string()) {
                place(j, &markets, &index, &mut placed, &mut order);
            }
        }
    }
    for i in 0..markets.len() {
        if !placed[i] {
            placed[i] = true;
            order.push(i);
        }
    }

    let mut slots: Vec<Option<Market>> = markets.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

/// Validate each candidate, then the map they would produce on chain.
fn validate_upserts(current: &MarketMap, upserts: &[Market]) -> RegistryResult<()> {
    let mut errors = ValidationErrors::new();
    for market in upserts {
        if let Err(e) = market.validate() {
            errors.push(e);
        }
    }

    let mut hypothetical = current.clone();
    for market in upserts {
        hypothetical.insert(market.clone());
    }
    if let Err(e) = hypothetical.validate() {
        errors.push(e);
    }

    errors.into_result()?;
    Ok(())
}
