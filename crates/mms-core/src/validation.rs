//! Schema validation for markets and market maps.
//!
//! Single-market checks (`Market::validate`) are structural and need no
//! context. Map checks (`MarketMap::validate`) add the cross-market rules:
//! keys match tickers, normalize targets resolve, and an enabled market never
//! normalizes against a disabled one.

use crate::error::{CoreError, CoreResult, ValidationErrors};
use crate::market::{CurrencyPair, Market, MarketMap, ProviderConfig, DEFI_SEPARATOR};
use std::collections::HashSet;

/// Maximum price decimals a ticker may declare.
pub const MAX_DECIMALS: u64 = 36;

/// Maximum size of a metadata JSON blob in bytes.
pub const MAX_METADATA_JSON_LEN: usize = 16 * 1024;

const DEFI_PARTS: usize = 3;

impl CurrencyPair {
    /// Structural check of a pair.
    ///
    /// Plain symbols must be non-empty and upper-case. A DeFi base must have
    /// exactly three non-empty comma-separated parts with an upper-case symbol;
    /// the contract address keeps its own case.
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |reason: String| CoreError::InvalidCurrencyPair {
            pair: self.to_string(),
            reason,
        };

        if self.is_defi() {
            let parts: Vec<&str> = self.base.split(DEFI_SEPARATOR).collect();
            if parts.len() != DEFI_PARTS || parts.iter().any(|p| p.is_empty()) {
                return Err(invalid(format!(
                    "DeFi base must be SYMBOL{DEFI_SEPARATOR}VENUE{DEFI_SEPARATOR}ADDRESS"
                )));
            }
            check_symbol(parts[0]).map_err(|r| invalid(format!("base {r}")))?;
        } else {
            check_symbol(&self.base).map_err(|r| invalid(format!("base {r}")))?;
        }

        if self.quote.contains(DEFI_SEPARATOR) {
            return Err(invalid("quote cannot be DeFi-qualified".to_string()));
        }
        check_symbol(&self.quote).map_err(|r| invalid(format!("quote {r}")))
    }
}

fn check_symbol(symbol: &str) -> Result<(), String> {
    if symbol.is_empty() {
        return Err("is empty".to_string());
    }
    if symbol.contains('/') {
        return Err(format!("{symbol:?} contains '/'"));
    }
    if symbol != symbol.to_uppercase() {
        return Err(format!("{symbol:?} is not upper-case"));
    }
    Ok(())
}

fn check_metadata(json: &str) -> Result<(), String> {
    if json.is_empty() {
        return Ok(());
    }
    if json.len() > MAX_METADATA_JSON_LEN {
        return Err(format!(
            "metadata is {} bytes, max {MAX_METADATA_JSON_LEN}",
            json.len()
        ));
    }
    serde_json::from_str::<serde_json::Value>(json)
        .map(|_| ())
        .map_err(|e| format!("metadata is not valid JSON: {e}"))
}

impl ProviderConfig {
    fn validate_for(&self, owner: &CurrencyPair) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("provider name is empty".to_string());
        }
        if self.off_chain_ticker.is_empty() {
            return Err(format!("provider {} has empty off-chain ticker", self.name));
        }
        if let Some(pair) = &self.normalize_by_pair {
            pair.validate()
                .map_err(|e| format!("provider {} normalize pair: {e}", self.name))?;
            if pair == owner {
                return Err(format!("provider {} normalizes by its own pair", self.name));
            }
        }
        check_metadata(&self.metadata_json).map_err(|e| format!("provider {}: {e}", self.name))
    }
}

impl Market {
    /// Structural validation of a single market.
    pub fn validate(&self) -> CoreResult<()> {
        let key = self.key();
        let ticker = &self.ticker;

        ticker.currency_pair.validate()?;

        if ticker.decimals > MAX_DECIMALS {
            return Err(CoreError::market(
                &key,
                format!("decimals {} exceeds {MAX_DECIMALS}", ticker.decimals),
            ));
        }
        if ticker.min_provider_count == 0 {
            return Err(CoreError::market(&key, "min_provider_count must be positive"));
        }
        if (self.provider_configs.len() as u64) < ticker.min_provider_count {
            return Err(CoreError::market(
                &key,
                format!(
                    "{} provider(s) configured, min_provider_count is {}",
                    self.provider_configs.len(),
                    ticker.min_provider_count
                ),
            ));
        }
        check_metadata(&ticker.metadata_json).map_err(|e| CoreError::market(&key, e))?;

        let mut seen = HashSet::with_capacity(self.provider_configs.len());
        for provider in &self.provider_configs {
            provider
                .validate_for(&ticker.currency_pair)
                .map_err(|e| CoreError::market(&key, e))?;
            if !seen.insert(provider.name.as_str()) {
                return Err(CoreError::market(
                    &key,
                    format!("duplicate provider {}", provider.name),
                ));
            }
        }

        Ok(())
    }
}

impl MarketMap {
    /// Validate every market plus cross-market consistency.
    ///
    /// All failures are collected before returning.
    pub fn validate(&self) -> CoreResult<()> {
        let mut errors = ValidationErrors::new();

        for (key, market) in self.iter() {
            if *key != market.key() {
                errors.push(CoreError::InvalidMarketMap(format!(
                    "key {key} does not match ticker {}",
                    market.key()
                )));
            }
            if let Err(e) = market.validate() {
                errors.push(e);
            }
            for target in market.normalize_targets() {
                match self.get_pair(target) {
                    None => errors.push(CoreError::InvalidMarketMap(format!(
                        "market {key} normalizes by {target}, which is not in the map"
                    ))),
                    Some(t) if market.is_enabled() && !t.is_enabled() => {
                        errors.push(CoreError::InvalidMarketMap(format!(
                            "enabled market {key} normalizes by disabled market {target}"
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        errors.into_result()
    }
}
