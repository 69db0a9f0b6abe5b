//! Market-map reconciliation for the sync pipeline.
//!
//! Turns an on-chain ("actual") market map and a proposed ("generated") one
//! into the ordered list of markets that must be written:
//!
//! 1. [`consolidate`]: match markets across ticker spellings via aggregator IDs
//! 2. [`merge_market_maps`]: policy-driven merge, producing `combined` + `removals`
//! 3. [`override_cross_margin`]: pin cross-margin perpetual markets to chain state
//! 4. [`get_market_map_upserts`]: prune, diff, close over dependencies, order, validate
//!
//! Remote reads go through [`MarketMapSource`] and [`PerpetualsSource`];
//! [`ChainRestClient`] implements both over the chain's REST gateway.

pub mod client;
pub mod consolidate;
pub mod cross_margin;
pub mod error;
pub mod merge;
pub mod source;
pub mod upsert;

pub use client::{ChainRestClient, MarketMapResponse, PageResponse, PerpetualsPage};
pub use consolidate::{build_id_map, consolidate};
pub use cross_margin::override_cross_margin;
pub use error::{RegistryError, RegistryResult};
pub use merge::{merge_market_maps, merge_consolidated, MergeOutcome};
pub use source::{
    BoxFuture, MarketMapSource, PerpetualsSource, StaticMarketMapSource, StaticPerpetualsSource,
};
pub use upsert::{get_market_map_upserts, order_by_dependencies, prune_markets};
