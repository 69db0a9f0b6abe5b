//! Account sequence tracking for one generation run.
//!
//! Two counters are kept:
//! - the simulation sequence, fixed at the account's on-chain sequence when
//!   the run starts, since the chain has seen none of this run's transactions
//!   when each one is simulated
//! - the real sequence, stamped on each signed transaction and advanced by one
//!   after every signature
//!
//! The tracker is owned by the generator and never shared.

use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceTracker {
    simulation: u64,
    next: u64,
}

impl SequenceTracker {
    /// Start a run at the account's current on-chain sequence.
    #[must_use]
    pub fn new(onchain_sequence: u64) -> Self {
        Self {
            simulation: onchain_sequence,
            next: onchain_sequence,
        }
    }

    /// Sequence used for every gas simulation in this run.
    #[must_use]
    pub fn simulation(&self) -> u64 {
        self.simulation
    }

    /// Sequence for the next transaction to sign.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.next
    }

    /// Mark the current sequence as used and return it.
    pub fn advance(&mut self) -> u64 {
        let used = self.next;
        self.next = self.next.saturating_add(1);
        trace!(used, next = self.next, "Advanced account sequence");
        used
    }

    /// Number of transactions signed so far.
    #[must_use]
    pub fn signed(&self) -> u64 {
        self.next - self.simulation
    }
}
