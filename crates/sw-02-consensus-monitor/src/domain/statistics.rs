//! Block production statistics

use super::ValidatorSet;
use serde::Serialize;
use shared_types::{Address, H256};
use std::collections::HashMap;

/// Per-validator proposal and endorsement counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CounterTable {
    pub proposals_by: HashMap<Address, u64>,
    pub endorsements_by: HashMap<Address, u64>,
}

impl CounterTable {
    /// Zeroed counters for every member of `set`.
    pub fn seeded(set: &ValidatorSet) -> Self {
        let zeros: HashMap<Address, u64> = set.members().iter().map(|a| (*a, 0)).collect();
        Self {
            proposals_by: zeros.clone(),
            endorsements_by: zeros,
        }
    }

    pub fn record(&mut self, proposer: Address, endorsers: &[Address]) {
        *self.proposals_by.entry(proposer).or_insert(0) += 1;
        for endorser in endorsers {
            *self.endorsements_by.entry(*endorser).or_insert(0) += 1;
        }
    }

    pub fn proposals_of(&self, address: &Address) -> u64 {
        self.proposals_by.get(address).copied().unwrap_or(0)
    }

    pub fn endorsements_of(&self, address: &Address) -> u64 {
        self.endorsements_by.get(address).copied().unwrap_or(0)
    }
}

/// Counters plus the watermark. Guarded together by one lock.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    pub counters: CounterTable,
    /// Highest block already counted.
    pub last_processed: u64,
}

impl Statistics {
    pub fn seeded(set: &ValidatorSet) -> Self {
        Self {
            counters: CounterTable::seeded(set),
            last_processed: 0,
        }
    }

    /// Count a block unless it is at or below the watermark.
    ///
    /// Returns whether the counters changed.
    pub fn apply(&mut self, number: u64, proposer: Address, endorsers: &[Address]) -> bool {
        if number <= self.last_processed {
            return false;
        }
        self.counters.record(proposer, endorsers);
        self.last_processed = number;
        true
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            last_processed: self.last_processed,
            proposals_by: self.counters.proposals_by.clone(),
            endorsements_by: self.counters.endorsements_by.clone(),
        }
    }
}

/// Read-only copy of the statistics for presentation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub last_processed: u64,
    pub proposals_by: HashMap<Address, u64>,
    pub endorsements_by: HashMap<Address, u64>,
}

impl StatisticsSnapshot {
    pub fn proposals_of(&self, address: &Address) -> u64 {
        self.proposals_by.get(address).copied().unwrap_or(0)
    }

    pub fn endorsements_of(&self, address: &Address) -> u64 {
        self.endorsements_by.get(address).copied().unwrap_or(0)
    }
}

/// Signers of one block, without touching the statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerData {
    pub number: u64,
    pub hash: H256,
    pub timestamp: u64,
    pub proposer: Address,
    pub endorsers: Vec<Address>,
}

/// One line of the per-validator table in a [`BlockReport`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorRow {
    pub address: Address,
    pub operator: Option<String>,
    pub proposals: u64,
    pub endorsements: u64,
    pub is_proposer: bool,
    pub is_endorser: bool,
}

/// Everything presentation layers show for a newly processed block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReport {
    pub number: u64,
    pub timestamp: u64,
    /// Seconds since the previous block seen by the caller.
    pub elapsed: u64,
    pub proposer: Address,
    pub operator: Option<String>,
    pub proposer_count: u64,
    pub endorsers: Vec<Address>,
    /// `None` when the proposer has left the active set.
    pub next_proposer: Option<Address>,
    pub next_operator: Option<String>,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub validators: Vec<ValidatorRow>,
}
