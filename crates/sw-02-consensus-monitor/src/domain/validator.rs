//! Validator domain entities
//!
//! The active set comes from the node and is kept in the canonical order the
//! Istanbul engine uses for round-robin proposer selection: lexicographic
//! over the EIP-55 checksummed hex strings. Uppercase letters sort before
//! lowercase ones, so this differs from plain byte order.
//!
//! The registry is static reference data (operator names and enode URLs)
//! passed in at construction. It may name validators that are not currently
//! active.

use super::MonitorError;
use serde::{Deserialize, Serialize};
use shared_types::{keccak256, to_checksum, Address};
use std::collections::HashMap;

/// Active validator set in canonical order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatorSet {
    members: Vec<Address>,
    lookup: HashMap<Address, usize>,
}

impl ValidatorSet {
    /// Build a set from addresses in any order. Duplicates are dropped.
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        let mut keyed: Vec<(String, Address)> = addresses
            .into_iter()
            .map(|address| (to_checksum(&address), address))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.dedup_by(|a, b| a.1 == b.1);

        let members: Vec<Address> = keyed.into_iter().map(|(_, address)| address).collect();
        let lookup = members
            .iter()
            .enumerate()
            .map(|(i, address)| (*address, i))
            .collect();
        Self { members, lookup }
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.lookup.contains_key(address)
    }

    /// Canonical position of `address`.
    pub fn position(&self, address: &Address) -> Option<usize> {
        self.lookup.get(address).copied()
    }

    /// Round-robin successor of `current`.
    pub fn next_after(&self, current: &Address) -> Result<Address, MonitorError> {
        if self.members.is_empty() {
            return Err(MonitorError::EmptyValidatorSet);
        }
        let position = self
            .position(current)
            .ok_or(MonitorError::UnknownProposer(*current))?;
        Ok(self.members[(position + 1) % self.members.len()])
    }
}

/// Registry entry as loaded from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub operator: String,
    pub enode: String,
}

/// Reference data for one known validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidatorInfo {
    pub address: Address,
    pub operator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enode: Option<String>,
}

impl ValidatorInfo {
    /// Info for a validator known only by address.
    pub fn new(address: Address, operator: impl Into<String>) -> Self {
        Self {
            address,
            operator: operator.into(),
            enode: None,
        }
    }
}

/// Known validators keyed by address.
#[derive(Clone, Debug, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<Address, ValidatorInfo>,
}

const REDT_VALIDATORS: &str = include_str!("../../config/redt-validators.json");

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of the RedT network operators.
    pub fn redt() -> Result<Self, MonitorError> {
        Self::from_json(REDT_VALIDATORS)
    }

    /// Parse a JSON array of `{operator, enode}` entries.
    pub fn from_json(json: &str) -> Result<Self, MonitorError> {
        let entries: Vec<RegistryEntry> =
            serde_json::from_str(json).map_err(|e| MonitorError::Registry(e.to_string()))?;
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = RegistryEntry>) -> Result<Self, MonitorError> {
        let mut registry = Self::new();
        for entry in entries {
            let address = enode_to_address(&entry.enode)?;
            registry.insert(ValidatorInfo {
                address,
                operator: entry.operator,
                enode: Some(entry.enode),
            });
        }
        Ok(registry)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, info: ValidatorInfo) {
        self.validators.insert(info.address, info);
    }

    pub fn get(&self, address: &Address) -> Option<&ValidatorInfo> {
        self.validators.get(address)
    }

    /// Operator name, if the address is known.
    pub fn operator(&self, address: &Address) -> Option<&str> {
        self.get(address).map(|info| info.operator.as_str())
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatorInfo> {
        self.validators.values()
    }
}

/// Derive the account address of a node from its enode URL.
///
/// `enode://<128 hex chars>@host:port?query`. The node id is the uncompressed
/// secp256k1 public key without its `0x04` prefix.
pub fn enode_to_address(enode: &str) -> Result<Address, MonitorError> {
    let invalid = |reason: &str| MonitorError::Registry(format!("{}: {}", reason, enode));

    let rest = enode
        .strip_prefix("enode://")
        .ok_or_else(|| invalid("missing enode:// scheme"))?;
    let node_id = rest.split('@').next().unwrap_or(rest);

    let key = hex::decode(node_id).map_err(|_| invalid("node id is not hex"))?;
    if key.len() != 64 {
        return Err(invalid("node id must be 64 bytes"));
    }

    let mut sec1 = Vec::with_capacity(65);
    sec1.push(0x04);
    sec1.extend_from_slice(&key);
    k256::PublicKey::from_sec1_bytes(&sec1).map_err(|_| invalid("node id is not a curve point"))?;

    Ok(Address::from_slice(&keccak256(&key)[12..]))
}
