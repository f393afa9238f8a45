//! Balance delta accumulation
//!
//! [`StateChange`] is the per-address, per-token net delta map built up over
//! one interpretation run. It is a derived structure: the only mutation path
//! is [`StateChange::adjust`], which maintains two invariants after every
//! operation — no token entry ever holds a zero delta, and no address entry
//! survives with an empty token map.

use std::collections::BTreeMap;

use alloy::primitives::{hex, Address, I256};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::errors::InterpretError;
use crate::types::TokenId;

/// Net balance deltas accumulated over one interpretation run
///
/// Keys iterate in a stable order, so equal runs produce identical
/// serialized snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateChange {
    balances: BTreeMap<Address, BTreeMap<TokenId, I256>>,
}

impl StateChange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to the running balance of `(address, token)`
    ///
    /// Entries that net out to exactly zero are removed immediately, and an
    /// address whose last token entry was removed disappears entirely.
    pub(crate) fn adjust(
        &mut self,
        address: Address,
        token: &TokenId,
        delta: I256,
    ) -> Result<(), InterpretError> {
        let tokens = self.balances.entry(address).or_default();
        let entry = tokens.entry(token.clone()).or_insert(I256::ZERO);
        *entry = entry
            .checked_add(delta)
            .ok_or_else(|| InterpretError::BalanceOverflow {
                address,
                token: token.clone(),
            })?;
        if entry.is_zero() {
            tokens.remove(token);
        }
        if tokens.is_empty() {
            self.balances.remove(&address);
        }
        Ok(())
    }

    /// Net delta for one `(address, token)` pair, if an entry survived
    pub fn delta(&self, address: Address, token: &TokenId) -> Option<I256> {
        self.balances.get(&address).and_then(|tokens| tokens.get(token)).copied()
    }

    /// Token deltas recorded for one address
    pub fn tokens(&self, address: Address) -> Option<&BTreeMap<TokenId, I256>> {
        self.balances.get(&address)
    }

    /// Iterates all `(address, token deltas)` entries in address order
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &BTreeMap<TokenId, I256>)> {
        self.balances.iter()
    }

    /// Number of addresses with at least one surviving delta
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

impl Serialize for StateChange {
    /// Canonical nested string form: lower-case `0x…` address keys, token-id
    /// string keys, signed decimal string values
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut outer = serializer.serialize_map(Some(self.balances.len()))?;
        for (address, tokens) in &self.balances {
            let tokens: BTreeMap<String, String> = tokens
                .iter()
                .map(|(token, delta)| (token.to_string(), delta.to_string()))
                .collect();
            outer.serialize_entry(&format!("0x{}", hex::encode(address)), &tokens)?;
        }
        outer.end()
    }
}
