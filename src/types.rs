//! Core types for call-trace interpretation
//!
//! This module defines the canonical data structures consumed and produced
//! by the interpreter:
//! - Call traces as returned by a node's `callTracer` (normalized tree form)
//! - Token identities across the supported standards
//! - Recognized payments
//! - Chain-specific interpretation configuration

use std::collections::HashSet;

use alloy::primitives::{address, hex, Address, Bytes, Selector, U256};
use serde::{Deserialize, Serialize, Serializer};

/// Address of the native asset (the zero address by convention)
pub const NATIVE_TOKEN_ADDRESS: Address = Address::ZERO;

/// Polygon's MRC20 system contract, which moves native MATIC through a
/// regular contract call instead of attached value
pub const POLYGON_NATIVE_BRIDGE: Address =
    address!("0000000000000000000000000000000000001010");

/// Call scheme of a single trace node
///
/// Matches the upper-case `type` strings emitted by `callTracer`. Unknown
/// schemes deserialize to [`CallKind::Other`] so a single exotic node cannot
/// fail the whole trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallKind {
    Call,
    StaticCall,
    DelegateCall,
    CallCode,
    Create,
    Create2,
    SelfDestruct,
    #[serde(other)]
    Other,
}

/// One node of a normalized call trace
///
/// This is the single canonical tree shape every vendor trace format must be
/// converted into before interpretation; the interpreter never special-cases
/// vendor formats. Deserializes directly from geth `callTracer` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTrace {
    /// Call scheme (CALL, STATICCALL, DELEGATECALL, CREATE, ...)
    #[serde(rename = "type")]
    pub kind: CallKind,
    /// Caller address
    pub from: Address,
    /// Target address
    #[serde(default)]
    pub to: Address,
    /// Call data; the first 4 bytes are the function selector
    #[serde(default)]
    pub input: Bytes,
    /// Return data; empty means the call returned nothing
    #[serde(default)]
    pub output: Bytes,
    /// Native asset amount attached to the call (zero when absent)
    #[serde(default)]
    pub value: U256,
    /// Low-level error reported by the node, if the call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Decoded revert reason, if the node surfaced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    /// Nested sub-calls in execution order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallTrace>,
}

impl CallTrace {
    /// Returns the normalized failure message of this call, if any
    ///
    /// `error` and `revertReason` are treated as one field: the presence of
    /// either means the call and its entire subtree failed.
    pub fn failure(&self) -> Option<&str> {
        self.error.as_deref().or(self.revert_reason.as_deref())
    }

    /// True if this node (and therefore its whole subtree) failed
    pub fn is_failed(&self) -> bool {
        self.error.is_some() || self.revert_reason.is_some()
    }

    /// Function selector of the call data, if the input carries one
    pub fn selector(&self) -> Option<Selector> {
        (self.input.len() >= 4).then(|| Selector::from_slice(&self.input[..4]))
    }
}

/// Identity of a transferable asset
///
/// Modeled as a tagged union rather than a parseable string; the canonical
/// lower-case string form (`native:<addr>`, `erc20:<addr>`,
/// `erc721:<addr>:<id>`, `erc1155:<addr>:<id>`) is produced only at
/// serialization boundaries via [`std::fmt::Display`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenId {
    /// The chain's base currency, moved via call value
    Native,
    /// Fungible token balance on a contract
    Erc20 { contract: Address },
    /// A unique token, identified by contract and id
    Erc721 { contract: Address, token_id: U256 },
    /// A semi-fungible token balance, identified by contract and id
    Erc1155 { contract: Address, token_id: U256 },
}

impl TokenId {
    pub fn erc20(contract: Address) -> Self {
        Self::Erc20 { contract }
    }

    pub fn erc721(contract: Address, token_id: U256) -> Self {
        Self::Erc721 { contract, token_id }
    }

    pub fn erc1155(contract: Address, token_id: U256) -> Self {
        Self::Erc1155 { contract, token_id }
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => {
                write!(f, "native:0x{}", hex::encode(NATIVE_TOKEN_ADDRESS))
            }
            Self::Erc20 { contract } => write!(f, "erc20:0x{}", hex::encode(contract)),
            Self::Erc721 { contract, token_id } => {
                write!(f, "erc721:0x{}:{}", hex::encode(contract), token_id)
            }
            Self::Erc1155 { contract, token_id } => {
                write!(f, "erc1155:0x{}:{}", hex::encode(contract), token_id)
            }
        }
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One recognized logical payment
///
/// Payments are appended in the pre-order sequence in which their
/// originating call nodes were visited. Multiple payments for the same
/// `(from, to, token)` triple are kept separate, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    /// Paying address
    pub from: Address,
    /// Receiving address
    pub to: Address,
    /// Asset being moved
    pub token: TokenId,
    /// Amount in the asset's base units
    #[serde(serialize_with = "serialize_decimal")]
    pub amount: U256,
}

fn serialize_decimal<S: Serializer>(amount: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(amount)
}

/// Chain-specific interpretation parameters
///
/// Bundles the quirks that differ between traced chains: the reserved
/// precompile address range, the optional native-asset bridge contract, and
/// the allow-list of non-standard ERC20s whose `transferFrom` returns no
/// data despite being fungible. The allow-list is deliberately plain data so
/// callers can extend it; the return-data heuristic it overrides is not
/// otherwise configurable.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Exclusive upper bound of the reserved low-address precompile range
    pub precompile_limit: u16,
    /// System contract that mints/refunds the native asset via a
    /// `transfer(address,address,uint256)` call, if the chain has one
    pub native_bridge: Option<Address>,
    /// Fungible contracts whose `transferFrom` returns no data
    pub non_standard_erc20: HashSet<Address>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            precompile_limit: 0x1000,
            native_bridge: None,
            non_standard_erc20: default_non_standard_erc20(),
        }
    }
}

impl ChainConfig {
    /// Returns the configuration for a known chain id
    ///
    /// Unknown chains fall back to the mainnet-shaped default.
    pub fn for_chain(chain_id: u64) -> Self {
        match chain_id {
            // Polygon routes native MATIC through the MRC20 system contract;
            // the reserved range is widened to cover it so the synthetic
            // internal transfers it replays are suppressed.
            137 => Self {
                precompile_limit: 0x1100,
                native_bridge: Some(POLYGON_NATIVE_BRIDGE),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    /// True if `address` falls in the reserved low-address range
    ///
    /// The zero address is not a precompile; it doubles as the mint/burn
    /// counterparty and must stay adjustable.
    pub fn is_precompile(&self, address: Address) -> bool {
        let bytes = address.as_slice();
        if bytes[..18].iter().any(|b| *b != 0) {
            return false;
        }
        let tail = u16::from_be_bytes([bytes[18], bytes[19]]);
        tail != 0 && tail < self.precompile_limit
    }
}

/// Tokens known to skip the ERC20 boolean return value
///
/// Mainnet contracts that move fungible balances but return no data from
/// `transferFrom`, which would otherwise be misread as ERC721.
fn default_non_standard_erc20() -> HashSet<Address> {
    HashSet::from([
        // USDT
        address!("dac17f958d2ee523a2206206994597c13d831ec7"),
        // BNB
        address!("b8c77482e45f1f44de1745f52c74426c631bdd52"),
        // OMG
        address!("d26114cd6ee289accf82350c8d8487fedb8a0c07"),
    ])
}
