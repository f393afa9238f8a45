//! Error types for call-trace interpretation
//!
//! A decode failure inside one handler is fatal to the whole interpretation
//! run: a recognized selector with malformed call data means the
//! recognized-method assumption was violated, and partial balance state
//! would be misleading. Reverted subtrees and unrecognized calls are not
//! errors at all; they simply contribute nothing.

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::types::TokenId;

/// Errors surfaced by [`interpret`](crate::interpret) and its entry points
#[derive(Debug, Error)]
pub enum InterpretError {
    /// Call data matched a known selector but did not decode against its
    /// signature
    #[error("failed to decode `{signature}` call data: {reason}")]
    CallDataDecode {
        /// Canonical signature of the matched method
        signature: &'static str,
        /// Decoder error message
        reason: String,
    },

    /// `safeBatchTransferFrom` ids and values arrays differ in length
    #[error("batch transfer has {ids} ids but {values} values")]
    BatchLengthMismatch { ids: usize, values: usize },

    /// A transfer amount does not fit signed 256-bit delta arithmetic
    #[error("transfer amount {amount} exceeds the signed 256-bit range")]
    AmountOverflow { amount: U256 },

    /// Accumulating a delta overflowed the running balance
    #[error("balance delta overflow for {address} on token {token}")]
    BalanceOverflow { address: Address, token: TokenId },
}

impl InterpretError {
    /// Builds the decode-failure mapper for one method signature
    pub(crate) fn decoder(
        signature: &'static str,
    ) -> impl Fn(alloy::sol_types::Error) -> InterpretError {
        move |source| InterpretError::CallDataDecode {
            signature,
            reason: source.to_string(),
        }
    }
}
