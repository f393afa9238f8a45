//! # EVM Call-Trace Decoder
//!
//! A library for interpreting EVM execution traces into token balance
//! deltas and logical payments, and for reconstructing emitted event logs
//! from raw opcode-level traces.
//!
//! ## Core Features
//!
//! - **Call-Trace Interpretation**
//!   - Selector-keyed handler dispatch over a canonical call tree
//!   - Native, ERC20, ERC721 and ERC1155 transfer recognition
//!   - Wrapped-native deposits/withdrawals and mint/burn flows
//!   - Per-address, per-token net balance deltas
//!   - Flat, time-ordered payment extraction
//!
//! - **Opcode-Level Log Reconstruction**
//!   - `LOG0..LOG4` emulation against captured stack and memory
//!   - Scope tracking across CALL / STATICCALL / DELEGATECALL
//!
//! - **Chain Quirk Handling**
//!   - Precompile-range transfer suppression
//!   - Replayed internal-call deduplication
//!   - Native-asset bridge system contracts (e.g. Polygon's MRC20)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use trace_decode::{interpret_payments, interpret_state, CallTrace};
//!
//! # fn example(raw: &str) -> Result<(), Box<dyn std::error::Error>> {
//! // A canonical trace as returned by a node's callTracer.
//! let trace: CallTrace = serde_json::from_str(raw)?;
//!
//! // Net balance deltas per address and token.
//! let state = interpret_state(&trace)?;
//! for (address, tokens) in state.iter() {
//!     for (token, delta) in tokens {
//!         println!("{address}: {token} {delta}");
//!     }
//! }
//!
//! // The same traversal, viewed as a flat list of payments.
//! for payment in interpret_payments(&trace)? {
//!     println!(
//!         "{} -> {}: {} {}",
//!         payment.from, payment.to, payment.amount, payment.token
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `types`: Canonical trace shapes, token identities and chain config
//! - `balance`: The balance delta accumulator
//! - `handlers`: Handler registry and the builtin transfer handler set
//! - `interpreter`: The call-trace walker and its entry points
//! - `search`: Read-only call-tree queries
//! - `opcode`: Log reconstruction from struct-logger traces
//! - `errors`: Error types

pub mod balance;
pub mod errors;
pub mod handlers;
pub mod interpreter;
pub mod opcode;
pub mod search;
pub mod types;

pub use balance::StateChange;
pub use errors::InterpretError;
pub use handlers::{register_handler, CallHandler, HandlerFn};
pub use interpreter::{
    interpret, interpret_payments, interpret_payments_with_config, interpret_state,
    interpret_state_with_config, Interpretation,
};
pub use opcode::{reconstruct_logs, LoggerTrace, StructLog};
pub use search::{find_all_calls, find_nth_call, CallFilter};
pub use types::{
    CallKind, CallTrace, ChainConfig, Payment, TokenId, NATIVE_TOKEN_ADDRESS,
};
