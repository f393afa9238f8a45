//! Event log reconstruction from raw opcode traces
//!
//! Some node backends only expose the legacy struct logger
//! (`debug_traceTransaction` without a `callTracer`), which records one step
//! per executed opcode but no structured log records. This module recovers
//! the emitted logs by emulating the effect of `LOG0..LOG4` against each
//! step's captured stack and memory.
//!
//! Attribution follows a scope-context stack seeded with the top-level
//! call: every CALL-family step pushes the callee's context, and a `LOGn`
//! step is attributed to the nearest context whose opcode is a plain `CALL`
//! at a shallower depth. STATICCALL and DELEGATECALL scopes never own logs
//! themselves; they inherit the address of their nearest true `CALL`
//! ancestor. When no such context exists the log falls back to the
//! top-level address. Missing memory capture degrades to empty data; a
//! malformed step is skipped. Neither is an error, since the recorded trace
//! format legitimately omits optional fields.

use alloy::primitives::{hex, Address, Bytes, Log, LogData, B256, U256};
use serde::{Deserialize, Serialize};

/// Output of the legacy struct logger for one transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerTrace {
    /// Total gas used by the transaction
    #[serde(default)]
    pub gas: u64,
    /// True if the transaction reverted
    #[serde(default)]
    pub failed: bool,
    /// Hex-encoded return value of the top-level call
    #[serde(default)]
    pub return_value: String,
    /// One entry per executed opcode, in execution order
    #[serde(default)]
    pub struct_logs: Vec<StructLog>,
}

/// One recorded execution step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLog {
    /// Opcode mnemonic (e.g. `CALL`, `LOG2`, `SSTORE`)
    pub op: String,
    /// Program counter
    #[serde(default)]
    pub pc: u64,
    /// Remaining gas before this step
    #[serde(default)]
    pub gas: u64,
    /// Gas charged for this step
    #[serde(default)]
    pub gas_cost: u64,
    /// Call-stack depth; increases on entering a sub-call
    pub depth: u64,
    /// Step-level error, if the opcode faulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Operand stack snapshot, top of stack last
    #[serde(default)]
    pub stack: Vec<U256>,
    /// Linear memory snapshot as 32-byte hex words; present only when
    /// memory capture is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Vec<String>>,
}

/// Call-family opcodes that open a new scope context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeOp {
    Call,
    StaticCall,
    DelegateCall,
}

impl ScopeOp {
    fn from_mnemonic(op: &str) -> Option<Self> {
        match op {
            "CALL" => Some(Self::Call),
            "STATICCALL" => Some(Self::StaticCall),
            "DELEGATECALL" => Some(Self::DelegateCall),
            _ => None,
        }
    }
}

/// Which contract address is executing a stretch of steps
#[derive(Debug, Clone, Copy)]
struct ScopeContext {
    op: ScopeOp,
    contract: Address,
    depth: u64,
}

/// Reconstructs the emitted event logs from a raw opcode trace
///
/// `to` is the destination of the top-level call; it seeds the context
/// stack and is the fallback attribution for logs with no resolvable
/// enclosing `CALL` scope. Logs come back in step order, which equals
/// emission order within the transaction.
pub fn reconstruct_logs(to: Address, trace: &LoggerTrace) -> Vec<Log> {
    let mut contexts = vec![ScopeContext {
        op: ScopeOp::Call,
        contract: to,
        depth: 0,
    }];
    let mut logs = Vec::new();

    for step in &trace.struct_logs {
        if let Some(op) = ScopeOp::from_mnemonic(&step.op) {
            // CALL-family layout puts gas on top and the callee address in
            // the second slot from the top.
            match nth_from_top(&step.stack, 1) {
                Some(word) => contexts.push(ScopeContext {
                    op,
                    contract: Address::from_word(B256::from(word)),
                    depth: step.depth,
                }),
                None => {
                    tracing::warn!(op = %step.op, pc = step.pc, "call step with truncated stack");
                }
            }
            continue;
        }

        let Some(topic_count) = log_topic_count(&step.op) else {
            continue;
        };
        if step.stack.len() < 2 + topic_count {
            tracing::warn!(op = %step.op, pc = step.pc, "log step with truncated stack");
            continue;
        }

        // LOGn layout, top of stack first: offset, length, then the topics
        // in push order.
        let offset = nth_from_top(&step.stack, 0).unwrap_or_default();
        let length = nth_from_top(&step.stack, 1).unwrap_or_default();
        let topics: Vec<B256> = (0..topic_count)
            .filter_map(|i| nth_from_top(&step.stack, 2 + i))
            .map(B256::from)
            .collect();
        let data = step
            .memory
            .as_deref()
            .map(|memory| read_memory(memory, offset, length))
            .unwrap_or_default();

        let scope = contexts
            .iter()
            .rev()
            .find(|context| context.op == ScopeOp::Call && context.depth < step.depth)
            .unwrap_or(&contexts[0]);

        logs.push(Log {
            address: scope.contract,
            data: LogData::new_unchecked(topics, data),
        });
    }

    logs
}

fn nth_from_top(stack: &[U256], n: usize) -> Option<U256> {
    stack.len().checked_sub(n + 1).map(|i| stack[i])
}

fn log_topic_count(op: &str) -> Option<usize> {
    let count = op.strip_prefix("LOG")?.parse::<usize>().ok()?;
    (count <= 4).then_some(count)
}

/// Reads `[offset, offset + length)` out of a captured memory snapshot
///
/// Out-of-range reads are clamped to the captured bytes; an undecodable
/// word yields empty data rather than an error.
fn read_memory(memory: &[String], offset: U256, length: U256) -> Bytes {
    let mut bytes = Vec::with_capacity(memory.len() * 32);
    for word in memory {
        match hex::decode(word.trim_start_matches("0x")) {
            Ok(decoded) => bytes.extend_from_slice(&decoded),
            Err(_) => {
                tracing::warn!("undecodable memory word in struct log");
                return Bytes::new();
            }
        }
    }
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
    let end = usize::try_from(length)
        .unwrap_or(usize::MAX)
        .saturating_add(start)
        .min(bytes.len());
    Bytes::copy_from_slice(&bytes[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_count_parses_only_log_opcodes() {
        assert_eq!(log_topic_count("LOG0"), Some(0));
        assert_eq!(log_topic_count("LOG4"), Some(4));
        assert_eq!(log_topic_count("LOG5"), None);
        assert_eq!(log_topic_count("SLOAD"), None);
        assert_eq!(log_topic_count("LOGX"), None);
    }

    #[test]
    fn memory_reads_are_clamped() {
        let memory = vec![
            "00000000000000000000000000000000000000000000000000000000000000ff".to_string(),
        ];
        let data = read_memory(&memory, U256::from(31), U256::from(8));
        assert_eq!(data.as_ref(), &[0xff]);

        let data = read_memory(&memory, U256::from(64), U256::from(8));
        assert!(data.is_empty());
    }
}
