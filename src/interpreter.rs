//! Call-trace walker
//!
//! Drives a depth-first, pre-order traversal over a canonical call trace,
//! dispatching the applicable handlers at every plain-CALL node and
//! collecting their effects into one [`StateChange`] and one payment list.
//!
//! Traversal rules:
//! - A node carrying an error is terminal: no dispatch, no descent.
//! - Handlers run only for `CALL` nodes.
//! - Children are visited only under `CALL` and `DELEGATECALL`; a
//!   `STATICCALL` cannot contain state-mutating sub-calls, so it is a leaf.
//! - A child replaying its parent's exact `(from, to)` pair — a quirk of
//!   some traced chains — has its own dispatch suppressed to avoid counting
//!   the same transfer twice, but is still descended into.

use alloy::primitives::{Address, I256, U256};

use crate::balance::StateChange;
use crate::errors::InterpretError;
use crate::handlers;
use crate::types::{CallKind, CallTrace, ChainConfig, Payment, TokenId, NATIVE_TOKEN_ADDRESS};

/// Mutable state of one interpretation run
///
/// Owns the accumulators for the duration of a single traversal and is the
/// only thing handlers may mutate. Handlers go through the helper methods
/// below; the `StateChange` itself is not directly writable.
pub struct Interpretation<'a> {
    config: &'a ChainConfig,
    state: StateChange,
    payments: Vec<Payment>,
    failure: Option<InterpretError>,
}

impl<'a> Interpretation<'a> {
    fn new(config: &'a ChainConfig) -> Self {
        Self {
            config,
            state: StateChange::new(),
            payments: Vec::new(),
            failure: None,
        }
    }

    /// Chain configuration for this run
    pub fn config(&self) -> &'a ChainConfig {
        self.config
    }

    /// Records a symmetric transfer: debit source, credit destination, one
    /// payment
    ///
    /// The debit is always applied before the credit; the two writes are
    /// independent, but the fixed order keeps snapshot-based comparisons
    /// deterministic.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        token: TokenId,
        amount: U256,
    ) -> Result<(), InterpretError> {
        let delta = signed(amount)?;
        self.state.adjust(from, &token, -delta)?;
        self.state.adjust(to, &token, delta)?;
        self.record_payment(from, to, token, amount);
        Ok(())
    }

    /// Credit-only wrap of attached native value: balance appears on the
    /// beneficiary, the payment flows in from the zero address
    pub fn deposit(
        &mut self,
        beneficiary: Address,
        token: TokenId,
        amount: U256,
    ) -> Result<(), InterpretError> {
        self.state.adjust(beneficiary, &token, signed(amount)?)?;
        self.record_payment(NATIVE_TOKEN_ADDRESS, beneficiary, token, amount);
        Ok(())
    }

    /// Debit-only unwrap: balance leaves the holder, the payment flows out
    /// to the zero address
    pub fn withdraw(
        &mut self,
        holder: Address,
        token: TokenId,
        amount: U256,
    ) -> Result<(), InterpretError> {
        self.state.adjust(holder, &token, -signed(amount)?)?;
        self.record_payment(holder, NATIVE_TOKEN_ADDRESS, token, amount);
        Ok(())
    }

    /// Protocol-level native mint through a bridge system contract: credit
    /// without a matching debit, payment attributed to the system address
    pub fn bridge_credit(
        &mut self,
        system: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), InterpretError> {
        self.state.adjust(to, &TokenId::Native, signed(amount)?)?;
        self.record_payment(system, to, TokenId::Native, amount);
        Ok(())
    }

    /// Appends one payment without touching balances
    pub fn record_payment(&mut self, from: Address, to: Address, token: TokenId, amount: U256) {
        self.payments.push(Payment {
            from,
            to,
            token,
            amount,
        });
    }
}

fn signed(amount: U256) -> Result<I256, InterpretError> {
    I256::try_from(amount).map_err(|_| InterpretError::AmountOverflow { amount })
}

/// Interprets one call trace into balance deltas and payments
///
/// Runs a single pre-order traversal; both artifacts are built in the same
/// pass. A handler failure is fatal to the whole run — partial state would
/// be misleading — but it does not cut the traversal short: sibling handlers
/// and sibling subtrees are still processed, and the first failure is
/// surfaced once the walk completes. The trace is read-only and nothing is
/// shared across invocations.
pub fn interpret(
    trace: &CallTrace,
    config: &ChainConfig,
) -> Result<(StateChange, Vec<Payment>), InterpretError> {
    let mut run = Interpretation::new(config);
    walk(&mut run, trace, None);
    match run.failure {
        Some(error) => Err(error),
        None => Ok((run.state, run.payments)),
    }
}

fn walk(run: &mut Interpretation, node: &CallTrace, parent: Option<(Address, Address)>) {
    // An errored node fails its whole subtree: nothing it did took effect.
    if node.is_failed() {
        return;
    }

    if node.kind == CallKind::Call {
        let replayed = parent == Some((node.from, node.to))
            && !run.config().is_precompile(node.from)
            && !run.config().is_precompile(node.to);
        if replayed {
            tracing::trace!(
                from = %node.from,
                to = %node.to,
                "suppressing dispatch for replayed internal call"
            );
        } else {
            for handler in handlers::lookup(node) {
                if let Err(error) = (handler.handle)(run, node) {
                    tracing::error!(%error, "call handler failed");
                    run.failure.get_or_insert(error);
                }
            }
        }
    }

    if matches!(node.kind, CallKind::Call | CallKind::DelegateCall) {
        for child in &node.calls {
            walk(run, child, Some((node.from, node.to)));
        }
    }
}

/// Interprets a trace and returns only the balance delta map
pub fn interpret_state(trace: &CallTrace) -> Result<StateChange, InterpretError> {
    interpret_state_with_config(trace, &ChainConfig::default())
}

/// [`interpret_state`] with an explicit chain configuration
pub fn interpret_state_with_config(
    trace: &CallTrace,
    config: &ChainConfig,
) -> Result<StateChange, InterpretError> {
    interpret(trace, config).map(|(state, _)| state)
}

/// Interprets a trace and returns only the ordered payment list
pub fn interpret_payments(trace: &CallTrace) -> Result<Vec<Payment>, InterpretError> {
    interpret_payments_with_config(trace, &ChainConfig::default())
}

/// [`interpret_payments`] with an explicit chain configuration
pub fn interpret_payments_with_config(
    trace: &CallTrace,
    config: &ChainConfig,
) -> Result<Vec<Payment>, InterpretError> {
    interpret(trace, config).map(|(_, payments)| payments)
}
