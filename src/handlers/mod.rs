//! Selector-keyed call handler dispatch
//!
//! The registry maps a 4-byte function selector to the handlers that know
//! how to interpret calls carrying it, plus a generic partition of handlers
//! that apply to every call regardless of input. It acts as a small static
//! dispatch table: the selector set is closed at registration time, so a
//! plain map of fn pointers is all the machinery needed.
//!
//! # Process-wide state
//!
//! The registry is the only process-wide state in the crate. It is built
//! lazily exactly once behind a [`Lazy`] guard (serializing concurrent
//! first-time initialization) and is effectively immutable afterwards;
//! [`register_handler`] is the one sanctioned way to extend it with support
//! for additional token standards.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use alloy::primitives::Selector;
use once_cell::sync::Lazy;

use crate::errors::InterpretError;
use crate::interpreter::Interpretation;
use crate::types::CallTrace;

mod transfers;

/// Interprets one call node, recording balance adjustments and payments
///
/// Handlers never inspect sibling or parent nodes; everything they need is
/// the node itself and the shared run state.
pub type HandlerFn = fn(&mut Interpretation, &CallTrace) -> Result<(), InterpretError>;

/// One registered call handler
#[derive(Debug, Clone, Copy)]
pub struct CallHandler {
    /// Selector this handler is keyed on; `None` makes it generic
    pub selector: Option<Selector>,
    /// Interpretation function
    pub handle: HandlerFn,
}

/// Two-partition dispatch table: generic handlers plus selector buckets
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    generic: Vec<CallHandler>,
    by_selector: HashMap<Selector, Vec<CallHandler>>,
}

impl HandlerRegistry {
    fn with_builtins() -> Self {
        let mut registry = Self::default();
        for handler in transfers::builtin_handlers() {
            registry.register(handler);
        }
        tracing::debug!(
            generic = registry.generic.len(),
            selectors = registry.by_selector.len(),
            "built call handler registry"
        );
        registry
    }

    fn register(&mut self, handler: CallHandler) {
        match handler.selector {
            None => self.generic.push(handler),
            Some(selector) => self.by_selector.entry(selector).or_default().push(handler),
        }
    }

    /// Handlers applicable to `trace`: generic first, then the selector
    /// bucket in registration order
    ///
    /// Empty or short input yields no selector match, but generic handlers
    /// still apply.
    fn lookup(&self, trace: &CallTrace) -> Vec<CallHandler> {
        let mut handlers = self.generic.clone();
        if let Some(bucket) = trace.selector().and_then(|s| self.by_selector.get(&s)) {
            handlers.extend_from_slice(bucket);
        }
        handlers
    }
}

static REGISTRY: Lazy<RwLock<HandlerRegistry>> =
    Lazy::new(|| RwLock::new(HandlerRegistry::with_builtins()));

/// Registers an additional call handler
///
/// Extension point for token standards the builtin set does not cover. The
/// builtin handlers are installed exactly once on first use and are never
/// re-registered; callers are responsible for not registering the same
/// handler twice.
pub fn register_handler(handler: CallHandler) {
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(handler);
}

/// Resolves the handlers applicable to one call node
pub(crate) fn lookup(trace: &CallTrace) -> Vec<CallHandler> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .lookup(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;
    use serde_json::json;

    fn call_with_input(input: Bytes) -> CallTrace {
        let mut trace: CallTrace = serde_json::from_value(json!({
            "type": "CALL",
            "from": "0x3ee18b2214aff97000d974cf647e7c347e8fa585",
            "to": "0xdac17f958d2ee523a2206206994597c13d831ec7",
        }))
        .unwrap();
        trace.input = input;
        trace
    }

    #[test]
    fn empty_input_matches_only_generics() {
        let registry = HandlerRegistry::with_builtins();
        let handlers = registry.lookup(&call_with_input(Bytes::new()));
        assert_eq!(handlers.len(), registry.generic.len());
        assert!(handlers.iter().all(|h| h.selector.is_none()));
    }

    #[test]
    fn selector_bucket_follows_generics() {
        let registry = HandlerRegistry::with_builtins();
        // transfer(address,uint256)
        let mut input = vec![0xa9, 0x05, 0x9c, 0xbb];
        input.extend_from_slice(&[0u8; 64]);
        let handlers = registry.lookup(&call_with_input(input.into()));

        assert!(handlers.len() > registry.generic.len());
        let (generics, keyed) = handlers.split_at(registry.generic.len());
        assert!(generics.iter().all(|h| h.selector.is_none()));
        assert!(keyed
            .iter()
            .all(|h| h.selector == Some(Selector::from([0xa9, 0x05, 0x9c, 0xbb]))));
    }

    #[test]
    fn unrecognized_selector_matches_only_generics() {
        let registry = HandlerRegistry::with_builtins();
        let handlers =
            registry.lookup(&call_with_input(vec![0xde, 0xad, 0xbe, 0xef].into()));
        assert_eq!(handlers.len(), registry.generic.len());
    }
}
