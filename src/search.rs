//! Read-only call-tree queries
//!
//! Pre-order searches over a canonical call trace. Errored nodes are skipped
//! and never descended into, mirroring the walker's view of a failed
//! subtree. Each invocation threads its own match counter through the
//! recursion; there is no shared state between calls.

use alloy::primitives::{Address, Selector};

use crate::types::{CallKind, CallTrace};

/// Match criteria for call-tree searches
///
/// All unset fields match anything; all set fields must hold at once.
#[derive(Debug, Clone, Default)]
pub struct CallFilter {
    /// Target address the call must have
    pub to: Option<Address>,
    /// Call scheme the node must have
    pub kind: Option<CallKind>,
    /// Selectors the call data may start with (any one matches)
    pub selectors: Option<Vec<Selector>>,
}

impl CallFilter {
    fn matches(&self, trace: &CallTrace) -> bool {
        if self.to.is_some_and(|to| trace.to != to) {
            return false;
        }
        if self.kind.is_some_and(|kind| trace.kind != kind) {
            return false;
        }
        if let Some(selectors) = &self.selectors {
            match trace.selector() {
                Some(selector) => {
                    if !selectors.contains(&selector) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

/// Finds the `n`-th (0-indexed) call matching `filter` in pre-order
pub fn find_nth_call<'a>(
    trace: &'a CallTrace,
    filter: &CallFilter,
    n: usize,
) -> Option<&'a CallTrace> {
    fn search<'a>(
        node: &'a CallTrace,
        filter: &CallFilter,
        n: usize,
        seen: &mut usize,
    ) -> Option<&'a CallTrace> {
        if node.is_failed() {
            return None;
        }
        if filter.matches(node) {
            if *seen == n {
                return Some(node);
            }
            *seen += 1;
        }
        node.calls
            .iter()
            .find_map(|child| search(child, filter, n, seen))
    }

    let mut seen = 0;
    search(trace, filter, n, &mut seen)
}

/// Collects every call matching `filter`, in pre-order
pub fn find_all_calls<'a>(trace: &'a CallTrace, filter: &CallFilter) -> Vec<&'a CallTrace> {
    fn collect<'a>(node: &'a CallTrace, filter: &CallFilter, out: &mut Vec<&'a CallTrace>) {
        if node.is_failed() {
            return;
        }
        if filter.matches(node) {
            out.push(node);
        }
        for child in &node.calls {
            collect(child, filter, out);
        }
    }

    let mut out = Vec::new();
    collect(trace, filter, &mut out);
    out
}
