//! Prefix index from rule left-hand sides to rule ids.

use crate::metrics::Histogram;
use crate::symbol::Symbol;
use crate::system::RuleId;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct TrieNode {
    /// Rule whose left-hand side ends at this node, if any.
    rule: Option<RuleId>,
    children: FxHashMap<Symbol, u32>,
}

/// Prefix tree keyed by symbol sequences, valued by rule ids.
///
/// Nodes live in an arena vector; node 0 is the root. The trie never
/// removes nodes: rule deletion is a tombstone in the rule table, and a
/// stale id at a key is only ever superseded by inserting a replacement
/// rule with the same left-hand side.
#[derive(Debug)]
pub struct RuleTrie {
    nodes: Vec<TrieNode>,
}

impl RuleTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    /// Install `rule` at the exact key `key`, creating nodes as needed.
    ///
    /// Returns the id previously stored at that key, if any; the new id
    /// replaces it. Callers treat a returned id as a duplicate unless
    /// they are knowingly superseding a tombstoned rule.
    pub fn insert(&mut self, key: &[Symbol], rule: RuleId) -> Option<RuleId> {
        debug_assert!(!key.is_empty());
        let mut node = 0usize;
        for &symbol in key {
            node = match self.nodes[node].children.get(&symbol).copied() {
                Some(child) => child as usize,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(symbol, child as u32);
                    child
                }
            };
        }
        self.nodes[node].rule.replace(rule)
    }

    /// Shortest-match lookup: walk `key` from its start and return the
    /// first stored id on the way down. The key need not be consumed
    /// completely, so any rule whose left-hand side prefixes `key`
    /// can be returned.
    pub fn find(&self, key: &[Symbol]) -> Option<RuleId> {
        let mut node = 0usize;
        for symbol in key {
            match self.nodes[node].children.get(symbol) {
                Some(&child) => {
                    node = child as usize;
                    if let Some(rule) = self.nodes[node].rule {
                        return Some(rule);
                    }
                }
                None => break,
            }
        }
        None
    }

    /// Number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Record every node's fan-out into `histogram` and the root's
    /// fan-out into `root_histogram`.
    pub fn update_histograms(&self, histogram: &Histogram, root_histogram: &Histogram) {
        for node in &self.nodes {
            histogram.record(node.children.len());
        }
        root_histogram.record(self.nodes[0].children.len());
    }
}

impl Default for RuleTrie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/trie.rs"]
mod tests;
