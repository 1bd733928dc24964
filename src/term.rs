//! Terms: finite, non-empty sequences of symbols.
//!
//! Two representations differ only in ownership. [`MutableTerm`] is the
//! owned working form used during simplification and at rule entry;
//! [`Term`] is an interned id handed out by the [`TermStore`], used in
//! rules, homotopy-generator basepoints, and symbol substitutions so
//! term equality is id equality.

use crate::context::RewriteContext;
use crate::protocol::ProtocolGraph;
use crate::symbol::{self, format_symbol, NameId, Symbol, SymbolData};
use hashbrown::HashMap;
use parking_lot::RwLock;
use rustc_hash::FxHasher;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

type Symbols = SmallVec<[Symbol; 8]>;

/// Unique identifier for an interned term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term(u32);

impl Term {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        Term(raw)
    }
}

/// An owned, mutable term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MutableTerm {
    symbols: Symbols,
}

impl MutableTerm {
    /// Create an empty term. Empty terms exist only transiently while a
    /// term is being built; the store refuses to intern them.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_symbols(symbols: &[Symbol]) -> Self {
        Self {
            symbols: SmallVec::from_slice(symbols),
        }
    }

    pub fn push(&mut self, symbol: Symbol) {
        self.symbols.push(symbol);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }

    /// Replace `self[from..to]` with `replacement`.
    pub fn rewrite_sub_term(&mut self, from: usize, to: usize, replacement: &[Symbol]) {
        debug_assert!(from <= to && to <= self.symbols.len());
        let mut rewritten =
            Symbols::with_capacity(self.symbols.len() - (to - from) + replacement.len());
        rewritten.extend_from_slice(&self.symbols[..from]);
        rewritten.extend_from_slice(replacement);
        rewritten.extend_from_slice(&self.symbols[to..]);
        self.symbols = rewritten;
    }

    /// The reduction order: shortlex over the symbol order.
    ///
    /// Shorter terms are smaller; equal-length terms compare pointwise.
    /// Well-founded and stable under appending a common prefix or
    /// suffix, so every oriented rule strictly decreases the terms it
    /// rewrites.
    pub fn compare(
        &self,
        other: &MutableTerm,
        graph: &ProtocolGraph,
        ctx: &RewriteContext,
    ) -> Ordering {
        if self.len() != other.len() {
            return self.len().cmp(&other.len());
        }
        for (a, b) in self.iter().zip(other.iter()) {
            let result = symbol::compare(*a, *b, graph, ctx);
            if result != Ordering::Equal {
                return result;
            }
        }
        Ordering::Equal
    }

    /// Protocols the term is anchored to: those of a leading protocol
    /// or associated-type symbol, none otherwise.
    pub fn root_protocols(&self, ctx: &RewriteContext) -> SmallVec<[NameId; 1]> {
        let Some(&first) = self.symbols.first() else {
            return SmallVec::new();
        };
        match ctx.symbols().data(first) {
            SymbolData::Protocol(proto) => {
                let mut protos = SmallVec::new();
                protos.push(proto);
                protos
            }
            SymbolData::AssociatedType { protocols, .. } => protocols,
            _ => SmallVec::new(),
        }
    }
}

impl std::ops::Index<usize> for MutableTerm {
    type Output = Symbol;

    fn index(&self, index: usize) -> &Symbol {
        &self.symbols[index]
    }
}

/// Number of shards for the hashcons map (power of 2 for fast modulo).
const NUM_SHARDS: usize = 16;

/// Thread-safe term store with hashconsing.
///
/// Guarantees:
/// - Structurally equal terms get the same `Term`
/// - A `Term` can be resolved back to its symbol sequence
pub struct TermStore {
    /// Central storage of all terms, indexed by `Term`.
    nodes: RwLock<Vec<Symbols>>,
    /// Sharded hashcons maps for reducing contention.
    shards: [RwLock<HashMap<Symbols, Term>>; NUM_SHARDS],
    /// Counter for generating unique ids.
    next_id: AtomicU32,
}

impl TermStore {
    /// Create a new empty term store.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|_| RwLock::new(HashMap::new()));
        Self {
            nodes: RwLock::new(Vec::new()),
            shards,
            next_id: AtomicU32::new(0),
        }
    }

    /// Intern a mutable term, returning its `Term`.
    /// If an equal term was interned before, returns the existing id.
    ///
    /// # Panics
    ///
    /// Panics when `term` is empty; terms are non-empty by definition.
    pub fn get(&self, term: &MutableTerm) -> Term {
        assert!(!term.is_empty(), "cannot intern an empty term");
        let key = &term.symbols;
        let shard_idx = Self::shard_index(key);
        let shard = &self.shards[shard_idx];

        // Fast path: check if the term exists (read lock)
        {
            let map = shard.read();
            if let Some(&id) = map.get(key) {
                return id;
            }
        }

        // Slow path: need to insert (write lock)
        let mut map = shard.write();

        // Double-check after acquiring write lock
        if let Some(&id) = map.get(key) {
            return id;
        }

        let id = Term(self.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        {
            let mut nodes = self.nodes.write();
            let idx = id.0 as usize;
            if nodes.len() <= idx {
                nodes.resize(idx + 1, Symbols::new());
            }
            nodes[idx] = key.clone();
        }
        map.insert(key.clone(), id);
        id
    }

    /// Resolve a `Term` back to an owned mutable term.
    /// Returns `None` for ids from another store.
    pub fn resolve(&self, id: Term) -> Option<MutableTerm> {
        let nodes = self.nodes.read();
        nodes
            .get(id.0 as usize)
            .map(|symbols| MutableTerm {
                symbols: symbols.clone(),
            })
    }

    /// Infallible resolve for ids produced by this store.
    pub(crate) fn term(&self, id: Term) -> MutableTerm {
        MutableTerm {
            symbols: self.nodes.read()[id.0 as usize].clone(),
        }
    }

    /// Get the shard index for a key (for hashcons distribution).
    fn shard_index(key: &Symbols) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }
}

impl Default for TermStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a term in dotted form, e.g. `τ_0_0.[P:A].B`.
pub fn format_term(term: &MutableTerm, ctx: &RewriteContext) -> Result<String, String> {
    format_symbols(term.symbols(), ctx)
}

/// Render a symbol slice in dotted form.
pub fn format_symbols(symbols: &[Symbol], ctx: &RewriteContext) -> Result<String, String> {
    let parts = symbols
        .iter()
        .map(|&symbol| format_symbol(symbol, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("."))
}

#[cfg(test)]
#[path = "tests/term.rs"]
mod tests;
