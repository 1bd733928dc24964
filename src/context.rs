//! The interning context shared by rewrite systems.

use crate::metrics::Histogram;
use crate::symbol::{Symbol, SymbolData, SymbolStore};
use crate::term::{MutableTerm, Term, TermStore};
use smallvec::SmallVec;
use std::ops::{BitOr, BitOrAssign};

/// Debug output selector. A system snapshots the context's flags at
/// construction and may locally enable more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugFlags(u8);

impl DebugFlags {
    /// Trace rule addition.
    pub const ADD: DebugFlags = DebugFlags(1);
    /// Trace term simplification.
    pub const SIMPLIFY: DebugFlags = DebugFlags(1 << 1);
    /// Trace post-completion rule reduction.
    pub const COMPLETION: DebugFlags = DebugFlags(1 << 2);
    /// Trace associated-type merge candidates.
    pub const MERGE: DebugFlags = DebugFlags(1 << 3);

    pub fn contains(self, flags: DebugFlags) -> bool {
        self.0 & flags.0 == flags.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for DebugFlags {
    type Output = DebugFlags;

    fn bitor(self, rhs: DebugFlags) -> DebugFlags {
        DebugFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for DebugFlags {
    fn bitor_assign(&mut self, rhs: DebugFlags) {
        self.0 |= rhs.0;
    }
}

/// Interning context: the symbol and term stores, debug options, and
/// the histogram sinks systems update at teardown.
///
/// The context is internally synchronized, so one context may be shared
/// by several systems (or threads) and must outlive all of them. A
/// system borrows it for its whole lifetime.
pub struct RewriteContext {
    symbols: SymbolStore,
    terms: TermStore,
    debug: DebugFlags,
    /// Fan-out of every rule-trie node, accumulated over dropped systems.
    pub rule_trie_histogram: Histogram,
    /// Fan-out of the rule-trie root, accumulated over dropped systems.
    pub rule_trie_root_histogram: Histogram,
}

impl RewriteContext {
    pub fn new() -> Self {
        Self::with_debug_flags(DebugFlags::default())
    }

    pub fn with_debug_flags(debug: DebugFlags) -> Self {
        Self {
            symbols: SymbolStore::new(),
            terms: TermStore::new(),
            debug,
            rule_trie_histogram: Histogram::new(),
            rule_trie_root_histogram: Histogram::new(),
        }
    }

    pub fn symbols(&self) -> &SymbolStore {
        &self.symbols
    }

    pub fn terms(&self) -> &TermStore {
        &self.terms
    }

    pub fn debug_flags(&self) -> DebugFlags {
        self.debug
    }

    /// Infallible term resolve for ids produced by this context.
    pub(crate) fn term(&self, id: Term) -> MutableTerm {
        self.terms.term(id)
    }

    /// Apply `f` to each term embedded in a superclass or concrete-type
    /// symbol, re-interning the symbol if anything changed. Other kinds
    /// pass through untouched.
    pub fn transform_concrete_substitutions<F>(&self, symbol: Symbol, f: F) -> Symbol
    where
        F: FnMut(Term) -> Term,
    {
        match self.symbols.data(symbol) {
            SymbolData::Superclass {
                class,
                substitutions,
            } => {
                let transformed: SmallVec<[Term; 2]> = substitutions.iter().copied().map(f).collect();
                if transformed == substitutions {
                    symbol
                } else {
                    self.symbols.superclass_with(class, transformed)
                }
            }
            SymbolData::Concrete { ty, substitutions } => {
                let transformed: SmallVec<[Term; 2]> = substitutions.iter().copied().map(f).collect();
                if transformed == substitutions {
                    symbol
                } else {
                    self.symbols.concrete_with(ty, transformed)
                }
            }
            _ => symbol,
        }
    }
}

impl Default for RewriteContext {
    fn default() -> Self {
        Self::new()
    }
}
