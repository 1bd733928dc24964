//! Protocol classification data backing the reduction order.
//!
//! The frontend builds a [`ProtocolGraph`] from the requirements it has
//! resolved and hands it to the rewrite system by value. The core only
//! needs the precedence between protocols; everything else about a
//! protocol stays on the frontend side.

use crate::context::RewriteContext;
use crate::symbol::NameId;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// Per-protocol classification record.
#[derive(Debug, Clone, Default)]
struct ProtocolInfo {
    /// Protocols this one inherits, excluding itself. Direct until
    /// [`ProtocolGraph::compute_inherited_protocols`] closes the
    /// relation transitively.
    inherited: SmallVec<[NameId; 2]>,
}

/// Classification data for the protocols a rewrite system mentions.
#[derive(Debug, Clone, Default)]
pub struct ProtocolGraph {
    info: FxHashMap<NameId, ProtocolInfo>,
}

impl ProtocolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol together with its directly inherited
    /// protocols. Self-inheritance and repeats are ignored.
    pub fn add_protocol<I>(&mut self, proto: NameId, inherited: I)
    where
        I: IntoIterator<Item = NameId>,
    {
        let entry = self.info.entry(proto).or_default();
        for parent in inherited {
            if parent != proto && !entry.inherited.contains(&parent) {
                entry.inherited.push(parent);
            }
        }
    }

    /// Close the inheritance relation transitively.
    ///
    /// Must run after the last `add_protocol` call and before the graph
    /// is used for comparisons.
    pub fn compute_inherited_protocols(&mut self) {
        let protocols: Vec<NameId> = self.info.keys().copied().collect();
        for proto in protocols {
            let mut all: SmallVec<[NameId; 2]> = SmallVec::new();
            let mut seen: FxHashSet<NameId> = FxHashSet::default();
            seen.insert(proto);
            let mut stack: Vec<NameId> = match self.info.get(&proto) {
                Some(info) => info.inherited.to_vec(),
                None => continue,
            };
            while let Some(parent) = stack.pop() {
                if !seen.insert(parent) {
                    continue;
                }
                all.push(parent);
                if let Some(info) = self.info.get(&parent) {
                    stack.extend(info.inherited.iter().copied());
                }
            }
            if let Some(info) = self.info.get_mut(&proto) {
                info.inherited = all;
            }
        }
    }

    /// Number of protocols `proto` inherits. Unknown protocols inherit
    /// nothing.
    pub fn inherited_count(&self, proto: NameId) -> usize {
        self.info.get(&proto).map_or(0, |info| info.inherited.len())
    }

    /// Precedence between protocols for the symbol order.
    ///
    /// A protocol inheriting more protocols is smaller, so rules orient
    /// from less refined towards more refined protocols. Ties break by
    /// name.
    pub fn compare_protocols(&self, a: NameId, b: NameId, ctx: &RewriteContext) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let count_a = self.inherited_count(a);
        let count_b = self.inherited_count(b);
        if count_a != count_b {
            return count_b.cmp(&count_a);
        }
        ctx.symbols().name_str(a).cmp(ctx.symbols().name_str(b))
    }
}
