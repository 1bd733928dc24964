//! The typed symbol alphabet.
//!
//! Symbols are interned: structurally equal payloads receive the same
//! [`Symbol`] id, so symbol equality is id equality. Payloads live in
//! the [`SymbolStore`] owned by the interning context.

use crate::context::RewriteContext;
use crate::protocol::ProtocolGraph;
use crate::term::{format_term, Term};
use hashbrown::HashMap;
use lasso::{Spur, ThreadedRodeo};
use parking_lot::RwLock;
use rustc_hash::FxHasher;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

/// Interned name string.
pub type NameId = Spur;

/// Unique identifier for an interned symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        Symbol(raw)
    }
}

/// Symbol kinds, declared in precedence order: the derived `Ord` is the
/// kind-level part of the symbol order, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    Protocol,
    AssociatedType,
    GenericParam,
    Name,
    Layout,
    Superclass,
    Concrete,
}

/// Interned payload of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolData {
    /// An unresolved member name.
    Name(NameId),
    /// A protocol, printed `[P]`.
    Protocol(NameId),
    /// An associated type, printed `[P1&…&Pn:A]`. The protocol set is
    /// sorted by name and non-empty; more than one protocol means a
    /// merged associated type.
    AssociatedType {
        protocols: SmallVec<[NameId; 1]>,
        name: NameId,
    },
    /// A generic parameter, printed `τ_d_i`.
    GenericParam { depth: u32, index: u32 },
    /// A layout constraint, printed `[layout: L]`.
    Layout(NameId),
    /// A superclass constraint, printed `[superclass: C<σ…>]`. The
    /// substitutions are interned terms embedded in the symbol.
    Superclass {
        class: NameId,
        substitutions: SmallVec<[Term; 2]>,
    },
    /// A concrete type constraint, printed `[concrete: C<σ…>]`.
    Concrete {
        ty: NameId,
        substitutions: SmallVec<[Term; 2]>,
    },
}

impl SymbolData {
    pub fn kind(&self) -> SymbolKind {
        match self {
            SymbolData::Name(_) => SymbolKind::Name,
            SymbolData::Protocol(_) => SymbolKind::Protocol,
            SymbolData::AssociatedType { .. } => SymbolKind::AssociatedType,
            SymbolData::GenericParam { .. } => SymbolKind::GenericParam,
            SymbolData::Layout(_) => SymbolKind::Layout,
            SymbolData::Superclass { .. } => SymbolKind::Superclass,
            SymbolData::Concrete { .. } => SymbolKind::Concrete,
        }
    }
}

/// Number of shards for the hashcons map (power of 2 for fast modulo).
const NUM_SHARDS: usize = 16;

/// Thread-safe interning store for symbols and their name strings.
///
/// Guarantees:
/// - Structurally equal payloads get the same `Symbol`
/// - A `Symbol` can be resolved back to its payload
/// - Name strings intern through the same store
pub struct SymbolStore {
    names: ThreadedRodeo,
    /// Central storage of all payloads, indexed by `Symbol`.
    nodes: RwLock<Vec<SymbolData>>,
    /// Sharded hashcons maps for reducing contention.
    shards: [RwLock<HashMap<SymbolData, Symbol>>; NUM_SHARDS],
    /// Counter for generating unique ids.
    next_id: AtomicU32,
}

impl SymbolStore {
    /// Create a new empty symbol store.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|_| RwLock::new(HashMap::new()));
        Self {
            names: ThreadedRodeo::new(),
            nodes: RwLock::new(Vec::new()),
            shards,
            next_id: AtomicU32::new(0),
        }
    }

    /// Intern a name string.
    pub fn name_id(&self, name: &str) -> NameId {
        self.names.get_or_intern(name)
    }

    /// Resolve an interned name back to its string.
    /// Returns `None` for ids from another store.
    pub fn resolve_name(&self, id: NameId) -> Option<&str> {
        self.names.try_resolve(&id)
    }

    /// Infallible name lookup for ids produced by this store.
    pub(crate) fn name_str(&self, id: NameId) -> &str {
        self.names.resolve(&id)
    }

    /// Intern a payload, returning its `Symbol`.
    /// If the payload already exists, returns the existing id.
    fn intern(&self, data: SymbolData) -> Symbol {
        let shard_idx = Self::shard_index(&data);
        let shard = &self.shards[shard_idx];

        // Fast path: check if the payload exists (read lock)
        {
            let map = shard.read();
            if let Some(&id) = map.get(&data) {
                return id;
            }
        }

        // Slow path: need to insert (write lock)
        let mut map = shard.write();

        // Double-check after acquiring write lock
        if let Some(&id) = map.get(&data) {
            return id;
        }

        let id = Symbol(self.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        {
            let mut nodes = self.nodes.write();
            let idx = id.0 as usize;
            if nodes.len() <= idx {
                nodes.resize(idx + 1, SymbolData::GenericParam { depth: 0, index: 0 });
            }
            nodes[idx] = data.clone();
        }
        map.insert(data, id);
        id
    }

    /// Resolve a `Symbol` to its payload.
    /// Returns `None` for ids from another store.
    pub fn resolve(&self, symbol: Symbol) -> Option<SymbolData> {
        self.nodes.read().get(symbol.0 as usize).cloned()
    }

    /// Infallible payload lookup for ids produced by this store.
    pub(crate) fn data(&self, symbol: Symbol) -> SymbolData {
        self.nodes.read()[symbol.0 as usize].clone()
    }

    /// Kind of `symbol`.
    pub fn kind(&self, symbol: Symbol) -> SymbolKind {
        self.data(symbol).kind()
    }

    /// Whether `symbol` is a superclass or concrete-type constraint.
    pub fn is_superclass_or_concrete_type(&self, symbol: Symbol) -> bool {
        matches!(
            self.kind(symbol),
            SymbolKind::Superclass | SymbolKind::Concrete
        )
    }

    /// Intern a name symbol.
    pub fn name(&self, name: &str) -> Symbol {
        let name = self.name_id(name);
        self.intern(SymbolData::Name(name))
    }

    /// Intern a protocol symbol.
    pub fn protocol(&self, name: &str) -> Symbol {
        let name = self.name_id(name);
        self.intern(SymbolData::Protocol(name))
    }

    /// Intern an associated type symbol. The protocol list must be
    /// non-empty; it is sorted and deduplicated here so equal sets
    /// intern to the same symbol.
    pub fn associated_type(&self, protocols: &[&str], name: &str) -> Symbol {
        assert!(
            !protocols.is_empty(),
            "an associated type needs at least one protocol"
        );
        let mut sorted: Vec<&str> = protocols.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let protocols: SmallVec<[NameId; 1]> =
            sorted.iter().map(|proto| self.name_id(proto)).collect();
        let name = self.name_id(name);
        self.intern(SymbolData::AssociatedType { protocols, name })
    }

    /// Intern a generic parameter symbol.
    pub fn generic_param(&self, depth: u32, index: u32) -> Symbol {
        self.intern(SymbolData::GenericParam { depth, index })
    }

    /// Intern a layout constraint symbol.
    pub fn layout(&self, name: &str) -> Symbol {
        let name = self.name_id(name);
        self.intern(SymbolData::Layout(name))
    }

    /// Intern a superclass constraint symbol.
    pub fn superclass(&self, class: &str, substitutions: &[Term]) -> Symbol {
        let class = self.name_id(class);
        self.superclass_with(class, SmallVec::from_slice(substitutions))
    }

    /// Intern a concrete type constraint symbol.
    pub fn concrete(&self, ty: &str, substitutions: &[Term]) -> Symbol {
        let ty = self.name_id(ty);
        self.concrete_with(ty, SmallVec::from_slice(substitutions))
    }

    pub(crate) fn superclass_with(
        &self,
        class: NameId,
        substitutions: SmallVec<[Term; 2]>,
    ) -> Symbol {
        self.intern(SymbolData::Superclass {
            class,
            substitutions,
        })
    }

    pub(crate) fn concrete_with(&self, ty: NameId, substitutions: SmallVec<[Term; 2]>) -> Symbol {
        self.intern(SymbolData::Concrete { ty, substitutions })
    }

    /// Get the shard index for a payload (for hashcons distribution).
    fn shard_index(data: &SymbolData) -> usize {
        let mut hasher = FxHasher::default();
        data.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }
}

impl Default for SymbolStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Total order on symbols, parameterized by the protocol precedence in
/// `graph`.
///
/// Kinds compare by [`SymbolKind`] order; ties break within the kind:
/// protocols by graph precedence, associated types by protocol set then
/// name, generic parameters by depth then index, names and layouts by
/// string, superclass and concrete types by head name then
/// substitutions.
pub fn compare(a: Symbol, b: Symbol, graph: &ProtocolGraph, ctx: &RewriteContext) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let store = ctx.symbols();
    let data_a = store.data(a);
    let data_b = store.data(b);
    let by_kind = data_a.kind().cmp(&data_b.kind());
    if by_kind != Ordering::Equal {
        return by_kind;
    }
    match (data_a, data_b) {
        (SymbolData::Name(x), SymbolData::Name(y))
        | (SymbolData::Layout(x), SymbolData::Layout(y)) => {
            store.name_str(x).cmp(store.name_str(y))
        }
        (SymbolData::Protocol(x), SymbolData::Protocol(y)) => graph.compare_protocols(x, y, ctx),
        (
            SymbolData::AssociatedType {
                protocols: protos_a,
                name: name_a,
            },
            SymbolData::AssociatedType {
                protocols: protos_b,
                name: name_b,
            },
        ) => compare_protocol_sets(&protos_a, &protos_b, graph, ctx)
            .then_with(|| store.name_str(name_a).cmp(store.name_str(name_b))),
        (
            SymbolData::GenericParam {
                depth: depth_a,
                index: index_a,
            },
            SymbolData::GenericParam {
                depth: depth_b,
                index: index_b,
            },
        ) => depth_a.cmp(&depth_b).then(index_a.cmp(&index_b)),
        (
            SymbolData::Superclass {
                class: head_a,
                substitutions: subs_a,
            },
            SymbolData::Superclass {
                class: head_b,
                substitutions: subs_b,
            },
        )
        | (
            SymbolData::Concrete {
                ty: head_a,
                substitutions: subs_a,
            },
            SymbolData::Concrete {
                ty: head_b,
                substitutions: subs_b,
            },
        ) => compare_type_constraints(head_a, &subs_a, head_b, &subs_b, graph, ctx),
        _ => unreachable!("kind ranks were already compared"),
    }
}

/// Order on sorted protocol sets: a set constraining more protocols is
/// smaller; equal-sized sets compare pointwise.
fn compare_protocol_sets(
    a: &[NameId],
    b: &[NameId],
    graph: &ProtocolGraph,
    ctx: &RewriteContext,
) -> Ordering {
    if a.len() != b.len() {
        return b.len().cmp(&a.len());
    }
    for (x, y) in a.iter().zip(b.iter()) {
        let result = graph.compare_protocols(*x, *y, ctx);
        if result != Ordering::Equal {
            return result;
        }
    }
    Ordering::Equal
}

fn compare_type_constraints(
    head_a: NameId,
    subs_a: &[Term],
    head_b: NameId,
    subs_b: &[Term],
    graph: &ProtocolGraph,
    ctx: &RewriteContext,
) -> Ordering {
    let store = ctx.symbols();
    let by_head = store.name_str(head_a).cmp(store.name_str(head_b));
    if by_head != Ordering::Equal {
        return by_head;
    }
    if subs_a.len() != subs_b.len() {
        return subs_a.len().cmp(&subs_b.len());
    }
    for (x, y) in subs_a.iter().zip(subs_b.iter()) {
        let term_x = ctx.term(*x);
        let term_y = ctx.term(*y);
        let result = term_x.compare(&term_y, graph, ctx);
        if result != Ordering::Equal {
            return result;
        }
    }
    Ordering::Equal
}

/// Render a symbol in the textual form used by `dump`.
pub fn format_symbol(symbol: Symbol, ctx: &RewriteContext) -> Result<String, String> {
    let store = ctx.symbols();
    let data = store
        .resolve(symbol)
        .ok_or_else(|| format!("unknown symbol id {}", symbol.raw()))?;
    let name = |id: NameId| -> Result<String, String> {
        store
            .resolve_name(id)
            .map(str::to_owned)
            .ok_or_else(|| format!("unknown name id in symbol {}", symbol.raw()))
    };
    match data {
        SymbolData::Name(n) => name(n),
        SymbolData::Protocol(p) => Ok(format!("[{}]", name(p)?)),
        SymbolData::AssociatedType { protocols, name: n } => {
            let protos = protocols
                .iter()
                .map(|&p| name(p))
                .collect::<Result<Vec<_>, _>>()?
                .join("&");
            Ok(format!("[{}:{}]", protos, name(n)?))
        }
        SymbolData::GenericParam { depth, index } => Ok(format!("τ_{}_{}", depth, index)),
        SymbolData::Layout(l) => Ok(format!("[layout: {}]", name(l)?)),
        SymbolData::Superclass {
            class,
            substitutions,
        } => format_type_constraint("superclass", name(class)?, &substitutions, ctx),
        SymbolData::Concrete { ty, substitutions } => {
            format_type_constraint("concrete", name(ty)?, &substitutions, ctx)
        }
    }
}

fn format_type_constraint(
    tag: &str,
    head: String,
    substitutions: &[Term],
    ctx: &RewriteContext,
) -> Result<String, String> {
    if substitutions.is_empty() {
        return Ok(format!("[{}: {}]", tag, head));
    }
    let subs = substitutions
        .iter()
        .map(|&term| {
            let term = ctx
                .terms()
                .resolve(term)
                .ok_or_else(|| "unknown term id in symbol substitution".to_string())?;
            format_term(&term, ctx)
        })
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");
    Ok(format!("[{}: {}<{}>]", tag, head, subs))
}
