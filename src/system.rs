//! The rewrite system: rule table, prefix index, homotopy generators.
//!
//! The completion procedure drives this type from the outside: it feeds
//! candidate equations to [`RewriteSystem::add_rule`], asks
//! [`RewriteSystem::simplify`] for normal forms, and once it claims
//! confluence runs [`RewriteSystem::simplify_rewrite_system`] to prune
//! the rule set.

use crate::context::{DebugFlags, RewriteContext};
use crate::path::{HomotopyGenerator, RewritePath, RewriteStep};
use crate::protocol::ProtocolGraph;
use crate::symbol::{Symbol, SymbolData, SymbolKind};
use crate::term::{format_term, MutableTerm, Term};
use crate::trie::RuleTrie;
use std::cmp::Ordering;

#[cfg(feature = "tracing")]
use crate::trace::{debug_span, trace};

/// Identifier of a rule in the table.
///
/// Ids are assigned in insertion order and never renumbered, so ids
/// captured in rewrite paths stay valid for the life of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        RuleId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// An oriented rewrite rule `lhs => rhs` with `lhs` greater in the
/// reduction order.
///
/// Rules are never removed. A rule that stops applying is tombstoned
/// with the `deleted` flag so historical paths can still resolve it.
#[derive(Debug, Clone)]
pub struct Rule {
    lhs: Term,
    rhs: Term,
    deleted: bool,
}

impl Rule {
    fn new(lhs: Term, rhs: Term) -> Self {
        Self {
            lhs,
            rhs,
            deleted: false,
        }
    }

    pub fn lhs(&self) -> Term {
        self.lhs
    }

    pub fn rhs(&self) -> Term {
        self.rhs
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn mark_deleted(&mut self) {
        debug_assert!(!self.deleted);
        self.deleted = true;
    }

    /// Render as `lhs => rhs`, with a `[deleted]` suffix for tombstones.
    pub fn format(&self, ctx: &RewriteContext) -> Result<String, String> {
        let lhs = ctx
            .terms()
            .resolve(self.lhs)
            .ok_or_else(|| "unknown term id in rule lhs".to_string())?;
        let rhs = ctx
            .terms()
            .resolve(self.rhs)
            .ok_or_else(|| "unknown term id in rule rhs".to_string())?;
        Ok(format!(
            "{} => {}{}",
            format_term(&lhs, ctx)?,
            format_term(&rhs, ctx)?,
            if self.deleted { " [deleted]" } else { "" }
        ))
    }
}

/// A rewrite system over the typed symbol alphabet.
///
/// Owns the rule table, the prefix index over rule left-hand sides, and
/// the list of homotopy generators. Borrows the interning context for
/// its whole lifetime and feeds trie statistics back into it on drop.
pub struct RewriteSystem<'ctx> {
    ctx: &'ctx RewriteContext,
    debug: DebugFlags,
    protos: ProtocolGraph,
    /// Append-only; ids are indices.
    rules: Vec<Rule>,
    trie: RuleTrie,
    /// Append-only list of recorded loops.
    homotopy_generators: Vec<HomotopyGenerator>,
    /// Pairs of rule sides that equate same-named associated types from
    /// different protocol sets. Consumed by the property-map pass.
    merged_associated_types: Vec<(Term, Term)>,
    /// Cleared when upstream has diagnosed malformed requirements, which
    /// weakens what `verify` may assume about right-hand sides.
    valid_input: bool,
}

impl<'ctx> RewriteSystem<'ctx> {
    /// Create an empty system bound to `ctx`.
    pub fn new(ctx: &'ctx RewriteContext) -> Self {
        Self {
            ctx,
            debug: ctx.debug_flags(),
            protos: ProtocolGraph::new(),
            rules: Vec::new(),
            trie: RuleTrie::new(),
            homotopy_generators: Vec::new(),
            merged_associated_types: Vec::new(),
            valid_input: true,
        }
    }

    /// Populate the system from the frontend's initial rule set.
    pub fn initialize(&mut self, rules: Vec<(MutableTerm, MutableTerm)>, graph: ProtocolGraph) {
        self.protos = graph;
        for (lhs, rhs) in rules {
            self.add_rule(lhs, rhs, None);
        }
    }

    pub fn context(&self) -> &'ctx RewriteContext {
        self.ctx
    }

    pub fn protocol_graph(&self) -> &ProtocolGraph {
        &self.protos
    }

    /// Look up a rule by id.
    ///
    /// # Panics
    ///
    /// Panics when `id` did not come from this system.
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn homotopy_generators(&self) -> &[HomotopyGenerator] {
        &self.homotopy_generators
    }

    pub fn merged_associated_type_candidates(&self) -> &[(Term, Term)] {
        &self.merged_associated_types
    }

    /// Weaken `verify` for input upstream has already diagnosed as
    /// malformed.
    pub fn mark_invalid_input(&mut self) {
        self.valid_input = false;
    }

    /// Add a rewrite rule, returning `true` if a new rule was appended.
    ///
    /// Both sides are simplified against the existing rules first; if
    /// they then coincide, the candidate is redundant and discarded,
    /// and this method returns `false`.
    ///
    /// When `path` records how the candidate was derived from existing
    /// rules, the derivation is closed into a homotopy generator whether
    /// or not a rule is appended.
    pub fn add_rule(
        &mut self,
        mut lhs: MutableTerm,
        mut rhs: MutableTerm,
        path: Option<&RewritePath>,
    ) -> bool {
        assert!(!lhs.is_empty());
        assert!(!rhs.is_empty());

        #[cfg(feature = "tracing")]
        let _span = debug_span!("add_rule", lhs_len = lhs.len(), rhs_len = rhs.len()).entered();

        if self.debug.contains(DebugFlags::ADD) {
            eprintln!(
                "# Adding rule {} == {}",
                self.display(&lhs),
                self.display(&rhs)
            );
        }

        // Simplify both sides as much as possible with the rules we have
        // so far; this avoids unnecessary work in the completion
        // procedure.
        let mut lhs_path = RewritePath::new();
        let mut rhs_path = RewritePath::new();
        self.simplify(&mut lhs, Some(&mut lhs_path));
        self.simplify(&mut rhs, Some(&mut rhs_path));

        let mut loop_path = RewritePath::new();
        if let Some(path) = path {
            // A path from the simplified lhs, back through the original
            // lhs, across the caller's derivation to the original rhs,
            // and forward to the simplified rhs.
            lhs_path.invert();
            loop_path.append(&lhs_path);
            loop_path.append(path);
            loop_path.append(&rhs_path);
        }

        let result = lhs.compare(&rhs, &self.protos, self.ctx);
        if result == Ordering::Equal {
            // The candidate is a consequence of existing rules. The path
            // assembled above already starts and ends at the same term.
            if path.is_some() {
                if self.debug.contains(DebugFlags::ADD) {
                    eprintln!(
                        "## Recorded trivial loop at {}: {}",
                        self.display(&lhs),
                        loop_path.format(&lhs, self).unwrap_or_else(|error| error)
                    );
                }
                let basepoint = self.ctx.terms().get(&lhs);
                self.record_homotopy_generator(basepoint, loop_path);
            }
            return false;
        }

        // Orient the rule so the left-hand side is the greater term.
        if result == Ordering::Less {
            std::mem::swap(&mut lhs, &mut rhs);
            loop_path.invert();
        }
        debug_assert_eq!(
            lhs.compare(&rhs, &self.protos, self.ctx),
            Ordering::Greater
        );

        if self.debug.contains(DebugFlags::ADD) {
            eprintln!(
                "## Simplified and oriented rule {} => {}",
                self.display(&lhs),
                self.display(&rhs)
            );
        }

        let new_rule_id = RuleId::from_index(self.rules.len());
        let uniqued_lhs = self.ctx.terms().get(&lhs);
        let uniqued_rhs = self.ctx.terms().get(&rhs);
        self.rules.push(Rule::new(uniqued_lhs, uniqued_rhs));

        if path.is_some() {
            // The path so far runs from the simplified lhs to the
            // simplified rhs; applying the new rule in reverse closes it.
            loop_path.add(RewriteStep::new(0, new_rule_id, true));
            if self.debug.contains(DebugFlags::ADD) {
                eprintln!(
                    "## Recorded non-trivial loop at {}: {}",
                    self.display(&lhs),
                    loop_path.format(&lhs, self).unwrap_or_else(|error| error)
                );
            }
            self.record_homotopy_generator(uniqued_lhs, loop_path);
        }

        if let Some(old_rule_id) = self.trie.insert(lhs.symbols(), new_rule_id) {
            self.duplicate_rule_abort(old_rule_id, &lhs);
        }

        #[cfg(feature = "tracing")]
        trace!(rule = new_rule_id.raw(), "appended rule");

        self.check_merged_associated_type(uniqued_lhs, uniqued_rhs);

        true
    }

    /// Reduce `term` to normal form by applying rules until fixed point,
    /// returning whether anything changed.
    ///
    /// Rewrites are applied leftmost-first, restarting the scan from the
    /// start after every hit since a rewrite shifts the positions behind
    /// it. On return, no live rule's left-hand side occurs anywhere in
    /// `term`; termination follows from the reduction order.
    ///
    /// When `path` is supplied, the steps taken are appended to it, so
    /// it ends non-empty exactly when the term changed.
    pub fn simplify(&self, term: &mut MutableTerm, path: Option<&mut RewritePath>) -> bool {
        #[cfg(feature = "tracing")]
        let _span = debug_span!("simplify", len = term.len()).entered();

        let mut path = path;
        let debug_simplify = self.debug.contains(DebugFlags::SIMPLIFY);
        let original = if debug_simplify {
            Some(term.clone())
        } else {
            None
        };
        let mut scratch = RewritePath::new();
        if debug_simplify && path.is_none() {
            path = Some(&mut scratch);
        }

        let mut changed = false;
        loop {
            let mut try_again = false;
            let mut from = 0;
            while from < term.len() {
                if let Some(rule_id) = self.trie.find(&term.symbols()[from..]) {
                    let rule = self.rule(rule_id);
                    if !rule.is_deleted() {
                        let lhs = self.ctx.term(rule.lhs());
                        let rhs = self.ctx.term(rule.rhs());
                        let to = from + lhs.len();
                        debug_assert_eq!(&term.symbols()[from..to], lhs.symbols());

                        term.rewrite_sub_term(from, to, rhs.symbols());

                        if let Some(path) = path.as_deref_mut() {
                            path.add(RewriteStep::new(from as u32, rule_id, false));
                        }

                        changed = true;
                        try_again = true;
                        break;
                    }
                }
                from += 1;
            }
            if !try_again {
                break;
            }
        }

        if let Some(original) = original {
            if changed {
                let derivation = path
                    .as_deref()
                    .map(|path| path.format(&original, self).unwrap_or_else(|error| error))
                    .unwrap_or_default();
                eprintln!("= Simplified {}: {}", self.display(term), derivation);
            } else {
                eprintln!("= Irreducible term: {}", self.display(term));
            }
        }

        debug_assert!(
            path.as_deref().map_or(true, |path| changed != path.is_empty()),
            "a simplification path is empty exactly when nothing changed"
        );
        changed
    }

    /// Simplify the terms embedded in a superclass or concrete-type
    /// symbol against the current rules.
    pub fn simplify_substitutions_in_symbol(&self, symbol: Symbol) -> Symbol {
        self.ctx.transform_concrete_substitutions(symbol, |term| {
            let mut substitution = self.ctx.term(term);
            if !self.simplify(&mut substitution, None) {
                return term;
            }
            self.ctx.terms().get(&substitution)
        })
    }

    /// Delete rules whose left-hand sides other rules can reduce, and
    /// reduce the right-hand sides of the survivors.
    ///
    /// Sound only after the completion procedure has made the system
    /// confluent; rule deletion is otherwise observable. Every
    /// right-hand side reduction appends a replacement rule and records
    /// the loop connecting old and new rule.
    pub fn simplify_rewrite_system(&mut self) {
        let rule_count = self.rules.len();
        for index in 0..rule_count {
            let rule_id = RuleId::from_index(index);
            if self.rules[index].is_deleted() {
                continue;
            }

            // A rule is subsumed when some other live rule rewrites a
            // substring of its left-hand side.
            let lhs = self.ctx.term(self.rules[index].lhs());
            let mut from = 0;
            while from < lhs.len() {
                let found = self.trie.find(&lhs.symbols()[from..]);
                from += 1;
                if let Some(other_rule_id) = found {
                    // A rule does not obsolete itself.
                    if other_rule_id == rule_id {
                        continue;
                    }
                    if self.rules[other_rule_id.index()].is_deleted() {
                        continue;
                    }
                    if self.debug.contains(DebugFlags::COMPLETION) {
                        eprintln!(
                            "$ Deleting rule {} because its left hand side contains {}",
                            self.rules[index].format(self.ctx).unwrap_or_else(|e| e),
                            self.rules[other_rule_id.index()]
                                .format(self.ctx)
                                .unwrap_or_else(|e| e)
                        );
                    }
                    self.rules[index].mark_deleted();
                    break;
                }
            }
            if self.rules[index].is_deleted() {
                continue;
            }

            // Now try to reduce the right-hand side.
            let mut rhs = self.ctx.term(self.rules[index].rhs());
            let mut rhs_path = RewritePath::new();
            if !self.simplify(&mut rhs, Some(&mut rhs_path)) {
                continue;
            }

            // The reduced rule replaces the old one under the same lhs.
            self.rules[index].mark_deleted();
            let new_rule_id = RuleId::from_index(self.rules.len());
            let uniqued_lhs = self.rules[index].lhs();
            let uniqued_rhs = self.ctx.terms().get(&rhs);
            self.rules.push(Rule::new(uniqued_lhs, uniqued_rhs));
            let _previous = self.trie.insert(lhs.symbols(), new_rule_id);
            debug_assert_eq!(
                _previous,
                Some(rule_id),
                "the lhs of a reduced rule must already be indexed under it"
            );

            // A loop at the simplified rhs: backwards along the rhs
            // derivation, backwards across the old rule, forward across
            // the new one.
            rhs_path.invert();
            let mut loop_path = RewritePath::new();
            loop_path.append(&rhs_path);
            loop_path.add(RewriteStep::new(0, rule_id, true));
            loop_path.add(RewriteStep::new(0, new_rule_id, false));

            if self.debug.contains(DebugFlags::COMPLETION) {
                eprintln!(
                    "$ Right hand side simplification recorded a loop: {}",
                    loop_path.format(&rhs, self).unwrap_or_else(|error| error)
                );
            }
            self.record_homotopy_generator(uniqued_rhs, loop_path);
        }
    }

    /// Audit the structural invariants of every live rule.
    ///
    /// A violation is a programmer error: the offending rule and the
    /// whole system are dumped to stderr before panicking. Active in
    /// debug builds only.
    pub fn verify(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        for rule in &self.rules {
            if rule.is_deleted() {
                continue;
            }
            let lhs = self.ctx.term(rule.lhs());
            let rhs = self.ctx.term(rule.rhs());
            self.check_rule(rule, !lhs.is_empty(), "the lhs is non-empty");
            self.check_rule(rule, !rhs.is_empty(), "the rhs is non-empty");

            let store = self.ctx.symbols();
            let last = lhs.len() - 1;
            for (index, &symbol) in lhs.iter().enumerate() {
                let kind = store.kind(symbol);
                if index != last {
                    self.check_rule(
                        rule,
                        kind != SymbolKind::Layout,
                        "layout constraints occur only at the end of the lhs",
                    );
                    self.check_rule(
                        rule,
                        !store.is_superclass_or_concrete_type(symbol),
                        "superclass and concrete types occur only at the end of the lhs",
                    );
                }
                if index != 0 {
                    self.check_rule(
                        rule,
                        kind != SymbolKind::GenericParam,
                        "generic parameters occur only at the start of the lhs",
                    );
                }
                if index != 0 && index != last {
                    self.check_rule(
                        rule,
                        kind != SymbolKind::Protocol,
                        "protocols occur only at the ends of the lhs",
                    );
                }
            }

            for (index, &symbol) in rhs.iter().enumerate() {
                let kind = store.kind(symbol);
                if self.valid_input {
                    // Only holds when the input requirements were valid;
                    // otherwise upstream has already diagnosed an error.
                    self.check_rule(
                        rule,
                        kind != SymbolKind::Name,
                        "no name symbols on the rhs",
                    );
                }
                self.check_rule(
                    rule,
                    kind != SymbolKind::Layout,
                    "no layout constraints on the rhs",
                );
                self.check_rule(
                    rule,
                    !store.is_superclass_or_concrete_type(symbol),
                    "no superclass or concrete types on the rhs",
                );
                if index != 0 {
                    self.check_rule(
                        rule,
                        kind != SymbolKind::GenericParam,
                        "generic parameters occur only at the start of the rhs",
                    );
                    self.check_rule(
                        rule,
                        kind != SymbolKind::Protocol,
                        "protocols occur only at the start of the rhs",
                    );
                }
            }

            self.check_rule(
                rule,
                lhs.root_protocols(self.ctx) == rhs.root_protocols(self.ctx),
                "both sides are anchored to the same protocols",
            );
        }
    }

    /// Render the rule list and the homotopy generators.
    pub fn dump(&self) -> Result<String, String> {
        let mut out = String::new();
        out.push_str("Rewrite system: {\n");
        for rule in &self.rules {
            out.push_str("- ");
            out.push_str(&rule.format(self.ctx)?);
            out.push('\n');
        }
        out.push_str("}\n");
        out.push_str("Homotopy generators: {\n");
        for generator in &self.homotopy_generators {
            let basepoint = self
                .ctx
                .terms()
                .resolve(generator.basepoint)
                .ok_or_else(|| "unknown basepoint term".to_string())?;
            out.push_str("- ");
            out.push_str(&format_term(&basepoint, self.ctx)?);
            out.push_str(": ");
            out.push_str(&generator.path.format(&basepoint, self)?);
            out.push('\n');
        }
        out.push_str("}\n");
        Ok(out)
    }

    fn record_homotopy_generator(&mut self, basepoint: Term, path: RewritePath) {
        let generator = HomotopyGenerator::new(basepoint, path);
        debug_assert!(
            generator.is_loop(self),
            "recorded a homotopy generator that is not a loop"
        );
        self.homotopy_generators.push(generator);
    }

    /// Record candidates for associated-type merging.
    ///
    /// When an appended rule equates two same-named associated types
    /// anchored at the same path but constrained by different protocol
    /// sets, a later pass must introduce a merged symbol; the pair is
    /// recorded here for it.
    fn check_merged_associated_type(&mut self, lhs: Term, rhs: Term) {
        let lhs_term = self.ctx.term(lhs);
        let rhs_term = self.ctx.term(rhs);
        if lhs_term.len() != rhs_term.len() {
            return;
        }
        let last = lhs_term.len() - 1;
        if lhs_term.symbols()[..last] != rhs_term.symbols()[..last] {
            return;
        }
        let store = self.ctx.symbols();
        let (
            SymbolData::AssociatedType {
                protocols: lhs_protocols,
                name: lhs_name,
            },
            SymbolData::AssociatedType {
                protocols: rhs_protocols,
                name: rhs_name,
            },
        ) = (store.data(lhs_term[last]), store.data(rhs_term[last]))
        else {
            return;
        };
        if lhs_name != rhs_name || lhs_protocols == rhs_protocols {
            return;
        }
        if self.debug.contains(DebugFlags::MERGE) {
            eprintln!(
                "## Associated type merge candidate {} == {}",
                self.display(&lhs_term),
                self.display(&rhs_term)
            );
        }
        self.merged_associated_types.push((lhs, rhs));
    }

    /// Diagnose a duplicate left-hand side in the trie, then abort.
    ///
    /// Simplification is supposed to make every inserted lhs
    /// irreducible and therefore unique, so a duplicate means the engine
    /// or its reduction order is broken. The simplification of the lhs
    /// is replayed with tracing enabled to show what went wrong.
    fn duplicate_rule_abort(&mut self, old_rule_id: RuleId, lhs: &MutableTerm) -> ! {
        eprintln!("Duplicate rewrite rule!");
        eprintln!(
            "Old rule #{}: {}",
            old_rule_id.raw(),
            self.rules[old_rule_id.index()]
                .format(self.ctx)
                .unwrap_or_else(|error| error)
        );
        eprintln!("Trying to replay what happened when I simplified this term:");
        self.debug |= DebugFlags::SIMPLIFY;
        let mut term = lhs.clone();
        self.simplify(&mut term, None);
        eprintln!("{}", self.dump().unwrap_or_else(|error| error));
        panic!("duplicate rewrite rule");
    }

    fn check_rule(&self, rule: &Rule, ok: bool, what: &str) {
        if ok {
            return;
        }
        eprintln!(
            "&&& Malformed rewrite rule: {}",
            rule.format(self.ctx).unwrap_or_else(|error| error)
        );
        eprintln!("&&& {}", what);
        eprintln!("{}", self.dump().unwrap_or_else(|error| error));
        panic!("malformed rewrite rule: {what}");
    }

    /// Best-effort term rendering for diagnostics.
    fn display(&self, term: &MutableTerm) -> String {
        format_term(term, self.ctx).unwrap_or_else(|error| error)
    }
}

impl Drop for RewriteSystem<'_> {
    fn drop(&mut self) {
        self.trie.update_histograms(
            &self.ctx.rule_trie_histogram,
            &self.ctx.rule_trie_root_histogram,
        );
    }
}

#[cfg(test)]
#[path = "tests/system.rs"]
mod tests;
