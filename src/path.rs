//! Rewrite paths: explicit derivations through the rule graph.
//!
//! A path is pure data so the surrounding completion procedure can
//! inspect, invert, and concatenate derivations. Homotopy generators
//! are loops of this kind; the completion and minimization passes use
//! them to reason about redundant rules.

use crate::system::{RewriteSystem, RuleId};
use crate::term::{format_symbols, format_term, MutableTerm, Term};

/// A single rewrite applied at an offset within a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RewriteStep {
    /// Start of the replaced slice.
    pub offset: u32,
    /// The rule applied.
    pub rule: RuleId,
    /// When set, the rule applies right-to-left.
    pub inverse: bool,
}

impl RewriteStep {
    pub fn new(offset: u32, rule: RuleId, inverse: bool) -> Self {
        Self {
            offset,
            rule,
            inverse,
        }
    }

    /// Flip the direction of this step.
    pub fn invert(&mut self) {
        self.inverse = !self.inverse;
    }

    /// Apply this step to `term`.
    ///
    /// Fails when the matched side of the rule does not occur at
    /// `offset`, meaning the step does not belong to this term.
    pub fn try_apply(
        &self,
        term: &mut MutableTerm,
        system: &RewriteSystem<'_>,
    ) -> Result<(), String> {
        let rule = system.rule(self.rule);
        let (from_side, to_side) = if self.inverse {
            (rule.rhs(), rule.lhs())
        } else {
            (rule.lhs(), rule.rhs())
        };
        let from_side = system.context().term(from_side);
        let to_side = system.context().term(to_side);
        let from = self.offset as usize;
        let to = from + from_side.len();
        if to > term.len() || &term.symbols()[from..to] != from_side.symbols() {
            return Err(format!(
                "rewrite step (rule #{} at offset {}) does not match the term",
                self.rule.raw(),
                self.offset
            ));
        }
        term.rewrite_sub_term(from, to, to_side.symbols());
        Ok(())
    }

    /// Apply this step to `term`, panicking when it does not match.
    pub fn apply(&self, term: &mut MutableTerm, system: &RewriteSystem<'_>) {
        if let Err(message) = self.try_apply(term, system) {
            panic!("{message}");
        }
    }

    /// Print this step against the cursor `term`, then advance the
    /// cursor past it.
    ///
    /// Forward steps render `prefix.(lhs => rhs).suffix`, inverse steps
    /// `prefix.(lhs <= rhs).suffix`; the printed prefix and suffix come
    /// from the term as it stands before the step applies.
    pub(crate) fn write(
        &self,
        out: &mut String,
        term: &mut MutableTerm,
        system: &RewriteSystem<'_>,
    ) -> Result<(), String> {
        let ctx = system.context();
        let rule = system.rule(self.rule);
        let rule_lhs = ctx.term(rule.lhs());
        let rule_rhs = ctx.term(rule.rhs());
        let matched = if self.inverse { &rule_rhs } else { &rule_lhs };
        let from = self.offset as usize;
        let to = from + matched.len();
        if to > term.len() || &term.symbols()[from..to] != matched.symbols() {
            return Err(format!(
                "rewrite step (rule #{} at offset {}) does not match the cursor term",
                self.rule.raw(),
                self.offset
            ));
        }

        let prefix = &term.symbols()[..from];
        let suffix = &term.symbols()[to..];
        if !prefix.is_empty() {
            out.push_str(&format_symbols(prefix, ctx)?);
            out.push('.');
        }
        out.push('(');
        out.push_str(&format_term(&rule_lhs, ctx)?);
        out.push_str(if self.inverse { " <= " } else { " => " });
        out.push_str(&format_term(&rule_rhs, ctx)?);
        out.push(')');
        if !suffix.is_empty() {
            out.push('.');
            out.push_str(&format_symbols(suffix, ctx)?);
        }

        let replacement = if self.inverse { &rule_lhs } else { &rule_rhs };
        term.rewrite_sub_term(from, to, replacement.symbols());
        Ok(())
    }
}

/// An ordered sequence of rewrite steps denoting a derivation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewritePath {
    steps: Vec<RewriteStep>,
}

impl RewritePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one step onto the end.
    pub fn add(&mut self, step: RewriteStep) {
        self.steps.push(step);
    }

    /// Concatenate `other` onto the end, with no simplification.
    pub fn append(&mut self, other: &RewritePath) {
        self.steps.extend_from_slice(&other.steps);
    }

    /// Reverse the derivation: steps in reverse order, each direction
    /// flipped.
    pub fn invert(&mut self) {
        self.steps.reverse();
        for step in &mut self.steps {
            step.invert();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[RewriteStep] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RewriteStep> {
        self.steps.iter()
    }

    /// Thread `term` through every step in order.
    pub fn try_apply(
        &self,
        term: &mut MutableTerm,
        system: &RewriteSystem<'_>,
    ) -> Result<(), String> {
        for step in &self.steps {
            step.try_apply(term, system)?;
        }
        Ok(())
    }

    /// Render the derivation against `start`, separating consecutive
    /// steps with a tensor-product glyph.
    pub fn format(&self, start: &MutableTerm, system: &RewriteSystem<'_>) -> Result<String, String> {
        let mut cursor = start.clone();
        let mut out = String::new();
        for (index, step) in self.steps.iter().enumerate() {
            if index != 0 {
                out.push_str(" ⊗ ");
            }
            step.write(&mut out, &mut cursor, system)?;
        }
        Ok(out)
    }
}

/// A loop in the rewriting graph: applying `path` to `basepoint` yields
/// the basepoint again.
///
/// Every redundant way of deriving an equation is materialized as one
/// of these, so the completion procedure can reason about which rules
/// are consequences of others.
#[derive(Debug, Clone)]
pub struct HomotopyGenerator {
    /// Interned term the loop starts and ends at.
    pub basepoint: Term,
    /// The loop itself.
    pub path: RewritePath,
}

impl HomotopyGenerator {
    pub fn new(basepoint: Term, path: RewritePath) -> Self {
        Self { basepoint, path }
    }

    /// Check that the path is in fact a loop at the basepoint.
    pub fn is_loop(&self, system: &RewriteSystem<'_>) -> bool {
        let Some(mut term) = system.context().terms().resolve(self.basepoint) else {
            return false;
        };
        let start = term.clone();
        if self.path.try_apply(&mut term, system).is_err() {
            return false;
        }
        term == start
    }
}

#[cfg(test)]
#[path = "tests/path.rs"]
mod tests;
