use super::*;
use crate::protocol::ProtocolGraph;
use crate::test_utils::{ctx, name_term};
use std::cmp::Ordering;

// ========== INTERNING TESTS ==========

#[test]
fn equal_sequences_intern_to_same_id() {
    let ctx = ctx();
    let first = ctx.terms().get(&name_term(&ctx, "A B"));
    let second = ctx.terms().get(&name_term(&ctx, "A B"));
    assert_eq!(
        first, second,
        "interning the same symbol sequence twice should return identical ids"
    );
}

#[test]
fn different_sequences_intern_to_different_ids() {
    let ctx = ctx();
    let ab = ctx.terms().get(&name_term(&ctx, "A B"));
    let ba = ctx.terms().get(&name_term(&ctx, "B A"));
    assert_ne!(ab, ba);
}

#[test]
fn resolve_roundtrips_symbols() {
    let ctx = ctx();
    let term = name_term(&ctx, "A B C");
    let id = ctx.terms().get(&term);
    assert_eq!(ctx.terms().resolve(id), Some(term));
}

#[test]
fn resolve_foreign_id_returns_none() {
    let ctx = ctx();
    assert_eq!(ctx.terms().resolve(Term::from_raw(99)), None);
}

#[test]
#[should_panic(expected = "cannot intern an empty term")]
fn interning_empty_term_panics() {
    let ctx = ctx();
    ctx.terms().get(&MutableTerm::new());
}

// ========== MUTABLE TERM TESTS ==========

#[test]
fn rewrite_sub_term_replaces_middle_slice() {
    let ctx = ctx();
    let mut term = name_term(&ctx, "A B C");
    let replacement = name_term(&ctx, "X Y");
    term.rewrite_sub_term(1, 2, replacement.symbols());
    assert_eq!(term, name_term(&ctx, "A X Y C"));
}

#[test]
fn rewrite_sub_term_can_shrink() {
    let ctx = ctx();
    let mut term = name_term(&ctx, "A B C");
    let replacement = name_term(&ctx, "D");
    term.rewrite_sub_term(0, 2, replacement.symbols());
    assert_eq!(term, name_term(&ctx, "D C"));
}

#[test]
fn rewrite_sub_term_at_the_end() {
    let ctx = ctx();
    let mut term = name_term(&ctx, "A B");
    let replacement = name_term(&ctx, "C");
    term.rewrite_sub_term(1, 2, replacement.symbols());
    assert_eq!(term, name_term(&ctx, "A C"));
}

#[test]
fn rewrite_sub_term_whole_term() {
    let ctx = ctx();
    let mut term = name_term(&ctx, "A B");
    let replacement = name_term(&ctx, "C");
    term.rewrite_sub_term(0, 2, replacement.symbols());
    assert_eq!(term, name_term(&ctx, "C"));
}

#[test]
fn indexing_and_iteration_agree() {
    let ctx = ctx();
    let term = name_term(&ctx, "A B C");
    assert_eq!(term.len(), 3);
    for (index, &symbol) in term.iter().enumerate() {
        assert_eq!(term[index], symbol);
    }
}

// ========== REDUCTION ORDER TESTS ==========

#[test]
fn shorter_terms_are_smaller() {
    let ctx = ctx();
    let graph = ProtocolGraph::new();
    let short = name_term(&ctx, "C C");
    let long = name_term(&ctx, "A A A");
    assert_eq!(short.compare(&long, &graph, &ctx), Ordering::Less);
    assert_eq!(long.compare(&short, &graph, &ctx), Ordering::Greater);
}

#[test]
fn equal_length_terms_compare_pointwise() {
    let ctx = ctx();
    let graph = ProtocolGraph::new();
    let ab = name_term(&ctx, "A B");
    let ac = name_term(&ctx, "A C");
    assert_eq!(ab.compare(&ac, &graph, &ctx), Ordering::Less);
    assert_eq!(ac.compare(&ab, &graph, &ctx), Ordering::Greater);
    assert_eq!(ab.compare(&ab, &graph, &ctx), Ordering::Equal);
}

#[test]
fn order_is_stable_under_common_prefix_and_suffix() {
    let ctx = ctx();
    let graph = ProtocolGraph::new();
    let smaller = name_term(&ctx, "X A Y");
    let greater = name_term(&ctx, "X B Y");
    assert_eq!(smaller.compare(&greater, &graph, &ctx), Ordering::Less);
}

// ========== ROOT PROTOCOL TESTS ==========

#[test]
fn protocol_headed_term_is_anchored_to_it() {
    let ctx = ctx();
    let proto = ctx.symbols().protocol("P");
    let name = ctx.symbols().name("A");
    let term = MutableTerm::from_symbols(&[proto, name]);
    let p = ctx.symbols().name_id("P");
    assert_eq!(term.root_protocols(&ctx).as_slice(), &[p]);
}

#[test]
fn associated_type_headed_term_is_anchored_to_its_protocols() {
    let ctx = ctx();
    let assoc = ctx.symbols().associated_type(&["Q", "P"], "A");
    let term = MutableTerm::from_symbols(&[assoc]);
    let p = ctx.symbols().name_id("P");
    let q = ctx.symbols().name_id("Q");
    assert_eq!(term.root_protocols(&ctx).as_slice(), &[p, q]);
}

#[test]
fn generic_param_headed_term_has_no_root_protocols() {
    let ctx = ctx();
    let param = ctx.symbols().generic_param(0, 0);
    let proto = ctx.symbols().protocol("P");
    let term = MutableTerm::from_symbols(&[param, proto]);
    assert!(term.root_protocols(&ctx).is_empty());
}

// ========== FORMATTING TESTS ==========

#[test]
fn format_term_joins_symbols_with_dots() {
    let ctx = ctx();
    let param = ctx.symbols().generic_param(0, 0);
    let proto = ctx.symbols().protocol("P");
    let name = ctx.symbols().name("A");
    let term = MutableTerm::from_symbols(&[param, proto, name]);
    assert_eq!(format_term(&term, &ctx).as_deref(), Ok("τ_0_0.[P].A"));
}
