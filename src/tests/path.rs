use super::*;
use crate::context::RewriteContext;
use crate::system::{RewriteSystem, RuleId};
use crate::test_utils::{add_name_rule, ctx, name_term};

/// A system with the single rule `B => A`.
fn one_rule_system(ctx: &RewriteContext) -> RewriteSystem<'_> {
    let mut system = RewriteSystem::new(ctx);
    assert!(add_name_rule(&mut system, "B", "A"));
    system
}

fn rule(index: usize) -> RuleId {
    RuleId::from_index(index)
}

// ========== STEP TESTS ==========

#[test]
fn invert_flips_the_direction_flag() {
    let mut step = RewriteStep::new(2, rule(0), false);
    step.invert();
    assert!(step.inverse);
    step.invert();
    assert!(!step.inverse);
}

#[test]
fn forward_step_rewrites_lhs_to_rhs() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let mut term = name_term(&ctx, "B C");
    RewriteStep::new(0, rule(0), false).apply(&mut term, &system);
    assert_eq!(term, name_term(&ctx, "A C"));
}

#[test]
fn inverse_step_rewrites_rhs_to_lhs() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let mut term = name_term(&ctx, "A C");
    RewriteStep::new(0, rule(0), true).apply(&mut term, &system);
    assert_eq!(term, name_term(&ctx, "B C"));
}

#[test]
fn step_applies_at_its_offset() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let mut term = name_term(&ctx, "C B");
    RewriteStep::new(1, rule(0), false).apply(&mut term, &system);
    assert_eq!(term, name_term(&ctx, "C A"));
}

#[test]
fn mismatched_step_is_rejected() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let mut term = name_term(&ctx, "C C");
    let result = RewriteStep::new(0, rule(0), false).try_apply(&mut term, &system);
    assert!(result.is_err());
    assert_eq!(term, name_term(&ctx, "C C"), "a rejected step must not mutate");
}

#[test]
fn out_of_range_offset_is_rejected() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let mut term = name_term(&ctx, "B");
    let result = RewriteStep::new(1, rule(0), false).try_apply(&mut term, &system);
    assert!(result.is_err());
}

// ========== PATH ALGEBRA TESTS ==========

#[test]
fn append_concatenates_steps() {
    let mut first = RewritePath::new();
    first.add(RewriteStep::new(0, rule(0), false));
    let mut second = RewritePath::new();
    second.add(RewriteStep::new(1, rule(1), true));

    first.append(&second);
    assert_eq!(
        first.steps(),
        &[
            RewriteStep::new(0, rule(0), false),
            RewriteStep::new(1, rule(1), true),
        ]
    );
}

#[test]
fn invert_reverses_and_flips() {
    let mut path = RewritePath::new();
    path.add(RewriteStep::new(0, rule(0), false));
    path.add(RewriteStep::new(1, rule(1), true));

    path.invert();
    assert_eq!(
        path.steps(),
        &[
            RewriteStep::new(1, rule(1), false),
            RewriteStep::new(0, rule(0), true),
        ]
    );
}

#[test]
fn invert_is_an_involution() {
    let mut path = RewritePath::new();
    path.add(RewriteStep::new(0, rule(0), false));
    path.add(RewriteStep::new(2, rule(1), true));
    path.add(RewriteStep::new(1, rule(0), false));

    let original = path.clone();
    path.invert();
    path.invert();
    assert_eq!(path, original);
}

#[test]
fn empty_path_applies_as_identity() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let mut term = name_term(&ctx, "B B");
    assert!(RewritePath::new().try_apply(&mut term, &system).is_ok());
    assert_eq!(term, name_term(&ctx, "B B"));
}

#[test]
fn applying_a_path_then_its_inverse_is_identity() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);

    let mut path = RewritePath::new();
    path.add(RewriteStep::new(0, rule(0), false));
    path.add(RewriteStep::new(1, rule(0), false));

    let start = name_term(&ctx, "B B");
    let mut term = start.clone();
    path.try_apply(&mut term, &system).unwrap();
    assert_eq!(term, name_term(&ctx, "A A"));

    let mut inverse = path.clone();
    inverse.invert();
    inverse.try_apply(&mut term, &system).unwrap();
    assert_eq!(term, start);
}

// ========== FORMAT TESTS ==========

#[test]
fn forward_step_prints_prefix_rule_suffix() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let mut path = RewritePath::new();
    path.add(RewriteStep::new(1, rule(0), false));

    let start = name_term(&ctx, "C B C");
    assert_eq!(
        path.format(&start, &system).as_deref(),
        Ok("C.(B => A).C")
    );
}

#[test]
fn inverse_step_prints_reversed_arrow() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let mut path = RewritePath::new();
    path.add(RewriteStep::new(0, rule(0), true));

    let start = name_term(&ctx, "A");
    assert_eq!(path.format(&start, &system).as_deref(), Ok("(B <= A)"));
}

#[test]
fn steps_are_separated_by_the_tensor_glyph() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let mut path = RewritePath::new();
    path.add(RewriteStep::new(0, rule(0), false));
    path.add(RewriteStep::new(1, rule(0), false));

    let start = name_term(&ctx, "B B");
    assert_eq!(
        path.format(&start, &system).as_deref(),
        Ok("(B => A).B ⊗ A.(B => A)")
    );
}

// ========== HOMOTOPY GENERATOR TESTS ==========

#[test]
fn a_closed_path_is_a_loop() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let basepoint = ctx.terms().get(&name_term(&ctx, "A"));

    let mut path = RewritePath::new();
    path.add(RewriteStep::new(0, rule(0), true));
    path.add(RewriteStep::new(0, rule(0), false));

    assert!(HomotopyGenerator::new(basepoint, path).is_loop(&system));
}

#[test]
fn a_non_returning_path_is_not_a_loop() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let basepoint = ctx.terms().get(&name_term(&ctx, "B"));

    let mut path = RewritePath::new();
    path.add(RewriteStep::new(0, rule(0), false));

    assert!(!HomotopyGenerator::new(basepoint, path).is_loop(&system));
}

#[test]
fn a_mismatched_path_is_not_a_loop() {
    let ctx = ctx();
    let system = one_rule_system(&ctx);
    let basepoint = ctx.terms().get(&name_term(&ctx, "C"));

    let mut path = RewritePath::new();
    path.add(RewriteStep::new(0, rule(0), false));

    assert!(!HomotopyGenerator::new(basepoint, path).is_loop(&system));
}
