use proptest::prelude::*;
use rwgen::context::RewriteContext;
use rwgen::path::RewritePath;
use rwgen::system::RewriteSystem;
use rwgen::term::MutableTerm;
use std::cmp::Ordering;

const NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];

fn letters_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..NAMES.len(), 1..5)
}

fn rules_strategy() -> impl Strategy<Value = Vec<(Vec<usize>, Vec<usize>)>> {
    prop::collection::vec((letters_strategy(), letters_strategy()), 1..8)
}

fn build_term(ctx: &RewriteContext, letters: &[usize]) -> MutableTerm {
    let mut term = MutableTerm::new();
    for &letter in letters {
        term.push(ctx.symbols().name(NAMES[letter]));
    }
    term
}

fn build_system<'ctx>(
    ctx: &'ctx RewriteContext,
    rules: &[(Vec<usize>, Vec<usize>)],
) -> RewriteSystem<'ctx> {
    let mut system = RewriteSystem::new(ctx);
    for (lhs, rhs) in rules {
        system.add_rule(build_term(ctx, lhs), build_term(ctx, rhs), None);
    }
    system
}

fn contains_subslice(haystack: &MutableTerm, needle: &MutableTerm) -> bool {
    haystack
        .symbols()
        .windows(needle.len())
        .any(|window| window == needle.symbols())
}

proptest! {
    /// Every live rule is oriented: lhs greater than rhs.
    #[test]
    fn rules_are_oriented(rules in rules_strategy()) {
        let ctx = RewriteContext::new();
        let system = build_system(&ctx, &rules);
        for rule in system.rules() {
            if rule.is_deleted() {
                continue;
            }
            let lhs = ctx.terms().resolve(rule.lhs()).unwrap();
            let rhs = ctx.terms().resolve(rule.rhs()).unwrap();
            prop_assert_eq!(
                lhs.compare(&rhs, system.protocol_graph(), &ctx),
                Ordering::Greater
            );
        }
    }

    /// After simplification, no live rule's lhs occurs in the term.
    #[test]
    fn simplified_terms_are_in_normal_form(
        rules in rules_strategy(),
        letters in letters_strategy(),
    ) {
        let ctx = RewriteContext::new();
        let system = build_system(&ctx, &rules);
        let mut term = build_term(&ctx, &letters);
        system.simplify(&mut term, None);
        for rule in system.rules() {
            if rule.is_deleted() {
                continue;
            }
            let lhs = ctx.terms().resolve(rule.lhs()).unwrap();
            prop_assert!(
                !contains_subslice(&term, &lhs),
                "normal form {:?} still contains a live lhs",
                term
            );
        }
    }

    /// Simplifying a normal form again changes nothing and records no
    /// steps.
    #[test]
    fn simplification_is_idempotent(
        rules in rules_strategy(),
        letters in letters_strategy(),
    ) {
        let ctx = RewriteContext::new();
        let system = build_system(&ctx, &rules);
        let mut term = build_term(&ctx, &letters);
        system.simplify(&mut term, None);
        let normal_form = term.clone();

        let mut path = RewritePath::new();
        let changed = system.simplify(&mut term, Some(&mut path));
        prop_assert!(!changed);
        prop_assert!(path.is_empty());
        prop_assert_eq!(term, normal_form);
    }

    /// The recorded path replays the reduction, and its inverse undoes
    /// it.
    #[test]
    fn simplification_paths_are_sound_and_invertible(
        rules in rules_strategy(),
        letters in letters_strategy(),
    ) {
        let ctx = RewriteContext::new();
        let system = build_system(&ctx, &rules);
        let original = build_term(&ctx, &letters);

        let mut term = original.clone();
        let mut path = RewritePath::new();
        let changed = system.simplify(&mut term, Some(&mut path));
        prop_assert_eq!(changed, !path.is_empty());

        let mut replay = original.clone();
        prop_assert!(path.try_apply(&mut replay, &system).is_ok());
        prop_assert_eq!(&replay, &term);

        let mut inverse = path.clone();
        inverse.invert();
        prop_assert!(inverse.try_apply(&mut replay, &system).is_ok());
        prop_assert_eq!(&replay, &original);
    }

    /// Double inversion is the identity on paths.
    #[test]
    fn path_inversion_is_an_involution(
        rules in rules_strategy(),
        letters in letters_strategy(),
    ) {
        let ctx = RewriteContext::new();
        let system = build_system(&ctx, &rules);
        let mut term = build_term(&ctx, &letters);
        let mut path = RewritePath::new();
        system.simplify(&mut term, Some(&mut path));

        let mut twice = path.clone();
        twice.invert();
        twice.invert();
        prop_assert_eq!(twice, path);
    }

    /// Post-completion reduction keeps every recorded generator a loop
    /// and leaves the live rules in normal form with stable ids.
    #[test]
    fn rewrite_system_reduction_preserves_loops(rules in rules_strategy()) {
        let ctx = RewriteContext::new();
        let mut system = build_system(&ctx, &rules);
        let sides_before: Vec<_> = system
            .rules()
            .iter()
            .map(|rule| (rule.lhs(), rule.rhs()))
            .collect();

        system.simplify_rewrite_system();

        for generator in system.homotopy_generators() {
            prop_assert!(generator.is_loop(&system));
        }

        // Deletion is a tombstone: ids and sides never change.
        for (index, &(lhs, rhs)) in sides_before.iter().enumerate() {
            let rule = &system.rules()[index];
            prop_assert_eq!(rule.lhs(), lhs);
            prop_assert_eq!(rule.rhs(), rhs);
        }

        // Live right-hand sides are irreducible afterwards.
        for rule in system.rules() {
            if rule.is_deleted() {
                continue;
            }
            let mut rhs = ctx.terms().resolve(rule.rhs()).unwrap();
            prop_assert!(!system.simplify(&mut rhs, None));
        }
    }
}
