use crate::context::RewriteContext;
use crate::system::RewriteSystem;
use crate::term::MutableTerm;

pub(crate) fn ctx() -> RewriteContext {
    RewriteContext::new()
}

/// Build a term of name symbols from a space-separated word list,
/// e.g. `"B C"`. Single letters compare lexicographically, which makes
/// the shortlex order easy to predict in tests.
pub(crate) fn name_term(ctx: &RewriteContext, names: &str) -> MutableTerm {
    let mut term = MutableTerm::new();
    for name in names.split_whitespace() {
        term.push(ctx.symbols().name(name));
    }
    term
}

pub(crate) fn add_name_rule(system: &mut RewriteSystem<'_>, lhs: &str, rhs: &str) -> bool {
    let lhs = name_term(system.context(), lhs);
    let rhs = name_term(system.context(), rhs);
    system.add_rule(lhs, rhs, None)
}
