use std::collections::{BTreeMap, BTreeSet};

use pretty::DocAllocator;

use shapecheck_ast::{Ident, Span};
use shapecheck_printer::{Alloc, Builder, Print, PrintCfg};
use shapecheck_types::{fresh_name, unify, BExp, Substitution, Type};

use crate::result::{CheckResult, TypeError};

/// The typing environment Γ.
///
/// Holds the substitution, the variable typings (keyed by dotted name, so
/// `np.ones` is a binding like any other), the set of fixed names protected
/// from generalization, and the conjunction of boolean assumptions collected
/// along the current branch. Contexts are cloned wherever evaluation
/// branches; they are never shared.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Context {
    pub subst: Substitution,
    bindings: BTreeMap<String, Type>,
    pub fixed: BTreeSet<Ident>,
    pub assumptions: Vec<BExp>,
}

impl Context {
    pub fn new() -> Self {
        Context {
            subst: Substitution::new(),
            bindings: BTreeMap::new(),
            fixed: BTreeSet::new(),
            assumptions: Vec::new(),
        }
    }

    /// Stores `name : t`, overwriting any previous binding. With `fixed`, the
    /// free names of `t` become protected from generalization. Whether an
    /// existing binding is unified with or replaced is the assignment rule's
    /// decision, not the context's.
    pub fn annotate(&mut self, name: &str, t: Type, fixed: bool) {
        if fixed {
            self.fixed.extend(t.names());
        }
        self.bindings.insert(name.to_owned(), t);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn type_of(&self, name: &str, span: Span) -> CheckResult<Type> {
        self.bindings.get(name).cloned().ok_or_else(|| TypeError::unbound(name, span))
    }

    pub fn binding_names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn unify(&mut self, t1: &Type, t2: &Type) -> CheckResult<()> {
        Ok(unify(&mut self.subst, t1, t2)?)
    }

    /// Appends a boolean conjunct. Refinements only ever add to this list.
    pub fn assume(&mut self, b: BExp) {
        self.assumptions.push(b);
    }

    pub fn fix(&mut self, names: impl IntoIterator<Item = Ident>) {
        self.fixed.extend(names);
    }

    /// Prenex instantiation of a stored scheme: every free name not fixed in
    /// this context is renamed to a fresh id, then all rigid variables and
    /// `UVar` markers become unification variables.
    pub fn instantiate(&self, t: &Type) -> Type {
        let mut m = BTreeMap::new();
        for name in t.names() {
            if !self.fixed.contains(&name) {
                m.insert(name.clone(), fresh_name());
            }
        }
        t.renamed(&m).eapp()
    }

    pub fn under(&self, t: &Type) -> Type {
        t.under(&self.subst)
    }

    /// A human-readable view with the substitution applied to every binding.
    pub fn reduced(&self) -> BTreeMap<String, Type> {
        self.bindings.iter().map(|(name, t)| (name.clone(), self.under(t))).collect()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Print for Context {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        let bindings = self.reduced();
        let entries = bindings.into_iter().map(|(name, t)| {
            alloc.text(name).append(" : ").append(t.print_to_string(Some(cfg)))
        });
        let assumptions = self
            .assumptions
            .iter()
            .map(|b| alloc.text("assuming ").append(b.print(cfg, alloc)));
        alloc
            .intersperse(entries, alloc.text(", "))
            .append(alloc.text(" "))
            .append(self.subst.print(cfg, alloc))
            .append(alloc.space())
            .append(alloc.intersperse(assumptions, alloc.text(", ")))
    }
}

#[cfg(test)]
mod tests {
    use shapecheck_types::AExp;

    use super::*;

    #[test]
    fn annotate_fixed_protects_type_names() {
        let mut ctx = Context::new();
        ctx.annotate("a", Type::Arith(AExp::Var(Ident::from("a"))), true);
        assert!(ctx.fixed.contains(&Ident::from("a")));
    }

    #[test]
    fn lookup_of_missing_name_is_unbound() {
        let ctx = Context::new();
        let err = ctx.type_of("missing", Span::default()).unwrap_err();
        assert!(matches!(err, TypeError::UnboundIdentifier { .. }));
    }

    #[test]
    fn instantiate_respects_fixed_names() {
        let mut ctx = Context::new();
        ctx.fix([Ident::from("n")]);
        let t = Type::fun(
            Type::Arith(AExp::Var(Ident::from("n"))),
            Type::Array(AExp::Var(Ident::from("m"))),
        );
        let instantiated = ctx.instantiate(&t);
        let Type::Fun(param, result) = instantiated else { panic!("expected function") };
        // The fixed name survives (as a unification flavor), the other is fresh.
        assert_eq!(*param, Type::Arith(AExp::EVar(Ident::from("n"))));
        let Type::Array(AExp::EVar(renamed)) = *result else { panic!("expected array") };
        assert_ne!(renamed, Ident::from("m"));
    }

    #[test]
    fn annotate_overwrites_existing_bindings() {
        let mut ctx = Context::new();
        ctx.annotate("x", Type::Arith(AExp::Lit(1)), false);
        ctx.annotate("x", Type::Arith(AExp::Lit(2)), false);
        assert_eq!(ctx.type_of("x", Span::default()).unwrap(), Type::Arith(AExp::Lit(2)));
    }
}
