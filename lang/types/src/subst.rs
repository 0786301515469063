use std::collections::{BTreeMap, BTreeSet};

use derivative::Derivative;
use log::debug;

use shapecheck_ast::Ident;
use shapecheck_smt::Term;

use crate::typ::Type;

pub type Compare = fn(&Type, &Type) -> bool;

/// The default representative preference: concrete terms win elections
/// against unification variables. Everything else is incomparable and falls
/// back to the bias bit plus a residual equality.
pub fn prefer_concrete(a: &Type, b: &Type) -> bool {
    !a.is_unification_var() && b.is_unification_var()
}

/// Union-find over type-level terms, biased by a partial order on
/// representatives.
///
/// Keys are whole terms, not just variables: a union of two incomparable
/// compound index expressions links them for `find` and records the pair as a
/// residual equality that is later discharged by the oracle.
#[derive(Debug, Clone, Derivative)]
#[derivative(Hash, PartialEq, Eq)]
pub struct Substitution {
    map: BTreeMap<Type, Type>,
    equalities: BTreeSet<(Type, Type)>,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    bias: bool,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    compare: Compare,
}

impl Substitution {
    pub fn new() -> Self {
        Self::with_compare(prefer_concrete)
    }

    pub fn with_compare(compare: Compare) -> Self {
        Substitution { map: BTreeMap::new(), equalities: BTreeSet::new(), bias: true, compare }
    }

    /// Walks parent links to the representative without mutating.
    pub fn resolve(&self, a: &Type) -> Type {
        let mut current = a.clone();
        while let Some(next) = self.map.get(&current) {
            current = next.clone();
        }
        current
    }

    /// Walks parent links to the representative, compressing the path.
    pub fn find(&mut self, a: &Type) -> Type {
        let mut traversed = Vec::new();
        let mut current = a.clone();
        while let Some(next) = self.map.get(&current) {
            traversed.push(current);
            current = next.clone();
        }
        for node in traversed {
            if node != current {
                self.map.insert(node, current.clone());
            }
        }
        current
    }

    /// Merges the classes of `a` and `b`. The preferred element becomes the
    /// representative; incomparable pairs alternate via the bias bit and are
    /// recorded as residual equalities.
    pub fn union(&mut self, a: Type, b: Type) {
        self.bias = !self.bias;
        let a = self.find(&a);
        let b = self.find(&b);
        if a == b {
            return;
        }

        if (self.compare)(&a, &b) {
            self.map.insert(b, a);
        } else if (self.compare)(&b, &a) {
            self.map.insert(a, b);
        } else {
            let (child, parent) =
                if self.bias { (b.clone(), a.clone()) } else { (a.clone(), b.clone()) };
            self.map.insert(child, parent);
            let pair = if a <= b { (a, b) } else { (b, a) };
            self.equalities.insert(pair);
        }
    }

    /// Rebuilds the substitution with every endpoint renamed; equalities are
    /// renamed symmetrically.
    pub fn renamed(&self, m: &BTreeMap<Ident, Ident>) -> Substitution {
        let map = self
            .map
            .iter()
            .map(|(key, value)| (key.renamed(m), value.renamed(m)))
            .collect();
        let equalities = self
            .equalities
            .iter()
            .map(|(lhs, rhs)| {
                let lhs = lhs.renamed(m);
                let rhs = rhs.renamed(m);
                if lhs <= rhs { (lhs, rhs) } else { (rhs, lhs) }
            })
            .collect();
        Substitution { map, equalities, bias: self.bias, compare: self.compare }
    }

    pub fn equalities(&self) -> impl Iterator<Item = &(Type, Type)> {
        self.equalities.iter()
    }

    /// Variable occurrences in the residual equalities.
    pub fn free_vars(&self) -> BTreeSet<Type> {
        let mut out = BTreeSet::new();
        for (lhs, rhs) in &self.equalities {
            lhs.collect_var_leaves(&mut out);
            rhs.collect_var_leaves(&mut out);
        }
        out
    }

    fn extract_names(&self, extract: impl Fn(&Type) -> BTreeSet<Ident>) -> BTreeSet<Ident> {
        let mut out = BTreeSet::new();
        for (lhs, rhs) in self.map.iter().chain(self.equalities.iter().map(|(l, r)| (l, r))) {
            out.extend(extract(lhs));
            out.extend(extract(rhs));
        }
        out
    }

    pub fn evars(&self) -> BTreeSet<Ident> {
        self.extract_names(Type::evars)
    }

    pub fn uvars(&self) -> BTreeSet<Ident> {
        self.extract_names(Type::uvars)
    }

    /// All names mentioned anywhere in the substitution.
    pub fn names(&self) -> BTreeSet<Ident> {
        self.extract_names(Type::names)
    }

    /// Lowers the substitution to oracle constraints: an assignment
    /// `v = find(v)` for every variable occurring in a residual equality, and
    /// the residual equalities themselves with both sides normalized.
    pub fn to_smt(&self) -> Vec<Term> {
        let mut terms: BTreeSet<Term> = BTreeSet::new();

        for leaf in self.free_vars() {
            let rep = self.resolve(&leaf);
            if rep == leaf {
                continue;
            }
            match (leaf.to_smt(), rep.to_smt()) {
                (Some(lhs), Some(rhs)) => {
                    terms.insert(Term::eq(lhs, rhs));
                }
                _ => debug!("skipping assignment without index-level lowering"),
            }
        }

        for (lhs, rhs) in &self.equalities {
            let lhs = lhs.under(self);
            let rhs = rhs.under(self);
            if lhs == rhs {
                continue;
            }
            match (lhs.to_smt(), rhs.to_smt()) {
                (Some(lhs), Some(rhs)) => {
                    terms.insert(Term::eq(lhs, rhs));
                }
                _ => debug!("skipping equality without index-level lowering"),
            }
        }

        terms.into_iter().collect()
    }
}

impl Default for Substitution {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exp::AExp;

    fn evar(name: &str) -> Type {
        Type::Arith(AExp::EVar(Ident::from(name)))
    }

    fn lit(n: i64) -> Type {
        Type::Arith(AExp::Lit(n))
    }

    #[test]
    fn union_makes_finds_agree() {
        let mut subst = Substitution::new();
        subst.union(evar("a"), evar("b"));
        subst.union(evar("b"), lit(3));
        assert_eq!(subst.find(&evar("a")), subst.find(&evar("b")));
        assert_eq!(subst.find(&evar("a")), lit(3));
    }

    #[test]
    fn concrete_terms_become_representatives() {
        let mut subst = Substitution::new();
        subst.union(evar("k"), lit(4));
        assert_eq!(subst.find(&evar("k")), lit(4));

        let mut subst = Substitution::new();
        subst.union(lit(4), evar("k"));
        assert_eq!(subst.find(&evar("k")), lit(4));
    }

    #[test]
    fn incomparable_union_records_an_equality() {
        let mut subst = Substitution::new();
        subst.union(lit(4), lit(5));
        assert_eq!(subst.equalities().count(), 1);
        assert_eq!(subst.find(&lit(4)), subst.find(&lit(5)));
    }

    #[test]
    fn incomparable_ties_alternate_orientation() {
        let mut first = Substitution::new();
        first.union(lit(1), lit(2));
        let mut second = Substitution::new();
        second.union(Type::None, Type::None); // flip the bias once
        second.union(lit(1), lit(2));
        let first_rep = first.find(&lit(1));
        let second_rep = second.find(&lit(1));
        assert_ne!(first_rep, second_rep);
    }

    #[test]
    fn under_is_idempotent() {
        let mut subst = Substitution::new();
        subst.union(evar("k"), Type::Arith(AExp::add(AExp::EVar(Ident::from("n")), AExp::Lit(1))));
        subst.union(evar("n"), lit(2));
        let t = Type::Array(AExp::EVar(Ident::from("k")));
        let once = t.under(&subst);
        assert_eq!(once, once.under(&subst));
        assert_eq!(once, Type::Array(AExp::add(AExp::Lit(2), AExp::Lit(1))));
    }

    #[test]
    fn lowering_keeps_conflicting_literals() {
        let mut subst = Substitution::new();
        subst.union(evar("k"), lit(4));
        subst.union(evar("k"), lit(5));
        let terms = subst.to_smt();
        // The residual 4 = 5 must survive normalization.
        assert!(terms.contains(&Term::eq(Term::IntLit(4), Term::IntLit(5)))
            || terms.contains(&Term::eq(Term::IntLit(5), Term::IntLit(4))));
    }

    #[test]
    fn renaming_preserves_structure() {
        let mut subst = Substitution::new();
        subst.union(evar("k"), lit(3));
        let mut m = BTreeMap::new();
        m.insert(Ident::from("k"), Ident::from("j"));
        let renamed = subst.renamed(&m);
        assert_eq!(renamed.resolve(&evar("j")), lit(3));
    }
}
