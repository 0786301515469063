use std::collections::{BTreeMap, BTreeSet};

use shapecheck_ast::Ident;
use shapecheck_smt::Term;

use crate::exp::{AExp, BExp};
use crate::fresh::fresh_name;
use crate::subst::Substitution;

/// A type of the checked language.
///
/// Index expressions appear directly as types: the type of a numeric literal
/// is the literal itself (`Arith(Lit 3)`), and `array[a + 1]` is
/// `Array(Add(Var a, Lit 1))`. `EVar` is an existential unification variable;
/// `UVar` marks a generalizable position in a stored scheme and is turned
/// back into a fresh `EVar` on lookup.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Type {
    None,
    Bool,
    Int,
    Array(AExp),
    Tuple(Vec<Type>),
    Fun(Box<Type>, Box<Type>),
    Arith(AExp),
    Boolean(BExp),
    EVar(Ident),
    UVar(Ident),
}

impl Type {
    pub fn fun(param: Type, result: Type) -> Type {
        Type::Fun(Box::new(param), Box::new(result))
    }

    /// A bare variable of any flavor, at type or index level.
    pub fn is_unification_var(&self) -> bool {
        matches!(
            self,
            Type::EVar(_)
                | Type::UVar(_)
                | Type::Arith(AExp::EVar(_))
                | Type::Boolean(BExp::EVar(_))
        )
    }

    pub fn head(&self) -> String {
        match self {
            Type::None => "None".to_owned(),
            Type::Bool => "bool".to_owned(),
            Type::Int => "int".to_owned(),
            Type::Array(_) => "array".to_owned(),
            Type::Tuple(elems) => format!("tuple of {}", elems.len()),
            Type::Fun(_, _) => "function".to_owned(),
            Type::Arith(_) => "arithmetic expression".to_owned(),
            Type::Boolean(_) => "boolean expression".to_owned(),
            Type::EVar(_) | Type::UVar(_) => "variable".to_owned(),
        }
    }

    /// The set of free variable names, regardless of flavor.
    pub fn names(&self) -> BTreeSet<Ident> {
        let mut out = BTreeSet::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names(&self, out: &mut BTreeSet<Ident>) {
        match self {
            Type::None | Type::Bool | Type::Int => {}
            Type::Array(index) => index.collect_names(out),
            Type::Tuple(elems) => {
                for elem in elems {
                    elem.collect_names(out);
                }
            }
            Type::Fun(param, result) => {
                param.collect_names(out);
                result.collect_names(out);
            }
            Type::Arith(a) => a.collect_names(out),
            Type::Boolean(b) => b.collect_names(out),
            Type::EVar(name) | Type::UVar(name) => {
                out.insert(name.clone());
            }
        }
    }

    /// Names of existential unification variables, at type or index level.
    pub fn evars(&self) -> BTreeSet<Ident> {
        let mut out = BTreeSet::new();
        self.collect_evars(&mut out);
        out
    }

    fn collect_evars(&self, out: &mut BTreeSet<Ident>) {
        match self {
            Type::None | Type::Bool | Type::Int | Type::UVar(_) => {}
            Type::Array(index) => index.collect_evars(out),
            Type::Tuple(elems) => {
                for elem in elems {
                    elem.collect_evars(out);
                }
            }
            Type::Fun(param, result) => {
                param.collect_evars(out);
                result.collect_evars(out);
            }
            Type::Arith(a) => a.collect_evars(out),
            Type::Boolean(b) => b.collect_evars(out),
            Type::EVar(name) => {
                out.insert(name.clone());
            }
        }
    }

    /// Names of universal scheme markers.
    pub fn uvars(&self) -> BTreeSet<Ident> {
        let mut out = BTreeSet::new();
        self.collect_uvars(&mut out);
        out
    }

    fn collect_uvars(&self, out: &mut BTreeSet<Ident>) {
        match self {
            Type::None | Type::Bool | Type::Int | Type::EVar(_) => {}
            Type::Array(_) | Type::Arith(_) | Type::Boolean(_) => {}
            Type::Tuple(elems) => {
                for elem in elems {
                    elem.collect_uvars(out);
                }
            }
            Type::Fun(param, result) => {
                param.collect_uvars(out);
                result.collect_uvars(out);
            }
            Type::UVar(name) => {
                out.insert(name.clone());
            }
        }
    }

    /// Variable occurrences as lookup keys for the substitution: type-level
    /// variables stay as they are, index-level variables are wrapped in their
    /// `Arith`/`Boolean` embedding.
    pub fn var_leaves(&self) -> BTreeSet<Type> {
        let mut out = BTreeSet::new();
        self.collect_var_leaves(&mut out);
        out
    }

    pub(crate) fn collect_var_leaves(&self, out: &mut BTreeSet<Type>) {
        match self {
            Type::None | Type::Bool | Type::Int => {}
            Type::Array(index) => collect_aexp_leaves(index, out),
            Type::Tuple(elems) => {
                for elem in elems {
                    elem.collect_var_leaves(out);
                }
            }
            Type::Fun(param, result) => {
                param.collect_var_leaves(out);
                result.collect_var_leaves(out);
            }
            Type::Arith(a) => collect_aexp_leaves(a, out),
            Type::Boolean(b) => collect_bexp_leaves(b, out),
            Type::EVar(_) | Type::UVar(_) => {
                out.insert(self.clone());
            }
        }
    }

    /// Structural rename of free names; flavors are preserved.
    pub fn renamed(&self, m: &BTreeMap<Ident, Ident>) -> Type {
        let rename = |name: &Ident| m.get(name).unwrap_or(name).clone();
        match self {
            Type::None => Type::None,
            Type::Bool => Type::Bool,
            Type::Int => Type::Int,
            Type::Array(index) => Type::Array(index.renamed(m)),
            Type::Tuple(elems) => Type::Tuple(elems.iter().map(|t| t.renamed(m)).collect()),
            Type::Fun(param, result) => Type::fun(param.renamed(m), result.renamed(m)),
            Type::Arith(a) => Type::Arith(a.renamed(m)),
            Type::Boolean(b) => Type::Boolean(b.renamed(m)),
            Type::EVar(name) => Type::EVar(rename(name)),
            Type::UVar(name) => Type::UVar(rename(name)),
        }
    }

    /// Renames every free name not in `fixed` to a globally fresh id. This is
    /// the generalization step producing a polymorphic scheme.
    pub fn fresh(&self, fixed: &BTreeSet<Ident>) -> Type {
        let mut m = BTreeMap::new();
        for name in self.names() {
            if !fixed.contains(&name) {
                m.insert(name.clone(), fresh_name());
            }
        }
        self.renamed(&m)
    }

    /// Converts every type-level `EVar` not in `fixed` back into a `UVar`,
    /// capturing the generalizable introductions of a function binding.
    pub fn flipped(&self, fixed: &BTreeSet<Ident>) -> Type {
        match self {
            Type::EVar(name) if !fixed.contains(name) => Type::UVar(name.clone()),
            Type::Array(_) | Type::Arith(_) | Type::Boolean(_) => self.clone(),
            Type::Tuple(elems) => Type::Tuple(elems.iter().map(|t| t.flipped(fixed)).collect()),
            Type::Fun(param, result) => Type::fun(param.flipped(fixed), result.flipped(fixed)),
            _ => self.clone(),
        }
    }

    /// Turns rigid index variables and `UVar` markers into unification
    /// variables of the same name. Instantiation is `eapp` after a fresh
    /// rename of the generalizable names.
    pub fn eapp(&self) -> Type {
        match self {
            Type::None => Type::None,
            Type::Bool => Type::Bool,
            Type::Int => Type::Int,
            Type::Array(index) => Type::Array(index.eapp()),
            Type::Tuple(elems) => Type::Tuple(elems.iter().map(|t| t.eapp()).collect()),
            Type::Fun(param, result) => Type::fun(param.eapp(), result.eapp()),
            Type::Arith(a) => Type::Arith(a.eapp()),
            Type::Boolean(b) => Type::Boolean(b.eapp()),
            Type::EVar(name) | Type::UVar(name) => Type::EVar(name.clone()),
        }
    }

    /// Deep-substitutes every variable occurrence with its representative
    /// under `subst`, normalizing recursively. Substitution starts only at
    /// variable leaves; compound terms are never looked up directly, they
    /// stay behind as residual equalities for the oracle.
    pub fn under(&self, subst: &Substitution) -> Type {
        match self {
            Type::EVar(_) | Type::UVar(_) => {
                let rep = subst.resolve(self);
                if rep == *self { rep } else { rep.under(subst) }
            }
            Type::Array(index) => Type::Array(index.under(subst)),
            Type::Tuple(elems) => Type::Tuple(elems.iter().map(|t| t.under(subst)).collect()),
            Type::Fun(param, result) => {
                Type::fun(param.under(subst), result.under(subst))
            }
            Type::Arith(a) => {
                if matches!(a, AExp::Var(_) | AExp::EVar(_)) {
                    let rep = subst.resolve(self);
                    if rep != *self {
                        return rep.under(subst);
                    }
                }
                Type::Arith(a.under(subst))
            }
            Type::Boolean(b) => {
                if matches!(b, BExp::Var(_) | BExp::EVar(_)) {
                    let rep = subst.resolve(self);
                    if rep != *self {
                        return rep.under(subst);
                    }
                }
                Type::Boolean(b.under(subst))
            }
            _ => self.clone(),
        }
    }

    /// Lowers an index-expression type to an oracle term. Types without an
    /// index-level meaning have no lowering.
    pub fn to_smt(&self) -> Option<Term> {
        match self {
            Type::Arith(a) => Some(a.to_smt()),
            Type::Boolean(b) => Some(b.to_smt()),
            _ => None,
        }
    }
}

fn collect_aexp_leaves(a: &AExp, out: &mut BTreeSet<Type>) {
    match a {
        AExp::Lit(_) => {}
        AExp::Var(_) | AExp::EVar(_) => {
            out.insert(Type::Arith(a.clone()));
        }
        AExp::Add(lhs, rhs) | AExp::Mul(lhs, rhs) => {
            collect_aexp_leaves(lhs, out);
            collect_aexp_leaves(rhs, out);
        }
    }
}

fn collect_bexp_leaves(b: &BExp, out: &mut BTreeSet<Type>) {
    match b {
        BExp::Lit(_) => {}
        BExp::Var(_) | BExp::EVar(_) => {
            out.insert(Type::Boolean(b.clone()));
        }
        BExp::Not(inner) => collect_bexp_leaves(inner, out),
        BExp::And(lhs, rhs) | BExp::Or(lhs, rhs) => {
            collect_bexp_leaves(lhs, out);
            collect_bexp_leaves(rhs, out);
        }
        BExp::Eq(lhs, rhs)
        | BExp::Lt(lhs, rhs)
        | BExp::Gt(lhs, rhs)
        | BExp::Le(lhs, rhs)
        | BExp::Ge(lhs, rhs) => {
            collect_aexp_leaves(lhs, out);
            collect_aexp_leaves(rhs, out);
        }
    }
}

impl AExp {
    pub fn under(&self, subst: &Substitution) -> AExp {
        match self {
            AExp::Var(_) | AExp::EVar(_) => {
                match subst.resolve(&Type::Arith(self.clone())) {
                    Type::Arith(rep) if rep != *self => rep.under(subst),
                    _ => self.clone(),
                }
            }
            AExp::Lit(n) => AExp::Lit(*n),
            AExp::Add(lhs, rhs) => AExp::add(lhs.under(subst), rhs.under(subst)),
            AExp::Mul(lhs, rhs) => AExp::mul(lhs.under(subst), rhs.under(subst)),
        }
    }
}

impl BExp {
    pub fn under(&self, subst: &Substitution) -> BExp {
        match self {
            BExp::Var(_) | BExp::EVar(_) => {
                match subst.resolve(&Type::Boolean(self.clone())) {
                    Type::Boolean(rep) if rep != *self => rep.under(subst),
                    _ => self.clone(),
                }
            }
            BExp::Lit(b) => BExp::Lit(*b),
            BExp::Not(inner) => BExp::not(inner.under(subst)),
            BExp::And(lhs, rhs) => BExp::and(lhs.under(subst), rhs.under(subst)),
            BExp::Or(lhs, rhs) => BExp::or(lhs.under(subst), rhs.under(subst)),
            BExp::Eq(lhs, rhs) => BExp::Eq(lhs.under(subst), rhs.under(subst)),
            BExp::Lt(lhs, rhs) => BExp::Lt(lhs.under(subst), rhs.under(subst)),
            BExp::Gt(lhs, rhs) => BExp::Gt(lhs.under(subst), rhs.under(subst)),
            BExp::Le(lhs, rhs) => BExp::Le(lhs.under(subst), rhs.under(subst)),
            BExp::Ge(lhs, rhs) => BExp::Ge(lhs.under(subst), rhs.under(subst)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avar(name: &str) -> AExp {
        AExp::Var(Ident::from(name))
    }

    #[test]
    fn fresh_renames_only_unprotected_names() {
        let t = Type::fun(
            Type::Tuple(vec![
                Type::Arith(avar("a")),
                Type::Array(AExp::add(avar("a"), AExp::Lit(1))),
                Type::Boolean(BExp::Var(Ident::from("p"))),
            ]),
            Type::Array(avar("a")),
        );
        let fixed: BTreeSet<Ident> = [Ident::from("p")].into();
        let renamed = t.fresh(&fixed);

        let kept: BTreeSet<Ident> =
            renamed.names().intersection(&t.names()).cloned().collect();
        assert_eq!(kept, fixed);
    }

    #[test]
    fn flipped_after_fresh_is_identity_up_to_renaming() {
        let scheme = Type::fun(
            Type::Tuple(vec![Type::EVar(Ident::from("x")), Type::EVar(Ident::from("y"))]),
            Type::EVar(Ident::from("x")),
        );
        let fixed = BTreeSet::new();
        let instantiated = scheme.fresh(&fixed).eapp();
        let regeneralized = instantiated.flipped(&fixed);

        // Same shape with a consistent renaming of the scheme variables.
        let Type::Fun(params, result) = &regeneralized else { panic!("expected function") };
        let Type::Tuple(elems) = &**params else { panic!("expected tuple") };
        let (Type::UVar(x), Type::UVar(y)) = (&elems[0], &elems[1]) else {
            panic!("expected re-generalized variables")
        };
        assert_ne!(x, y);
        assert_eq!(**result, Type::UVar(x.clone()));
    }

    #[test]
    fn eapp_turns_rigid_variables_into_unification_variables() {
        let t = Type::Array(AExp::add(avar("a"), AExp::Lit(1)));
        let Type::Array(AExp::Add(lhs, _)) = t.eapp() else { panic!("expected array") };
        assert_eq!(*lhs, AExp::EVar(Ident::from("a")));
    }

    #[test]
    fn uvars_are_instantiated_by_eapp() {
        let t = Type::fun(Type::UVar(Ident::from("x")), Type::UVar(Ident::from("x")));
        let Type::Fun(param, _) = t.eapp() else { panic!("expected function") };
        assert_eq!(*param, Type::EVar(Ident::from("x")));
    }
}
