use miette::Diagnostic;
use thiserror::Error;

use shapecheck_printer::Print;

use crate::subst::Substitution;
use crate::typ::Type;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("Cannot unify `{lhs}` with `{rhs}`: {reason}")]
#[diagnostic(code("S-001"))]
pub struct UnificationError {
    pub lhs: String,
    pub rhs: String,
    /// A short head-level description, stable enough to group failures by.
    pub reason: String,
}

impl UnificationError {
    fn mismatch(lhs: &Type, rhs: &Type, reason: String) -> Self {
        UnificationError { lhs: lhs.print_trace(), rhs: rhs.print_trace(), reason }
    }
}

/// Unifies two types under the given substitution.
///
/// Both sides are normalized first, so bare variables are seen through their
/// representatives. Index expressions never decompose structurally; they meet
/// in the substitution as equality constraints and are discharged by the
/// oracle. Bare `int` and `bool` erase to kinds and unify with any index
/// expression of the matching kind without producing a constraint.
pub fn unify(subst: &mut Substitution, t1: &Type, t2: &Type) -> Result<(), UnificationError> {
    let t1 = t1.under(subst);
    let t2 = t2.under(subst);

    if t1.is_unification_var() || t2.is_unification_var() {
        subst.union(t1, t2);
        return Ok(());
    }

    match (&t1, &t2) {
        (Type::Arith(_), Type::Arith(_)) | (Type::Boolean(_), Type::Boolean(_)) => {
            subst.union(t1.clone(), t2.clone());
            Ok(())
        }
        (Type::Array(lhs), Type::Array(rhs)) => {
            subst.union(Type::Arith(lhs.clone()), Type::Arith(rhs.clone()));
            Ok(())
        }
        (Type::None, Type::None) | (Type::Bool, Type::Bool) | (Type::Int, Type::Int) => Ok(()),
        (Type::Int, Type::Arith(_)) | (Type::Arith(_), Type::Int) => Ok(()),
        (Type::Bool, Type::Boolean(_)) | (Type::Boolean(_), Type::Bool) => Ok(()),
        (Type::Tuple(lhs), Type::Tuple(rhs)) => {
            if lhs.len() != rhs.len() {
                return Err(UnificationError::mismatch(
                    &t1,
                    &t2,
                    format!("tuple of {} vs tuple of {}", lhs.len(), rhs.len()),
                ));
            }
            for (l, r) in lhs.iter().zip(rhs.iter()) {
                unify(subst, l, r)?;
            }
            Ok(())
        }
        (Type::Fun(param1, result1), Type::Fun(param2, result2)) => {
            unify(subst, param1, param2)?;
            unify(subst, result1, result2)
        }
        _ => {
            let reason = format!("{} vs {}", t1.head(), t2.head());
            Err(UnificationError::mismatch(&t1, &t2, reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use shapecheck_ast::Ident;

    use super::*;
    use crate::exp::{AExp, BExp};

    #[test]
    fn literal_kinds_do_not_mix() {
        let mut subst = Substitution::new();
        let err = unify(&mut subst, &Type::Boolean(BExp::Lit(true)), &Type::None).unwrap_err();
        assert_eq!(err.reason, "boolean expression vs None");
    }

    #[test]
    fn array_payloads_become_constraints() {
        let mut subst = Substitution::new();
        let lhs = Type::Array(AExp::add(AExp::Var(Ident::from("a")), AExp::Lit(1)));
        let rhs = Type::Array(AExp::Lit(4));
        unify(&mut subst, &lhs, &rhs).unwrap();
        assert_eq!(subst.equalities().count(), 1);
    }

    #[test]
    fn evars_take_concrete_representatives() {
        let mut subst = Substitution::new();
        let evar = Type::Arith(AExp::EVar(Ident::from("k")));
        unify(&mut subst, &evar, &Type::Arith(AExp::Lit(3))).unwrap();
        assert_eq!(evar.under(&subst), Type::Arith(AExp::Lit(3)));
    }

    #[test]
    fn functions_unify_pointwise() {
        let mut subst = Substitution::new();
        let a = Ident::from("a");
        let b = Ident::from("b");
        let lhs = Type::fun(Type::EVar(a.clone()), Type::EVar(b.clone()));
        let rhs = Type::fun(Type::Int, Type::Bool);
        unify(&mut subst, &lhs, &rhs).unwrap();
        assert_eq!(Type::EVar(a).under(&subst), Type::Int);
        assert_eq!(Type::EVar(b).under(&subst), Type::Bool);
    }

    #[test]
    fn tuple_arity_mismatch_has_a_reason() {
        let mut subst = Substitution::new();
        let err = unify(
            &mut subst,
            &Type::Tuple(vec![Type::Int]),
            &Type::Tuple(vec![Type::Int, Type::Int]),
        )
        .unwrap_err();
        assert_eq!(err.reason, "tuple of 1 vs tuple of 2");
    }

    #[test]
    fn bare_kinds_erase_against_index_expressions() {
        let mut subst = Substitution::new();
        unify(&mut subst, &Type::Int, &Type::Arith(AExp::Lit(3))).unwrap();
        unify(&mut subst, &Type::Bool, &Type::Boolean(BExp::Lit(false))).unwrap();
        assert_eq!(subst.equalities().count(), 0);
    }

    #[test]
    fn unification_goes_through_representatives() {
        let mut subst = Substitution::new();
        let k = Type::Arith(AExp::EVar(Ident::from("k")));
        unify(&mut subst, &k, &Type::Arith(AExp::Lit(4))).unwrap();
        // k is now 4; a second unification with 5 must leave a residual 4 = 5.
        unify(&mut subst, &k, &Type::Arith(AExp::Lit(5))).unwrap();
        let names: BTreeSet<_> = subst.equalities().collect();
        assert_eq!(names.len(), 1);
    }
}
