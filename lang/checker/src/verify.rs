use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use shapecheck_ast::Ident;
use shapecheck_printer::Print;
use shapecheck_smt::{make_solver, SmtResult, Solver, Sort, Term};

use crate::context::Context;
use crate::result::{CheckResult, TypeError};

/// Converts a set of candidate contexts into one quantified formula and asks
/// the oracle whether it is satisfiable.
///
/// Each context contributes the conjunction of its substitution constraints
/// and assumptions; the set becomes a disjunction (the evaluator's branch
/// fan-out). Fixed variables are universally quantified — the constraints
/// must hold for every concrete instantiation of user-declared parameters —
/// and all remaining variables existentially.
pub fn verify(contexts: &[Context]) -> CheckResult<()> {
    let disjuncts: Vec<Term> = contexts.iter().map(context_formula).collect();
    let body = Term::or(disjuncts);

    let fixed: BTreeSet<Ident> =
        contexts.iter().flat_map(|ctx| ctx.fixed.iter().cloned()).collect();

    let mut vars: BTreeMap<String, Sort> = BTreeMap::new();
    collect_vars(&body, &mut vars);

    let mut universals = Vec::new();
    let mut existentials = Vec::new();
    for (name, sort) in vars {
        if fixed.contains(&Ident::from(name.as_str())) {
            universals.push((name, sort));
        } else {
            existentials.push((name, sort));
        }
    }

    let mut formula = body;
    if !existentials.is_empty() {
        formula = Term::Exists(existentials, Box::new(formula));
    }
    if !universals.is_empty() {
        formula = Term::Forall(universals, Box::new(formula));
    }

    trace!("verify: {}", formula.print_trace());

    let mut solver = make_solver();
    solver.assert(formula);
    match solver.check() {
        SmtResult::Unsat => Err(TypeError::unsat(None)),
        SmtResult::Sat | SmtResult::Unknown => Ok(()),
    }
}

fn context_formula(ctx: &Context) -> Term {
    let mut conjuncts = ctx.subst.to_smt();
    conjuncts.extend(ctx.assumptions.iter().map(|b| b.under(&ctx.subst).to_smt()));
    Term::and(conjuncts)
}

fn collect_vars(term: &Term, out: &mut BTreeMap<String, Sort>) {
    match term {
        Term::IntLit(_) | Term::BoolLit(_) => {}
        Term::IntVar(name) => {
            out.insert(name.clone(), Sort::Int);
        }
        Term::BoolVar(name) => {
            out.insert(name.clone(), Sort::Bool);
        }
        Term::Add(lhs, rhs)
        | Term::Mul(lhs, rhs)
        | Term::Eq(lhs, rhs)
        | Term::Lt(lhs, rhs)
        | Term::Gt(lhs, rhs)
        | Term::Le(lhs, rhs)
        | Term::Ge(lhs, rhs) => {
            collect_vars(lhs, out);
            collect_vars(rhs, out);
        }
        Term::Not(inner) => collect_vars(inner, out),
        Term::And(terms) | Term::Or(terms) => {
            for inner in terms {
                collect_vars(inner, out);
            }
        }
        Term::Forall(_, body) | Term::Exists(_, body) => collect_vars(body, out),
    }
}

#[cfg(test)]
mod tests {
    use shapecheck_types::{AExp, BExp, Type};

    use super::*;

    fn evar(name: &str) -> Type {
        Type::Arith(AExp::EVar(Ident::from(name)))
    }

    #[test]
    fn empty_context_verifies() {
        verify(&[Context::new()]).unwrap();
    }

    #[test]
    fn conflicting_shape_constraints_are_rejected() {
        let mut ctx = Context::new();
        ctx.unify(&evar("k"), &Type::Arith(AExp::Lit(4))).unwrap();
        ctx.unify(&evar("k"), &Type::Arith(AExp::Lit(5))).unwrap();
        let err = verify(std::slice::from_ref(&ctx)).unwrap_err();
        assert!(matches!(err, TypeError::UnsatisfiableConstraint { .. }));
    }

    #[test]
    fn a_false_branch_is_saved_by_its_sibling() {
        let mut dead = Context::new();
        dead.assume(BExp::Lit(false));
        dead.unify(&evar("k"), &Type::Arith(AExp::Lit(4))).unwrap();
        dead.unify(&evar("k"), &Type::Arith(AExp::Lit(5))).unwrap();

        let live = Context::new();
        verify(&[dead, live]).unwrap();
    }

    #[test]
    fn universal_equation_with_offset_is_rejected() {
        // b : array[a], smush(add_row(b), zeros(a + 2)) forces a + 1 = a + 2.
        let a = || AExp::Var(Ident::from("a"));
        let mut ctx = Context::new();
        ctx.fix([Ident::from("a")]);
        ctx.unify(
            &Type::Array(AExp::add(a(), AExp::Lit(1))),
            &Type::Array(AExp::add(a(), AExp::Lit(2))),
        )
        .unwrap();
        let err = verify(std::slice::from_ref(&ctx)).unwrap_err();
        assert!(matches!(err, TypeError::UnsatisfiableConstraint { .. }));
    }
}
