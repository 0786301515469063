//! A decision procedure for the constraint fragment the checker emits.
//!
//! Formulas are prenex `forall F. exists E. D1 or ... or Dn` where each
//! disjunct is a conjunction of linear integer equalities and boolean
//! constraints. Each disjunct is judged on its own:
//!
//! - `Sat` means the disjunct holds for every assignment of the universal
//!   variables, witnessed by existential variables solved as functions of the
//!   universals. One such disjunct makes the whole formula satisfiable.
//! - `UnsatConst` means the disjunct is false regardless of the universal
//!   variables. A formula whose disjuncts are all `UnsatConst` is
//!   unsatisfiable.
//! - `UnsatUniversal` means the disjunct fails for at least one universal
//!   assignment. That settles a single-disjunct formula, but with several
//!   disjuncts another one may cover the gap, so the answer degrades to
//!   `Unknown`.
//!
//! Integer solvability is relaxed to the rationals; anything outside the
//! fragment (inequalities over variables, non-linear products, nested
//! quantifiers) lowers the verdict to `Unknown`, never to `Unsat`.

use std::collections::BTreeMap;

use log::trace;

use shapecheck_printer::Print;

use crate::solver::{SmtResult, Solver};
use crate::term::Term;

pub struct LinearSolver {
    assertions: Vec<Term>,
}

impl LinearSolver {
    pub fn new() -> Self {
        LinearSolver { assertions: Vec::new() }
    }
}

impl Default for LinearSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for LinearSolver {
    fn assert(&mut self, term: Term) {
        self.assertions.push(term);
    }

    fn check(&mut self) -> SmtResult {
        let term = Term::and(self.assertions.clone());
        trace!("smt check: {}", term.print_trace());
        let result = decide(&term);
        trace!("smt verdict: {result:?}");
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Verdict {
    Sat,
    Unknown,
    UnsatUniversal,
    UnsatConst,
}

fn decide(term: &Term) -> SmtResult {
    // Strip the prenex quantifier chain; free variables count as existential.
    let mut universals: Vec<String> = Vec::new();
    let mut body = term;
    loop {
        match body {
            Term::Forall(vars, inner) => {
                universals.extend(vars.iter().map(|(name, _)| name.clone()));
                body = inner;
            }
            Term::Exists(_, inner) => {
                body = inner;
            }
            _ => break,
        }
    }

    let disjuncts: Vec<&Term> = match body {
        Term::Or(terms) => terms.iter().collect(),
        other => vec![other],
    };

    let verdicts: Vec<Verdict> =
        disjuncts.iter().map(|disjunct| decide_disjunct(disjunct, &universals)).collect();

    if verdicts.iter().any(|v| *v == Verdict::Sat) {
        SmtResult::Sat
    } else if verdicts.iter().all(|v| *v == Verdict::UnsatConst) {
        SmtResult::Unsat
    } else if verdicts.len() == 1 && verdicts[0] == Verdict::UnsatUniversal {
        SmtResult::Unsat
    } else {
        SmtResult::Unknown
    }
}

fn decide_disjunct(disjunct: &Term, universals: &[String]) -> Verdict {
    let mut atoms = Vec::new();
    flatten_conjuncts(disjunct, &mut atoms);

    let is_universal = |name: &str| universals.iter().any(|u| u == name);

    let mut verdict = Verdict::Sat;
    let mut rows: Vec<LinExpr> = Vec::new();
    let mut bools: BTreeMap<String, bool> = BTreeMap::new();
    let mut pending: Vec<&Term> = Vec::new();

    // First pass: peel off linear equations and unit boolean facts.
    for atom in atoms {
        if let Term::Eq(lhs, rhs) = atom {
            if let (Some(l), Some(r)) = (linearize(lhs), linearize(rhs)) {
                rows.push(l.sub(&r));
                continue;
            }
        }
        match unit_bool(atom) {
            Some((name, value)) => {
                if is_universal(&name) {
                    // `p` must hold for every p.
                    verdict = verdict.max(Verdict::UnsatUniversal);
                } else {
                    match bools.get(&name) {
                        Some(prev) if *prev != value => return Verdict::UnsatConst,
                        _ => {
                            bools.insert(name, value);
                        }
                    }
                }
            }
            None => pending.push(atom),
        }
    }

    // Second pass: evaluate what is left under the accumulated assignment.
    for atom in pending {
        match eval_bool(atom, &bools) {
            Some(true) => {}
            Some(false) => return Verdict::UnsatConst,
            None => verdict = verdict.max(Verdict::Unknown),
        }
    }

    verdict.max(solve_rows(rows, &is_universal))
}

fn flatten_conjuncts<'a>(term: &'a Term, out: &mut Vec<&'a Term>) {
    match term {
        Term::And(terms) => {
            for inner in terms {
                flatten_conjuncts(inner, out);
            }
        }
        _ => out.push(term),
    }
}

/// Recognizes atoms that pin a boolean variable: `p`, `not p`, `p = true`.
fn unit_bool(atom: &Term) -> Option<(String, bool)> {
    match atom {
        Term::BoolVar(name) => Some((name.clone(), true)),
        Term::Not(inner) => {
            let (name, value) = unit_bool(inner)?;
            Some((name, !value))
        }
        Term::Eq(lhs, rhs) => match (&**lhs, &**rhs) {
            (Term::BoolVar(name), Term::BoolLit(value))
            | (Term::BoolLit(value), Term::BoolVar(name)) => Some((name.clone(), *value)),
            _ => None,
        },
        _ => None,
    }
}

fn eval_bool(term: &Term, bools: &BTreeMap<String, bool>) -> Option<bool> {
    match term {
        Term::BoolLit(b) => Some(*b),
        Term::BoolVar(name) => bools.get(name).copied(),
        Term::Not(inner) => eval_bool(inner, bools).map(|b| !b),
        Term::And(terms) => {
            let mut all_known = true;
            for inner in terms {
                match eval_bool(inner, bools) {
                    Some(false) => return Some(false),
                    Some(true) => {}
                    None => all_known = false,
                }
            }
            if all_known { Some(true) } else { None }
        }
        Term::Or(terms) => {
            let mut all_known = true;
            for inner in terms {
                match eval_bool(inner, bools) {
                    Some(true) => return Some(true),
                    Some(false) => {}
                    None => all_known = false,
                }
            }
            if all_known { Some(false) } else { None }
        }
        Term::Eq(lhs, rhs) => {
            if let (Some(l), Some(r)) = (linearize(lhs), linearize(rhs)) {
                return l.sub(&r).as_constant().map(|c| c.is_zero());
            }
            match (eval_bool(lhs, bools), eval_bool(rhs, bools)) {
                (Some(l), Some(r)) => Some(l == r),
                _ => None,
            }
        }
        Term::Lt(lhs, rhs) => compare_constants(lhs, rhs, |o| o == std::cmp::Ordering::Less),
        Term::Gt(lhs, rhs) => compare_constants(lhs, rhs, |o| o == std::cmp::Ordering::Greater),
        Term::Le(lhs, rhs) => compare_constants(lhs, rhs, |o| o != std::cmp::Ordering::Greater),
        Term::Ge(lhs, rhs) => compare_constants(lhs, rhs, |o| o != std::cmp::Ordering::Less),
        _ => None,
    }
}

fn compare_constants(
    lhs: &Term,
    rhs: &Term,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Option<bool> {
    let diff = linearize(lhs)?.sub(&linearize(rhs)?);
    let constant = diff.as_constant()?;
    Some(accept(constant.cmp_zero()))
}

// Linear arithmetic
//
//

/// An exact rational; denominators stay positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rat {
    num: i128,
    den: i128,
}

impl Rat {
    const ZERO: Rat = Rat { num: 0, den: 1 };

    fn from_int(n: i64) -> Rat {
        Rat { num: n as i128, den: 1 }
    }

    fn normalized(num: i128, den: i128) -> Rat {
        debug_assert!(den != 0);
        let sign = if den < 0 { -1 } else { 1 };
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i128;
        Rat { num: sign * num / g, den: sign * den / g }
    }

    fn is_zero(&self) -> bool {
        self.num == 0
    }

    fn add(&self, other: &Rat) -> Rat {
        Rat::normalized(self.num * other.den + other.num * self.den, self.den * other.den)
    }

    fn sub(&self, other: &Rat) -> Rat {
        Rat::normalized(self.num * other.den - other.num * self.den, self.den * other.den)
    }

    fn mul(&self, other: &Rat) -> Rat {
        Rat::normalized(self.num * other.num, self.den * other.den)
    }

    fn div(&self, other: &Rat) -> Rat {
        Rat::normalized(self.num * other.den, self.den * other.num)
    }

    fn cmp_zero(&self) -> std::cmp::Ordering {
        self.num.cmp(&0)
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// `constant + sum(coeffs[v] * v)`.
#[derive(Debug, Clone)]
struct LinExpr {
    coeffs: BTreeMap<String, Rat>,
    constant: Rat,
}

impl LinExpr {
    fn constant(c: Rat) -> LinExpr {
        LinExpr { coeffs: BTreeMap::new(), constant: c }
    }

    fn var(name: &str) -> LinExpr {
        let mut coeffs = BTreeMap::new();
        coeffs.insert(name.to_owned(), Rat::from_int(1));
        LinExpr { coeffs, constant: Rat::ZERO }
    }

    fn add(&self, other: &LinExpr) -> LinExpr {
        let mut coeffs = self.coeffs.clone();
        for (name, c) in &other.coeffs {
            let entry = coeffs.entry(name.clone()).or_insert(Rat::ZERO);
            *entry = entry.add(c);
        }
        coeffs.retain(|_, c| !c.is_zero());
        LinExpr { coeffs, constant: self.constant.add(&other.constant) }
    }

    fn sub(&self, other: &LinExpr) -> LinExpr {
        self.add(&other.scale(&Rat::from_int(-1)))
    }

    fn scale(&self, factor: &Rat) -> LinExpr {
        if factor.is_zero() {
            return LinExpr::constant(Rat::ZERO);
        }
        let coeffs = self.coeffs.iter().map(|(n, c)| (n.clone(), c.mul(factor))).collect();
        LinExpr { coeffs, constant: self.constant.mul(factor) }
    }

    fn as_constant(&self) -> Option<Rat> {
        if self.coeffs.is_empty() { Some(self.constant) } else { None }
    }
}

fn linearize(term: &Term) -> Option<LinExpr> {
    match term {
        Term::IntLit(n) => Some(LinExpr::constant(Rat::from_int(*n))),
        Term::IntVar(name) => Some(LinExpr::var(name)),
        Term::Add(lhs, rhs) => Some(linearize(lhs)?.add(&linearize(rhs)?)),
        Term::Mul(lhs, rhs) => {
            let l = linearize(lhs)?;
            let r = linearize(rhs)?;
            match (l.as_constant(), r.as_constant()) {
                (Some(c), _) => Some(r.scale(&c)),
                (_, Some(c)) => Some(l.scale(&c)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Gaussian elimination of the existential variables, then a judgment on what
/// is left: a nonzero constant row contradicts outright, a row still naming a
/// universal variable can only hold on a strict subset of its values.
fn solve_rows(mut rows: Vec<LinExpr>, is_universal: &impl Fn(&str) -> bool) -> Verdict {
    loop {
        let pivot = rows.iter().enumerate().find_map(|(idx, row)| {
            row.coeffs
                .iter()
                .find(|(name, c)| !is_universal(name) && !c.is_zero())
                .map(|(name, _)| (idx, name.clone()))
        });
        let Some((idx, var)) = pivot else { break };
        let row = rows.remove(idx);
        let c = row.coeffs[&var];
        for other in &mut rows {
            if let Some(k) = other.coeffs.get(&var).copied() {
                *other = other.sub(&row.scale(&k.div(&c)));
                other.coeffs.remove(&var);
            }
        }
    }

    let mut verdict = Verdict::Sat;
    for row in rows {
        if row.coeffs.is_empty() {
            if !row.constant.is_zero() {
                return Verdict::UnsatConst;
            }
        } else {
            verdict = verdict.max(Verdict::UnsatUniversal);
        }
    }
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_solver;
    use crate::term::Sort;

    fn ivar(name: &str) -> Term {
        Term::IntVar(name.to_owned())
    }

    fn check(term: Term) -> SmtResult {
        let mut solver = make_solver();
        solver.assert(term);
        solver.check()
    }

    #[test]
    fn conflicting_constants_are_unsat() {
        let term = Term::Exists(
            vec![("k".to_owned(), Sort::Int)],
            Box::new(Term::and(vec![
                Term::eq(ivar("k"), Term::IntLit(3)),
                Term::eq(ivar("k"), Term::IntLit(4)),
            ])),
        );
        assert_eq!(check(term), SmtResult::Unsat);
    }

    #[test]
    fn universal_offset_equation_is_unsat() {
        // forall a. a + 2 = a + 1
        let term = Term::Forall(
            vec![("a".to_owned(), Sort::Int)],
            Box::new(Term::eq(
                Term::Add(Box::new(ivar("a")), Box::new(Term::IntLit(2))),
                Term::Add(Box::new(ivar("a")), Box::new(Term::IntLit(1))),
            )),
        );
        assert_eq!(check(term), SmtResult::Unsat);
    }

    #[test]
    fn skolemizable_equation_is_sat() {
        // forall a. exists k. k = a + 1
        let term = Term::Forall(
            vec![("a".to_owned(), Sort::Int)],
            Box::new(Term::Exists(
                vec![("k".to_owned(), Sort::Int)],
                Box::new(Term::eq(
                    ivar("k"),
                    Term::Add(Box::new(ivar("a")), Box::new(Term::IntLit(1))),
                )),
            )),
        );
        assert_eq!(check(term), SmtResult::Sat);
    }

    #[test]
    fn one_live_disjunct_saves_the_formula() {
        let term = Term::or(vec![
            Term::and(vec![Term::BoolLit(false)]),
            Term::and(vec![
                Term::Not(Box::new(Term::BoolLit(false))),
                Term::eq(
                    Term::Add(Box::new(Term::IntLit(1)), Box::new(Term::IntLit(2))),
                    Term::IntLit(3),
                ),
            ]),
        ]);
        assert_eq!(check(term), SmtResult::Sat);
    }

    #[test]
    fn pinning_a_universal_boolean_is_unsat() {
        // forall p. p
        let term = Term::Forall(
            vec![("p".to_owned(), Sort::Bool)],
            Box::new(Term::BoolVar("p".to_owned())),
        );
        assert_eq!(check(term), SmtResult::Unsat);
    }

    #[test]
    fn universal_disjunction_stays_unknown() {
        // forall p. p or not p — valid, but out of fragment per disjunct.
        let term = Term::Forall(
            vec![("p".to_owned(), Sort::Bool)],
            Box::new(Term::or(vec![
                Term::BoolVar("p".to_owned()),
                Term::Not(Box::new(Term::BoolVar("p".to_owned()))),
            ])),
        );
        assert_eq!(check(term), SmtResult::Unknown);
    }

    #[test]
    fn contradictory_boolean_facts_are_unsat() {
        let term = Term::and(vec![
            Term::BoolVar("q".to_owned()),
            Term::Not(Box::new(Term::BoolVar("q".to_owned()))),
        ]);
        assert_eq!(check(term), SmtResult::Unsat);
    }

    #[test]
    fn ground_comparisons_fold() {
        assert_eq!(check(Term::Lt(Box::new(Term::IntLit(1)), Box::new(Term::IntLit(2)))), SmtResult::Sat);
        assert_eq!(
            check(Term::Gt(Box::new(Term::IntLit(1)), Box::new(Term::IntLit(2)))),
            SmtResult::Unsat
        );
    }

    #[test]
    fn inequalities_over_variables_are_unknown() {
        let term = Term::Lt(Box::new(ivar("n")), Box::new(Term::IntLit(2)));
        assert_eq!(check(term), SmtResult::Unknown);
    }
}
