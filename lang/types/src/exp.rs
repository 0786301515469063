use std::collections::{BTreeMap, BTreeSet};

use shapecheck_ast::Ident;
use shapecheck_smt::Term;

/// A type-level arithmetic index expression.
///
/// `Var` is a rigid variable introduced by an annotation; `EVar` is its
/// unification flavor, produced by `eapp` during instantiation.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum AExp {
    Lit(i64),
    Var(Ident),
    EVar(Ident),
    Add(Box<AExp>, Box<AExp>),
    Mul(Box<AExp>, Box<AExp>),
}

impl AExp {
    pub fn add(lhs: AExp, rhs: AExp) -> AExp {
        AExp::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn mul(lhs: AExp, rhs: AExp) -> AExp {
        AExp::Mul(Box::new(lhs), Box::new(rhs))
    }

    pub fn collect_names(&self, out: &mut BTreeSet<Ident>) {
        match self {
            AExp::Lit(_) => {}
            AExp::Var(name) | AExp::EVar(name) => {
                out.insert(name.clone());
            }
            AExp::Add(lhs, rhs) | AExp::Mul(lhs, rhs) => {
                lhs.collect_names(out);
                rhs.collect_names(out);
            }
        }
    }

    pub fn collect_evars(&self, out: &mut BTreeSet<Ident>) {
        match self {
            AExp::Lit(_) | AExp::Var(_) => {}
            AExp::EVar(name) => {
                out.insert(name.clone());
            }
            AExp::Add(lhs, rhs) | AExp::Mul(lhs, rhs) => {
                lhs.collect_evars(out);
                rhs.collect_evars(out);
            }
        }
    }

    pub fn renamed(&self, m: &BTreeMap<Ident, Ident>) -> AExp {
        let rename = |name: &Ident| m.get(name).unwrap_or(name).clone();
        match self {
            AExp::Lit(n) => AExp::Lit(*n),
            AExp::Var(name) => AExp::Var(rename(name)),
            AExp::EVar(name) => AExp::EVar(rename(name)),
            AExp::Add(lhs, rhs) => AExp::add(lhs.renamed(m), rhs.renamed(m)),
            AExp::Mul(lhs, rhs) => AExp::mul(lhs.renamed(m), rhs.renamed(m)),
        }
    }

    /// Turns rigid variables into unification variables of the same name.
    pub fn eapp(&self) -> AExp {
        match self {
            AExp::Lit(n) => AExp::Lit(*n),
            AExp::Var(name) | AExp::EVar(name) => AExp::EVar(name.clone()),
            AExp::Add(lhs, rhs) => AExp::add(lhs.eapp(), rhs.eapp()),
            AExp::Mul(lhs, rhs) => AExp::mul(lhs.eapp(), rhs.eapp()),
        }
    }

    pub fn to_smt(&self) -> Term {
        match self {
            AExp::Lit(n) => Term::IntLit(*n),
            AExp::Var(name) | AExp::EVar(name) => Term::IntVar(name.id.clone()),
            AExp::Add(lhs, rhs) => Term::Add(Box::new(lhs.to_smt()), Box::new(rhs.to_smt())),
            AExp::Mul(lhs, rhs) => Term::Mul(Box::new(lhs.to_smt()), Box::new(rhs.to_smt())),
        }
    }
}

/// A type-level boolean index expression over [`AExp`].
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum BExp {
    Lit(bool),
    Var(Ident),
    EVar(Ident),
    Not(Box<BExp>),
    And(Box<BExp>, Box<BExp>),
    Or(Box<BExp>, Box<BExp>),
    Eq(AExp, AExp),
    Lt(AExp, AExp),
    Gt(AExp, AExp),
    Le(AExp, AExp),
    Ge(AExp, AExp),
}

impl BExp {
    pub fn not(inner: BExp) -> BExp {
        BExp::Not(Box::new(inner))
    }

    pub fn and(lhs: BExp, rhs: BExp) -> BExp {
        BExp::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: BExp, rhs: BExp) -> BExp {
        BExp::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn collect_names(&self, out: &mut BTreeSet<Ident>) {
        match self {
            BExp::Lit(_) => {}
            BExp::Var(name) | BExp::EVar(name) => {
                out.insert(name.clone());
            }
            BExp::Not(inner) => inner.collect_names(out),
            BExp::And(lhs, rhs) | BExp::Or(lhs, rhs) => {
                lhs.collect_names(out);
                rhs.collect_names(out);
            }
            BExp::Eq(lhs, rhs)
            | BExp::Lt(lhs, rhs)
            | BExp::Gt(lhs, rhs)
            | BExp::Le(lhs, rhs)
            | BExp::Ge(lhs, rhs) => {
                lhs.collect_names(out);
                rhs.collect_names(out);
            }
        }
    }

    pub fn collect_evars(&self, out: &mut BTreeSet<Ident>) {
        match self {
            BExp::Lit(_) | BExp::Var(_) => {}
            BExp::EVar(name) => {
                out.insert(name.clone());
            }
            BExp::Not(inner) => inner.collect_evars(out),
            BExp::And(lhs, rhs) | BExp::Or(lhs, rhs) => {
                lhs.collect_evars(out);
                rhs.collect_evars(out);
            }
            BExp::Eq(lhs, rhs)
            | BExp::Lt(lhs, rhs)
            | BExp::Gt(lhs, rhs)
            | BExp::Le(lhs, rhs)
            | BExp::Ge(lhs, rhs) => {
                lhs.collect_evars(out);
                rhs.collect_evars(out);
            }
        }
    }

    pub fn renamed(&self, m: &BTreeMap<Ident, Ident>) -> BExp {
        let rename = |name: &Ident| m.get(name).unwrap_or(name).clone();
        match self {
            BExp::Lit(b) => BExp::Lit(*b),
            BExp::Var(name) => BExp::Var(rename(name)),
            BExp::EVar(name) => BExp::EVar(rename(name)),
            BExp::Not(inner) => BExp::not(inner.renamed(m)),
            BExp::And(lhs, rhs) => BExp::and(lhs.renamed(m), rhs.renamed(m)),
            BExp::Or(lhs, rhs) => BExp::or(lhs.renamed(m), rhs.renamed(m)),
            BExp::Eq(lhs, rhs) => BExp::Eq(lhs.renamed(m), rhs.renamed(m)),
            BExp::Lt(lhs, rhs) => BExp::Lt(lhs.renamed(m), rhs.renamed(m)),
            BExp::Gt(lhs, rhs) => BExp::Gt(lhs.renamed(m), rhs.renamed(m)),
            BExp::Le(lhs, rhs) => BExp::Le(lhs.renamed(m), rhs.renamed(m)),
            BExp::Ge(lhs, rhs) => BExp::Ge(lhs.renamed(m), rhs.renamed(m)),
        }
    }

    /// Turns rigid variables into unification variables of the same name.
    pub fn eapp(&self) -> BExp {
        match self {
            BExp::Lit(b) => BExp::Lit(*b),
            BExp::Var(name) | BExp::EVar(name) => BExp::EVar(name.clone()),
            BExp::Not(inner) => BExp::not(inner.eapp()),
            BExp::And(lhs, rhs) => BExp::and(lhs.eapp(), rhs.eapp()),
            BExp::Or(lhs, rhs) => BExp::or(lhs.eapp(), rhs.eapp()),
            BExp::Eq(lhs, rhs) => BExp::Eq(lhs.eapp(), rhs.eapp()),
            BExp::Lt(lhs, rhs) => BExp::Lt(lhs.eapp(), rhs.eapp()),
            BExp::Gt(lhs, rhs) => BExp::Gt(lhs.eapp(), rhs.eapp()),
            BExp::Le(lhs, rhs) => BExp::Le(lhs.eapp(), rhs.eapp()),
            BExp::Ge(lhs, rhs) => BExp::Ge(lhs.eapp(), rhs.eapp()),
        }
    }

    pub fn to_smt(&self) -> Term {
        match self {
            BExp::Lit(b) => Term::BoolLit(*b),
            BExp::Var(name) | BExp::EVar(name) => Term::BoolVar(name.id.clone()),
            BExp::Not(inner) => Term::Not(Box::new(inner.to_smt())),
            BExp::And(lhs, rhs) => Term::And(vec![lhs.to_smt(), rhs.to_smt()]),
            BExp::Or(lhs, rhs) => Term::Or(vec![lhs.to_smt(), rhs.to_smt()]),
            BExp::Eq(lhs, rhs) => Term::eq(lhs.to_smt(), rhs.to_smt()),
            BExp::Lt(lhs, rhs) => Term::Lt(Box::new(lhs.to_smt()), Box::new(rhs.to_smt())),
            BExp::Gt(lhs, rhs) => Term::Gt(Box::new(lhs.to_smt()), Box::new(rhs.to_smt())),
            BExp::Le(lhs, rhs) => Term::Le(Box::new(lhs.to_smt()), Box::new(rhs.to_smt())),
            BExp::Ge(lhs, rhs) => Term::Ge(Box::new(lhs.to_smt()), Box::new(rhs.to_smt())),
        }
    }
}
