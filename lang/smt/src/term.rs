use pretty::DocAllocator;

use shapecheck_printer::{Alloc, Builder, Print, PrintCfg};

/// The sort of a quantified variable.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Sort {
    Int,
    Bool,
}

/// A first-order term over linear integer arithmetic and booleans.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Term {
    IntLit(i64),
    BoolLit(bool),
    IntVar(String),
    BoolVar(String),
    Add(Box<Term>, Box<Term>),
    Mul(Box<Term>, Box<Term>),
    Not(Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
    Eq(Box<Term>, Box<Term>),
    Lt(Box<Term>, Box<Term>),
    Gt(Box<Term>, Box<Term>),
    Le(Box<Term>, Box<Term>),
    Ge(Box<Term>, Box<Term>),
    Forall(Vec<(String, Sort)>, Box<Term>),
    Exists(Vec<(String, Sort)>, Box<Term>),
}

impl Term {
    pub fn eq(lhs: Term, rhs: Term) -> Term {
        Term::Eq(Box::new(lhs), Box::new(rhs))
    }

    /// Conjunction; collapses the trivial cases.
    pub fn and(mut terms: Vec<Term>) -> Term {
        match terms.len() {
            0 => Term::BoolLit(true),
            1 => terms.pop().expect("len checked"),
            _ => Term::And(terms),
        }
    }

    /// Disjunction; collapses the trivial cases.
    pub fn or(mut terms: Vec<Term>) -> Term {
        match terms.len() {
            0 => Term::BoolLit(false),
            1 => terms.pop().expect("len checked"),
            _ => Term::Or(terms),
        }
    }
}

fn binder<'a>(
    keyword: &'static str,
    vars: &'a [(String, Sort)],
    body: &'a Term,
    cfg: &PrintCfg,
    alloc: &'a Alloc<'a>,
) -> Builder<'a> {
    let vars = alloc.intersperse(
        vars.iter().map(|(name, sort)| {
            let sort = match sort {
                Sort::Int => "Int",
                Sort::Bool => "Bool",
            };
            alloc.text(name.clone()).append(": ").append(sort)
        }),
        alloc.text(", "),
    );
    alloc
        .text(keyword)
        .append(alloc.space())
        .append(vars)
        .append(". ")
        .append(body.print(cfg, alloc))
}

fn infix<'a>(
    op: &'static str,
    lhs: &'a Term,
    rhs: &'a Term,
    cfg: &PrintCfg,
    alloc: &'a Alloc<'a>,
) -> Builder<'a> {
    lhs.print(cfg, alloc)
        .append(alloc.space())
        .append(op)
        .append(alloc.space())
        .append(rhs.print(cfg, alloc))
        .parens()
}

impl Print for Term {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            Term::IntLit(n) => alloc.text(format!("{n}")),
            Term::BoolLit(b) => alloc.text(format!("{b}")),
            Term::IntVar(name) | Term::BoolVar(name) => alloc.text(name.clone()),
            Term::Add(lhs, rhs) => infix("+", lhs, rhs, cfg, alloc),
            Term::Mul(lhs, rhs) => infix("*", lhs, rhs, cfg, alloc),
            Term::Not(inner) => alloc.text("not ").append(inner.print(cfg, alloc).parens()),
            Term::And(terms) => alloc
                .intersperse(terms.iter().map(|t| t.print(cfg, alloc)), alloc.text(" and "))
                .parens(),
            Term::Or(terms) => alloc
                .intersperse(terms.iter().map(|t| t.print(cfg, alloc)), alloc.text(" or "))
                .parens(),
            Term::Eq(lhs, rhs) => infix("=", lhs, rhs, cfg, alloc),
            Term::Lt(lhs, rhs) => infix("<", lhs, rhs, cfg, alloc),
            Term::Gt(lhs, rhs) => infix(">", lhs, rhs, cfg, alloc),
            Term::Le(lhs, rhs) => infix("<=", lhs, rhs, cfg, alloc),
            Term::Ge(lhs, rhs) => infix(">=", lhs, rhs, cfg, alloc),
            Term::Forall(vars, body) => binder("forall", vars, body, cfg, alloc),
            Term::Exists(vars, body) => binder("exists", vars, body, cfg, alloc),
        }
    }
}
