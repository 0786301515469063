use pretty::DocAllocator;

use shapecheck_printer::tokens::{ARROW, COMMA, TILDE};
use shapecheck_printer::{Alloc, Builder, Print, PrintCfg};

use crate::exp::{AExp, BExp};
use crate::subst::Substitution;
use crate::typ::Type;

fn aexp_operand<'a>(a: &'a AExp, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
    match a {
        AExp::Add(_, _) | AExp::Mul(_, _) => a.print(cfg, alloc).parens(),
        _ => a.print(cfg, alloc),
    }
}

impl Print for AExp {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            AExp::Lit(n) => alloc.text(format!("{n}")),
            AExp::Var(name) | AExp::EVar(name) => alloc.text(name.id.clone()),
            AExp::Add(lhs, rhs) => aexp_operand(lhs, cfg, alloc)
                .append(" + ")
                .append(aexp_operand(rhs, cfg, alloc)),
            AExp::Mul(lhs, rhs) => aexp_operand(lhs, cfg, alloc)
                .append(" * ")
                .append(aexp_operand(rhs, cfg, alloc)),
        }
    }
}

fn bexp_operand<'a>(b: &'a BExp, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
    match b {
        BExp::And(_, _) | BExp::Or(_, _) => b.print(cfg, alloc).parens(),
        _ => b.print(cfg, alloc),
    }
}

fn comparison<'a>(
    op: &'static str,
    lhs: &'a AExp,
    rhs: &'a AExp,
    cfg: &PrintCfg,
    alloc: &'a Alloc<'a>,
) -> Builder<'a> {
    lhs.print(cfg, alloc)
        .append(alloc.space())
        .append(op)
        .append(alloc.space())
        .append(rhs.print(cfg, alloc))
}

impl Print for BExp {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            BExp::Lit(true) => alloc.text("True"),
            BExp::Lit(false) => alloc.text("False"),
            BExp::Var(name) | BExp::EVar(name) => alloc.text(name.id.clone()),
            BExp::Not(inner) => alloc.text("not ").append(bexp_operand(inner, cfg, alloc)),
            BExp::And(lhs, rhs) => bexp_operand(lhs, cfg, alloc)
                .append(" and ")
                .append(bexp_operand(rhs, cfg, alloc)),
            BExp::Or(lhs, rhs) => bexp_operand(lhs, cfg, alloc)
                .append(" or ")
                .append(bexp_operand(rhs, cfg, alloc)),
            BExp::Eq(lhs, rhs) => comparison("==", lhs, rhs, cfg, alloc),
            BExp::Lt(lhs, rhs) => comparison("<", lhs, rhs, cfg, alloc),
            BExp::Gt(lhs, rhs) => comparison(">", lhs, rhs, cfg, alloc),
            BExp::Le(lhs, rhs) => comparison("<=", lhs, rhs, cfg, alloc),
            BExp::Ge(lhs, rhs) => comparison(">=", lhs, rhs, cfg, alloc),
        }
    }
}

impl Print for Type {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            Type::None => alloc.text("None"),
            Type::Bool => alloc.text("bool"),
            Type::Int => alloc.text("int"),
            Type::Array(index) => {
                alloc.text("array").append(index.print(cfg, alloc).brackets())
            }
            Type::Tuple(elems) => alloc
                .intersperse(
                    elems.iter().map(|t| t.print(cfg, alloc)),
                    alloc.text(COMMA).append(alloc.space()),
                )
                .parens(),
            Type::Fun(param, result) => {
                let param = match **param {
                    Type::Fun(_, _) => param.print(cfg, alloc).parens(),
                    _ => param.print(cfg, alloc),
                };
                param
                    .append(alloc.space())
                    .append(ARROW)
                    .append(alloc.space())
                    .append(result.print(cfg, alloc))
            }
            Type::Arith(a) => a.print(cfg, alloc),
            Type::Boolean(b) => b.print(cfg, alloc),
            Type::EVar(name) => alloc.text(name.id.clone()),
            Type::UVar(name) => alloc.text(format!("'{}", name.id)),
        }
    }
}

impl Print for Substitution {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        let constraints = self.equalities().map(|(lhs, rhs)| {
            lhs.print(cfg, alloc)
                .append(alloc.space())
                .append(TILDE)
                .append(alloc.space())
                .append(rhs.print(cfg, alloc))
        });
        alloc
            .intersperse(constraints, alloc.text(COMMA).append(alloc.space()))
            .enclose("{", "}")
    }
}
