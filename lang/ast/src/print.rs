use pretty::DocAllocator;

use shapecheck_printer::tokens::{
    ARROW, ASSERT, COLON, COMMA, DEF, DOT, ELSE, EQUALS, IF, IMPORT, LAMBDA, PASS, RETURN,
};
use shapecheck_printer::{Alloc, Builder, Print, PrintCfg};

use crate::node::{Ast, BinOpKind, BoolOpKind, CmpOpKind, Node, UnaryOpKind};

impl Print for Ast {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        self.node.print(cfg, alloc)
    }
}

/// Parenthesizes operator expressions when they appear as operands.
fn operand<'a>(ast: &'a Ast, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
    match &ast.node {
        Node::BoolOp { .. }
        | Node::UnaryOp { .. }
        | Node::BinOp { .. }
        | Node::Compare { .. }
        | Node::IfExp { .. }
        | Node::Lambda { .. } => ast.print(cfg, alloc).parens(),
        _ => ast.print(cfg, alloc),
    }
}

fn block<'a>(body: &'a [Ast], cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
    alloc
        .hardline()
        .append(alloc.intersperse(body.iter().map(|stmt| stmt.print(cfg, alloc)), alloc.hardline()))
        .nest(cfg.indent)
}

fn comma_separated<'a>(items: &'a [Ast], cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
    alloc.intersperse(
        items.iter().map(|item| item.print(cfg, alloc)),
        alloc.text(COMMA).append(alloc.space()),
    )
}

impl Print for Node {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            Node::Module { body } => alloc
                .intersperse(body.iter().map(|stmt| stmt.print(cfg, alloc)), alloc.hardline()),
            Node::Assign { target, value } => target
                .print(cfg, alloc)
                .append(alloc.space())
                .append(EQUALS)
                .append(alloc.space())
                .append(value.print(cfg, alloc)),
            Node::AnnAssign { target, anno, value } => {
                let head = target
                    .print(cfg, alloc)
                    .append(COLON)
                    .append(alloc.space())
                    .append(anno.print(cfg, alloc));
                match value {
                    Some(value) => head
                        .append(alloc.space())
                        .append(EQUALS)
                        .append(alloc.space())
                        .append(value.print(cfg, alloc)),
                    None => head,
                }
            }
            Node::If { test, body, orelse } => alloc
                .text(IF)
                .append(alloc.space())
                .append(test.print(cfg, alloc))
                .append(COLON)
                .append(block(body, cfg, alloc))
                .append(alloc.hardline())
                .append(ELSE)
                .append(COLON)
                .append(block(orelse, cfg, alloc)),
            Node::FunctionDef { name, params, returns, body } => alloc
                .text(DEF)
                .append(alloc.space())
                .append(name.id.clone())
                .append(comma_separated(params, cfg, alloc).parens())
                .append(alloc.space())
                .append(ARROW)
                .append(alloc.space())
                .append(returns.print(cfg, alloc))
                .append(COLON)
                .append(block(body, cfg, alloc)),
            Node::Return { value } => {
                alloc.text(RETURN).append(alloc.space()).append(value.print(cfg, alloc))
            }
            Node::Assert { test } => {
                alloc.text(ASSERT).append(alloc.space()).append(test.print(cfg, alloc))
            }
            Node::ExprStmt { value } => value.print(cfg, alloc),
            Node::Pass => alloc.text(PASS),
            Node::Import { module, alias } => alloc
                .text(IMPORT)
                .append(alloc.space())
                .append(module.id.clone())
                .append(alloc.space())
                .append("as")
                .append(alloc.space())
                .append(alias.id.clone()),
            Node::Name { id } => alloc.text(id.id.clone()),
            Node::Num { value } => alloc.text(format!("{value}")),
            Node::NoneLit => alloc.text("None"),
            Node::TrueLit => alloc.text("True"),
            Node::FalseLit => alloc.text("False"),
            Node::Attribute { value, attr } => {
                operand(value, cfg, alloc).append(DOT).append(attr.id.clone())
            }
            Node::Subscript { value, index } => {
                operand(value, cfg, alloc).append(index.print(cfg, alloc).brackets())
            }
            Node::Call { func, args } => {
                operand(func, cfg, alloc).append(comma_separated(args, cfg, alloc).parens())
            }
            Node::Lambda { params, body } => alloc
                .text(LAMBDA)
                .append(alloc.space())
                .append(comma_separated(params, cfg, alloc))
                .append(COLON)
                .append(alloc.space())
                .append(body.print(cfg, alloc)),
            Node::BoolOp { op, left, right } => {
                let op = match op {
                    BoolOpKind::And => "and",
                    BoolOpKind::Or => "or",
                };
                operand(left, cfg, alloc)
                    .append(alloc.space())
                    .append(op)
                    .append(alloc.space())
                    .append(operand(right, cfg, alloc))
            }
            Node::UnaryOp { op: UnaryOpKind::Not, operand: inner } => {
                alloc.text("not").append(alloc.space()).append(operand(inner, cfg, alloc))
            }
            Node::BinOp { op, left, right } => {
                let op = match op {
                    BinOpKind::Add => "+",
                    BinOpKind::Mul => "*",
                };
                operand(left, cfg, alloc)
                    .append(alloc.space())
                    .append(op)
                    .append(alloc.space())
                    .append(operand(right, cfg, alloc))
            }
            Node::Compare { op, left, right } => {
                let op = match op {
                    CmpOpKind::Eq => "==",
                    CmpOpKind::Lt => "<",
                    CmpOpKind::Gt => ">",
                    CmpOpKind::Le => "<=",
                    CmpOpKind::Ge => ">=",
                };
                operand(left, cfg, alloc)
                    .append(alloc.space())
                    .append(op)
                    .append(alloc.space())
                    .append(operand(right, cfg, alloc))
            }
            Node::IfExp { test, body, orelse } => operand(body, cfg, alloc)
                .append(alloc.space())
                .append(IF)
                .append(alloc.space())
                .append(operand(test, cfg, alloc))
                .append(alloc.space())
                .append(ELSE)
                .append(alloc.space())
                .append(operand(orelse, cfg, alloc)),
            Node::Param { name, anno } => match anno {
                Some(anno) => alloc
                    .text(name.id.clone())
                    .append(COLON)
                    .append(alloc.space())
                    .append(anno.print(cfg, alloc)),
                None => alloc.text(name.id.clone()),
            },
        }
    }
}
