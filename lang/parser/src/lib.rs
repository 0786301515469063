mod grammar;
mod lexer;
mod result;

use shapecheck_ast::{Ast, Node};

pub use lexer::Token;
pub use result::*;

/// Parses a source file into a `Module` node.
pub fn parse(source: &str) -> Result<Ast, ParseError> {
    let tokens = lexer::lex(source)?;
    grammar::Parser::new(tokens).module()
}

/// Parses a rule pattern string.
///
/// A single expression statement unwraps to the expression itself and a
/// single statement of any other kind to that statement, so that `_a or _b`
/// denotes an expression pattern and `_lhs = _rhs` a statement pattern.
/// Multi-statement sources stay whole modules.
pub fn parse_pattern(source: &str) -> Result<Ast, ParseError> {
    let module = parse(source)?;
    match module.node {
        Node::Module { mut body } if body.len() == 1 => {
            let stmt = body.pop().expect("length checked");
            match stmt.node {
                Node::ExprStmt { value } => Ok(*value),
                _ => Ok(stmt),
            }
        }
        node => Ok(Ast::new(module.id, module.span, node)),
    }
}

/// Parses a pattern string without unwrapping (the whole module).
pub fn parse_pattern_raw(source: &str) -> Result<Ast, ParseError> {
    parse(source)
}
