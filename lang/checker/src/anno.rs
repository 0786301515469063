use shapecheck_ast::{Ast, BinOpKind, HasSpan, Ident, Node};
use shapecheck_types::{AExp, BExp, Type};

use crate::result::{CheckResult, TypeError};

/// Converts a type annotation to a type. `int`/`bool` without a binder erase
/// to bare kinds; `array[e]` carries its index expression.
pub fn type_from_anno(ast: &Ast) -> CheckResult<Type> {
    match &ast.node {
        Node::Name { id } if id.id == "int" => Ok(Type::Int),
        Node::Name { id } if id.id == "bool" => Ok(Type::Bool),
        Node::NoneLit => Ok(Type::None),
        Node::Subscript { value, index } => match &value.node {
            Node::Name { id } if id.id == "array" => Ok(Type::Array(aexp_from_ast(index)?)),
            _ => Err(TypeError::value("Unsupported type annotation", Some(ast.span()))),
        },
        _ => Err(TypeError::value("Unsupported type annotation", Some(ast.span()))),
    }
}

/// Converts a parameter annotation to the parameter's type. `a : int` makes
/// `a` itself a type-level index variable, which is what lets later
/// annotations refer to it (`b : array[a]`).
pub fn param_type(name: &Ident, anno: Option<&Ast>) -> CheckResult<Type> {
    let Some(anno) = anno else {
        return Err(TypeError::value(
            format!("Parameter `{name}` needs a type annotation"),
            None,
        ));
    };
    match &anno.node {
        Node::Name { id } if id.id == "int" => Ok(Type::Arith(AExp::Var(name.clone()))),
        Node::Name { id } if id.id == "bool" => Ok(Type::Boolean(BExp::Var(name.clone()))),
        _ => type_from_anno(anno),
    }
}

/// Converts an annotation-level expression to an arithmetic index term.
pub fn aexp_from_ast(ast: &Ast) -> CheckResult<AExp> {
    match &ast.node {
        Node::Num { value } => Ok(AExp::Lit(*value)),
        Node::Name { id } => Ok(AExp::Var(id.clone())),
        Node::BinOp { op: BinOpKind::Add, left, right } => {
            Ok(AExp::add(aexp_from_ast(left)?, aexp_from_ast(right)?))
        }
        Node::BinOp { op: BinOpKind::Mul, left, right } => {
            Ok(AExp::mul(aexp_from_ast(left)?, aexp_from_ast(right)?))
        }
        _ => Err(TypeError::value(
            "Unsupported index expression in annotation",
            Some(ast.span()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use shapecheck_parser::parse_pattern;

    use super::*;

    #[test]
    fn array_annotation_carries_its_index() {
        let anno = parse_pattern("array[a + 1]").unwrap();
        let t = type_from_anno(&anno).unwrap();
        assert_eq!(
            t,
            Type::Array(AExp::add(AExp::Var(Ident::from("a")), AExp::Lit(1)))
        );
    }

    #[test]
    fn int_parameter_becomes_its_own_index_variable() {
        let anno = parse_pattern("int").unwrap();
        let t = param_type(&Ident::from("a"), Some(&anno)).unwrap();
        assert_eq!(t, Type::Arith(AExp::Var(Ident::from("a"))));
    }

    #[test]
    fn bare_annotations_erase_to_kinds() {
        assert_eq!(type_from_anno(&parse_pattern("int").unwrap()).unwrap(), Type::Int);
        assert_eq!(type_from_anno(&parse_pattern("bool").unwrap()).unwrap(), Type::Bool);
    }
}
