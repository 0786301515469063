use std::collections::BTreeMap;

use shapecheck_ast::{Ast, Ident, Node, NodeKind};

use crate::result::{CheckResult, TypeError};

/// What a pattern captured at one name.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Capture {
    /// A single sub-tree (`_x` or `x__Kind`).
    One(Ast),
    /// A list of sub-trees (`__xs` in a statement or argument list).
    Many(Vec<Ast>),
    /// An identifier field, e.g. the function name in `def _f(...)`.
    Name(Ident),
    /// A missing optional field matched by a capture, e.g. the right-hand
    /// side of an annotation without a value.
    Absent,
}

#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct Captures {
    map: BTreeMap<String, Capture>,
}

impl Captures {
    fn insert(&mut self, name: String, capture: Capture) {
        self.map.insert(name, capture);
    }

    pub fn node(&self, name: &str) -> CheckResult<&Ast> {
        match self.map.get(name) {
            Some(Capture::One(ast)) => Ok(ast),
            _ => Err(TypeError::impossible(format!("missing capture `{name}`"))),
        }
    }

    pub fn opt_node(&self, name: &str) -> Option<&Ast> {
        match self.map.get(name) {
            Some(Capture::One(ast)) => Some(ast),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> CheckResult<&[Ast]> {
        match self.map.get(name) {
            Some(Capture::Many(asts)) => Ok(asts),
            _ => Err(TypeError::impossible(format!("missing list capture `{name}`"))),
        }
    }

    pub fn ident(&self, name: &str) -> CheckResult<&Ident> {
        match self.map.get(name) {
            Some(Capture::Name(ident)) => Ok(ident),
            _ => Err(TypeError::impossible(format!("missing name capture `{name}`"))),
        }
    }
}

enum CaptureKind {
    Single(String),
    List(String),
    Typed(String, NodeKind),
}

/// Interprets the capture conventions on an identifier: `_x` captures one
/// node, `__xs` captures a list, `x__Kind` captures one node of that kind.
fn capture_kind(id: &str) -> Option<CaptureKind> {
    if let Some(name) = id.strip_prefix("__") {
        return Some(CaptureKind::List(name.to_owned()));
    }
    if let Some(name) = id.strip_prefix('_') {
        return Some(CaptureKind::Single(name.to_owned()));
    }
    if let Some((name, kind)) = id.split_once("__") {
        if let Some(kind) = NodeKind::from_capture_name(kind) {
            return Some(CaptureKind::Typed(name.to_owned(), kind));
        }
    }
    None
}

/// Matches an AST fragment against a pattern, returning the capture bindings
/// on success. Matching is structural, recursive and kind-sensitive.
pub fn matches(pattern: &Ast, ast: &Ast) -> Option<Captures> {
    let mut captures = Captures::default();
    if match_node(pattern, ast, &mut captures) { Some(captures) } else { None }
}

fn match_node(pattern: &Ast, ast: &Ast, captures: &mut Captures) -> bool {
    // A pattern name may stand for an arbitrary sub-tree.
    if let Node::Name { id } = &pattern.node {
        match capture_kind(&id.id) {
            Some(CaptureKind::Single(name)) => {
                captures.insert(name, Capture::One(ast.clone()));
                return true;
            }
            Some(CaptureKind::Typed(name, kind)) => {
                if ast.kind() == kind {
                    captures.insert(name, Capture::One(ast.clone()));
                    return true;
                }
                return false;
            }
            Some(CaptureKind::List(_)) => return false,
            None => {}
        }
    }

    match (&pattern.node, &ast.node) {
        (Node::Module { body: pattern_body }, Node::Module { body }) => {
            match_list(pattern_body, body, captures)
        }
        (
            Node::Assign { target: pattern_target, value: pattern_value },
            Node::Assign { target, value },
        ) => {
            match_node(pattern_target, target, captures)
                && match_node(pattern_value, value, captures)
        }
        (
            Node::AnnAssign { target: pt, anno: pa, value: pv },
            Node::AnnAssign { target, anno, value },
        ) => {
            match_node(pt, target, captures)
                && match_node(pa, anno, captures)
                && match_opt(pv.as_deref(), value.as_deref(), captures)
        }
        (
            Node::If { test: pt, body: pb, orelse: po },
            Node::If { test, body, orelse },
        ) => {
            match_node(pt, test, captures)
                && match_list(pb, body, captures)
                && match_list(po, orelse, captures)
        }
        (
            Node::FunctionDef { name: pn, params: pp, returns: pr, body: pb },
            Node::FunctionDef { name, params, returns, body },
        ) => {
            match_ident(pn, name, captures)
                && match_list(pp, params, captures)
                && match_node(pr, returns, captures)
                && match_list(pb, body, captures)
        }
        (Node::Return { value: pv }, Node::Return { value }) => match_node(pv, value, captures),
        (Node::Assert { test: pt }, Node::Assert { test }) => match_node(pt, test, captures),
        (Node::ExprStmt { value: pv }, Node::ExprStmt { value }) => {
            match_node(pv, value, captures)
        }
        (Node::Pass, Node::Pass) => true,
        (
            Node::Import { module: pm, alias: pa },
            Node::Import { module, alias },
        ) => match_ident(pm, module, captures) && match_ident(pa, alias, captures),
        (Node::Name { id: pattern_id }, Node::Name { id }) => pattern_id == id,
        (Node::Num { value: pattern_value }, Node::Num { value }) => pattern_value == value,
        (Node::NoneLit, Node::NoneLit) => true,
        (Node::TrueLit, Node::TrueLit) => true,
        (Node::FalseLit, Node::FalseLit) => true,
        (
            Node::Attribute { value: pv, attr: pa },
            Node::Attribute { value, attr },
        ) => match_node(pv, value, captures) && match_ident(pa, attr, captures),
        (
            Node::Subscript { value: pv, index: pi },
            Node::Subscript { value, index },
        ) => match_node(pv, value, captures) && match_node(pi, index, captures),
        (Node::Call { func: pf, args: pa }, Node::Call { func, args }) => {
            match_node(pf, func, captures) && match_list(pa, args, captures)
        }
        (
            Node::Lambda { params: pp, body: pb },
            Node::Lambda { params, body },
        ) => match_list(pp, params, captures) && match_node(pb, body, captures),
        (
            Node::BoolOp { op: pop, left: pl, right: pr },
            Node::BoolOp { op, left, right },
        ) => pop == op && match_node(pl, left, captures) && match_node(pr, right, captures),
        (
            Node::UnaryOp { op: pop, operand: po },
            Node::UnaryOp { op, operand },
        ) => pop == op && match_node(po, operand, captures),
        (
            Node::BinOp { op: pop, left: pl, right: pr },
            Node::BinOp { op, left, right },
        ) => pop == op && match_node(pl, left, captures) && match_node(pr, right, captures),
        (
            Node::Compare { op: pop, left: pl, right: pr },
            Node::Compare { op, left, right },
        ) => pop == op && match_node(pl, left, captures) && match_node(pr, right, captures),
        (
            Node::IfExp { test: pt, body: pb, orelse: po },
            Node::IfExp { test, body, orelse },
        ) => {
            match_node(pt, test, captures)
                && match_node(pb, body, captures)
                && match_node(po, orelse, captures)
        }
        (
            Node::Param { name: pn, anno: pa },
            Node::Param { name, anno },
        ) => match_ident(pn, name, captures) && match_opt(pa.as_deref(), anno.as_deref(), captures),
        _ => false,
    }
}

fn match_ident(pattern: &Ident, ident: &Ident, captures: &mut Captures) -> bool {
    match capture_kind(&pattern.id) {
        Some(CaptureKind::Single(name)) => {
            captures.insert(name, Capture::Name(ident.clone()));
            true
        }
        Some(_) => false,
        None => pattern == ident,
    }
}

/// A list is captured whole when the pattern list is a single `__xs` entry;
/// otherwise the lists must have equal length and match pointwise.
fn match_list(patterns: &[Ast], asts: &[Ast], captures: &mut Captures) -> bool {
    if patterns.len() == 1 {
        if let Some(name) = list_capture_name(&patterns[0]) {
            captures.insert(name, Capture::Many(asts.to_vec()));
            return true;
        }
    }
    patterns.len() == asts.len()
        && patterns.iter().zip(asts).all(|(pattern, ast)| match_node(pattern, ast, captures))
}

fn list_capture_name(pattern: &Ast) -> Option<String> {
    match &pattern.node {
        Node::Name { id } => match capture_kind(&id.id) {
            Some(CaptureKind::List(name)) => Some(name),
            _ => None,
        },
        // A statement-position capture is an expression statement around a name.
        Node::ExprStmt { value } => list_capture_name(value),
        // A parameter-position capture, as in `def _f(__args)`.
        Node::Param { name, anno: None } => match capture_kind(&name.id) {
            Some(CaptureKind::List(list_name)) => Some(list_name),
            _ => None,
        },
        _ => None,
    }
}

fn match_opt(pattern: Option<&Ast>, ast: Option<&Ast>, captures: &mut Captures) -> bool {
    match (pattern, ast) {
        (None, None) => true,
        (Some(pattern), Some(ast)) => match_node(pattern, ast, captures),
        (Some(pattern), None) => {
            // A capture tolerates a missing optional field.
            if let Node::Name { id } = &pattern.node {
                if let Some(CaptureKind::Single(name)) = capture_kind(&id.id) {
                    captures.insert(name, Capture::Absent);
                    return true;
                }
            }
            false
        }
        (None, Some(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use shapecheck_parser::{parse, parse_pattern};

    use super::*;

    fn first_stmt(source: &str) -> Ast {
        let module = parse(source).unwrap();
        let Node::Module { mut body } = module.node else { panic!("expected module") };
        body.remove(0)
    }

    fn expr(source: &str) -> Ast {
        let stmt = first_stmt(source);
        let Node::ExprStmt { value } = stmt.node else { panic!("expected expression") };
        *value
    }

    #[test]
    fn single_capture_binds_subtree() {
        let pattern = parse_pattern("_a or _b").unwrap();
        let ast = expr("True or False");
        let captures = matches(&pattern, &ast).unwrap();
        assert!(matches!(captures.node("a").unwrap().node, Node::TrueLit));
        assert!(matches!(captures.node("b").unwrap().node, Node::FalseLit));
    }

    #[test]
    fn typed_capture_is_kind_sensitive() {
        let pattern = parse_pattern("a__Name").unwrap();
        assert!(matches(&pattern, &expr("x")).is_some());
        assert!(matches(&pattern, &expr("3")).is_none());

        let num_pattern = parse_pattern("num__Num").unwrap();
        assert!(matches(&num_pattern, &expr("3")).is_some());
    }

    #[test]
    fn list_capture_takes_whole_body() {
        let pattern = parse_pattern("if _p:\n    __top\nelse:\n    __bot\n").unwrap();
        let ast = first_stmt("if p:\n    a = 1\n    b = 2\nelse:\n    pass\n");
        let captures = matches(&pattern, &ast).unwrap();
        assert_eq!(captures.list("top").unwrap().len(), 2);
        assert_eq!(captures.list("bot").unwrap().len(), 1);
    }

    #[test]
    fn call_pattern_captures_callee_and_arguments() {
        let pattern = parse_pattern("_f(__args)").unwrap();
        let ast = expr("np.zeros(1 + 2, 3)");
        let captures = matches(&pattern, &ast).unwrap();
        assert!(matches!(captures.node("f").unwrap().node, Node::Attribute { .. }));
        assert_eq!(captures.list("args").unwrap().len(), 2);
    }

    #[test]
    fn fixed_arity_call_patterns_check_length() {
        let pattern = parse_pattern("smush(_a, _b)").unwrap();
        assert!(matches(&pattern, &expr("smush(x, y)")).is_some());
        assert!(matches(&pattern, &expr("smush(x)")).is_none());
        assert!(matches(&pattern, &expr("other(x, y)")).is_none());
    }

    #[test]
    fn annotation_pattern_tolerates_missing_value() {
        let pattern = parse_pattern("_lhs: _anno = _rhs").unwrap();
        let with_value = first_stmt("b: bool = None\n");
        let captures = matches(&pattern, &with_value).unwrap();
        assert!(captures.opt_node("rhs").is_some());

        let without_value = first_stmt("b: bool\n");
        let captures = matches(&pattern, &without_value).unwrap();
        assert!(captures.opt_node("rhs").is_none());
    }

    #[test]
    fn function_name_is_captured_as_identifier() {
        let pattern =
            parse_pattern("def _f(__args) -> _return_type:\n    __body\n").unwrap();
        let ast = first_stmt("def succ(a: int) -> int:\n    return a + 1\n");
        let captures = matches(&pattern, &ast).unwrap();
        assert_eq!(captures.ident("f").unwrap().id, "succ");
        assert_eq!(captures.list("args").unwrap().len(), 1);
    }

    #[test]
    fn literal_patterns_do_not_capture() {
        let pattern = parse_pattern("import numpy as np").unwrap();
        assert!(matches(&pattern, &first_stmt("import numpy as np\n")).is_some());
        assert!(matches(&pattern, &first_stmt("import numpy as other\n")).is_none());
    }

    #[test]
    fn module_pattern_captures_statement_list() {
        let pattern = shapecheck_parser::parse_pattern_raw("__body").unwrap();
        let ast = parse("a = 1\nb = 2\n").unwrap();
        let captures = matches(&pattern, &ast).unwrap();
        assert_eq!(captures.list("body").unwrap().len(), 2);
    }
}
