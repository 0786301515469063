use shapecheck_ast::{
    Ast, BinOpKind, BoolOpKind, CmpOpKind, Ident, Node, NodeId, Span, UnaryOpKind,
};

use crate::lexer::Token;
use crate::result::ParseError;

/// Recursive-descent parser over the layout-annotated token stream.
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span)) => *span,
            None => {
                let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(0);
                Span::new(end, end)
            }
        }
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let entry = self.tokens.get(self.pos).cloned();
        if entry.is_some() {
            self.pos += 1;
        }
        entry
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<Span, ParseError> {
        match self.advance() {
            Some((found, span)) if found == token => Ok(span),
            Some((found, span)) => {
                Err(ParseError::unexpected_token(expected, &found.to_string(), span))
            }
            None => Err(ParseError::unexpected_eof(expected)),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(Ident, Span), ParseError> {
        match self.advance() {
            Some((Token::Ident(id), span)) => Ok((Ident::from(id), span)),
            Some((found, span)) => {
                Err(ParseError::unexpected_token(expected, &found.to_string(), span))
            }
            None => Err(ParseError::unexpected_eof(expected)),
        }
    }

    fn mk(&self, span: Span, node: Node) -> Ast {
        Ast::new(NodeId::fresh(), span, node)
    }

    pub fn module(mut self) -> Result<Ast, ParseError> {
        let mut body = Vec::new();
        while self.eat(&Token::Newline) {}
        while self.peek().is_some() {
            body.push(self.stmt()?);
            while self.eat(&Token::Newline) {}
        }
        let span = match (body.first(), body.last()) {
            (Some(first), Some(last)) => Span::new(first.span.start, last.span.end),
            _ => Span::default(),
        };
        Ok(self.mk(span, Node::Module { body }))
    }

    // Statements
    //
    //

    fn stmt(&mut self) -> Result<Ast, ParseError> {
        match self.peek() {
            Some(Token::If) => self.if_stmt(),
            Some(Token::Def) => self.func_def(),
            _ => {
                let stmt = self.simple_stmt()?;
                self.expect(Token::Newline, "end of line")?;
                Ok(stmt)
            }
        }
    }

    fn simple_stmt(&mut self) -> Result<Ast, ParseError> {
        match self.peek() {
            Some(Token::Pass) => {
                let (_, span) = self.advance().expect("peeked");
                Ok(self.mk(span, Node::Pass))
            }
            Some(Token::Return) => {
                let (_, start) = self.advance().expect("peeked");
                let value = self.expr()?;
                let span = Span::new(start.start, value.span.end);
                Ok(self.mk(span, Node::Return { value: Box::new(value) }))
            }
            Some(Token::Assert) => {
                let (_, start) = self.advance().expect("peeked");
                let test = self.expr()?;
                let span = Span::new(start.start, test.span.end);
                Ok(self.mk(span, Node::Assert { test: Box::new(test) }))
            }
            Some(Token::Import) => {
                let (_, start) = self.advance().expect("peeked");
                let (module, _) = self.expect_ident("module name")?;
                self.expect(Token::As, "`as`")?;
                let (alias, end) = self.expect_ident("module alias")?;
                let span = Span::new(start.start, end.end);
                Ok(self.mk(span, Node::Import { module, alias }))
            }
            _ => self.assign_or_expr_stmt(),
        }
    }

    fn assign_or_expr_stmt(&mut self) -> Result<Ast, ParseError> {
        let target = self.expr()?;
        match self.peek() {
            Some(Token::Colon) => {
                self.advance();
                let anno = self.expr()?;
                let (value, end) = if self.eat(&Token::Equals) {
                    let value = self.expr()?;
                    let end = value.span.end;
                    (Some(Box::new(value)), end)
                } else {
                    (None, anno.span.end)
                };
                let span = Span::new(target.span.start, end);
                Ok(self.mk(
                    span,
                    Node::AnnAssign { target: Box::new(target), anno: Box::new(anno), value },
                ))
            }
            Some(Token::Equals) => {
                self.advance();
                let value = self.expr()?;
                let span = Span::new(target.span.start, value.span.end);
                Ok(self.mk(
                    span,
                    Node::Assign { target: Box::new(target), value: Box::new(value) },
                ))
            }
            _ => {
                let span = target.span;
                Ok(self.mk(span, Node::ExprStmt { value: Box::new(target) }))
            }
        }
    }

    fn if_stmt(&mut self) -> Result<Ast, ParseError> {
        let start = self.expect(Token::If, "`if`")?;
        let test = self.expr()?;
        self.expect(Token::Colon, "`:`")?;
        let body = self.block()?;
        self.expect(Token::Else, "`else`")?;
        self.expect(Token::Colon, "`:`")?;
        let orelse = self.block()?;
        let end = orelse.last().map(|stmt| stmt.span.end).unwrap_or(start.end);
        Ok(self.mk(
            Span::new(start.start, end),
            Node::If { test: Box::new(test), body, orelse },
        ))
    }

    fn func_def(&mut self) -> Result<Ast, ParseError> {
        let start = self.expect(Token::Def, "`def`")?;
        let (name, _) = self.expect_ident("function name")?;
        self.expect(Token::LParen, "`(`")?;
        let mut params = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                params.push(self.param()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "`)`")?;
        self.expect(Token::RightArrow, "`->`")?;
        let returns = self.expr()?;
        self.expect(Token::Colon, "`:`")?;
        let body = self.block()?;
        let end = body.last().map(|stmt| stmt.span.end).unwrap_or(returns.span.end);
        Ok(self.mk(
            Span::new(start.start, end),
            Node::FunctionDef { name, params, returns: Box::new(returns), body },
        ))
    }

    fn param(&mut self) -> Result<Ast, ParseError> {
        let (name, start) = self.expect_ident("parameter name")?;
        let (anno, end) = if self.eat(&Token::Colon) {
            let anno = self.expr()?;
            let end = anno.span.end;
            (Some(Box::new(anno)), end)
        } else {
            (None, start.end)
        };
        Ok(self.mk(Span::new(start.start, end), Node::Param { name, anno }))
    }

    fn block(&mut self) -> Result<Vec<Ast>, ParseError> {
        self.expect(Token::Newline, "end of line")?;
        self.expect(Token::Indent, "indented block")?;
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Dedent) => {
                    self.advance();
                    break;
                }
                Some(_) => body.push(self.stmt()?),
                None => return Err(ParseError::unexpected_eof("end of block")),
            }
        }
        Ok(body)
    }

    // Expressions
    //
    //

    fn expr(&mut self) -> Result<Ast, ParseError> {
        if self.peek() == Some(&Token::Lambda) {
            return self.lambda_expr();
        }
        self.ternary()
    }

    fn lambda_expr(&mut self) -> Result<Ast, ParseError> {
        let start = self.expect(Token::Lambda, "`lambda`")?;
        let mut params = Vec::new();
        if self.peek() != Some(&Token::Colon) {
            loop {
                let (name, span) = self.expect_ident("parameter name")?;
                params.push(self.mk(span, Node::Param { name, anno: None }));
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::Colon, "`:`")?;
        let body = self.expr()?;
        let span = Span::new(start.start, body.span.end);
        Ok(self.mk(span, Node::Lambda { params, body: Box::new(body) }))
    }

    fn ternary(&mut self) -> Result<Ast, ParseError> {
        let body = self.or_expr()?;
        if !self.eat(&Token::If) {
            return Ok(body);
        }
        let test = self.or_expr()?;
        self.expect(Token::Else, "`else`")?;
        let orelse = self.expr()?;
        let span = Span::new(body.span.start, orelse.span.end);
        Ok(self.mk(
            span,
            Node::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
        ))
    }

    fn or_expr(&mut self) -> Result<Ast, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            let span = Span::new(left.span.start, right.span.end);
            left = self.mk(
                span,
                Node::BoolOp {
                    op: BoolOpKind::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Ast, ParseError> {
        let mut left = self.not_expr()?;
        while self.eat(&Token::And) {
            let right = self.not_expr()?;
            let span = Span::new(left.span.start, right.span.end);
            left = self.mk(
                span,
                Node::BoolOp {
                    op: BoolOpKind::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Ast, ParseError> {
        if self.peek() == Some(&Token::Not) {
            let (_, start) = self.advance().expect("peeked");
            let operand = self.not_expr()?;
            let span = Span::new(start.start, operand.span.end);
            return Ok(self.mk(
                span,
                Node::UnaryOp { op: UnaryOpKind::Not, operand: Box::new(operand) },
            ));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Ast, ParseError> {
        let left = self.arith()?;
        let op = match self.peek() {
            Some(Token::EqEq) => CmpOpKind::Eq,
            Some(Token::Less) => CmpOpKind::Lt,
            Some(Token::Greater) => CmpOpKind::Gt,
            Some(Token::LessEq) => CmpOpKind::Le,
            Some(Token::GreaterEq) => CmpOpKind::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.arith()?;
        let span = Span::new(left.span.start, right.span.end);
        Ok(self.mk(span, Node::Compare { op, left: Box::new(left), right: Box::new(right) }))
    }

    fn arith(&mut self) -> Result<Ast, ParseError> {
        let mut left = self.term()?;
        while self.eat(&Token::Plus) {
            let right = self.term()?;
            let span = Span::new(left.span.start, right.span.end);
            left = self.mk(
                span,
                Node::BinOp { op: BinOpKind::Add, left: Box::new(left), right: Box::new(right) },
            );
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Ast, ParseError> {
        let mut left = self.postfix()?;
        while self.eat(&Token::Star) {
            let right = self.postfix()?;
            let span = Span::new(left.span.start, right.span.end);
            left = self.mk(
                span,
                Node::BinOp { op: BinOpKind::Mul, left: Box::new(left), right: Box::new(right) },
            );
        }
        Ok(left)
    }

    fn postfix(&mut self) -> Result<Ast, ParseError> {
        let mut expr = self.atom()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    let (attr, end) = self.expect_ident("attribute name")?;
                    let span = Span::new(expr.span.start, end.end);
                    expr = self.mk(span, Node::Attribute { value: Box::new(expr), attr });
                }
                Some(Token::LParen) => {
                    self.advance();
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.expr()?);
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    let end = self.expect(Token::RParen, "`)`")?;
                    let span = Span::new(expr.span.start, end.end);
                    expr = self.mk(span, Node::Call { func: Box::new(expr), args });
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.expr()?;
                    let end = self.expect(Token::RBracket, "`]`")?;
                    let span = Span::new(expr.span.start, end.end);
                    expr = self.mk(
                        span,
                        Node::Subscript { value: Box::new(expr), index: Box::new(index) },
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn atom(&mut self) -> Result<Ast, ParseError> {
        match self.advance() {
            Some((Token::NumLit(value), span)) => Ok(self.mk(span, Node::Num { value })),
            Some((Token::NoneKw, span)) => Ok(self.mk(span, Node::NoneLit)),
            Some((Token::TrueKw, span)) => Ok(self.mk(span, Node::TrueLit)),
            Some((Token::FalseKw, span)) => Ok(self.mk(span, Node::FalseLit)),
            Some((Token::Ident(id), span)) => Ok(self.mk(span, Node::Name { id: Ident::from(id) })),
            Some((Token::LParen, _)) => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some((found, span)) => {
                Err(ParseError::unexpected_token("an expression", &found.to_string(), span))
            }
            None => Err(ParseError::unexpected_eof("an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use shapecheck_ast::{BoolOpKind, Node};

    use crate::{parse, parse_pattern};

    fn module_body(source: &str) -> Vec<shapecheck_ast::Ast> {
        let module = parse(source).unwrap();
        match module.node {
            Node::Module { body } => body,
            _ => panic!("expected module"),
        }
    }

    #[test]
    fn parse_assignment() {
        let body = module_body("a = True\n");
        assert_eq!(body.len(), 1);
        assert!(matches!(body[0].node, Node::Assign { .. }));
    }

    #[test]
    fn parse_annotated_assignment() {
        let body = module_body("b: bool = None\n");
        let Node::AnnAssign { value: Some(_), .. } = &body[0].node else {
            panic!("expected annotated assignment with value");
        };
    }

    #[test]
    fn parse_annotation_without_value() {
        let body = module_body("b: bool\n");
        assert!(matches!(&body[0].node, Node::AnnAssign { value: None, .. }));
    }

    #[test]
    fn parse_function_def() {
        let body = module_body("def f(p: bool, a: int, b: array[a]) -> array[a + 1]:\n    return b\n");
        let Node::FunctionDef { name, params, returns, body } = &body[0].node else {
            panic!("expected function definition");
        };
        assert_eq!(name.id, "f");
        assert_eq!(params.len(), 3);
        assert!(matches!(returns.node, Node::Subscript { .. }));
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn parse_if_else() {
        let body = module_body("if p:\n    n = n + 1\nelse:\n    m = m + 1\n");
        let Node::If { body, orelse, .. } = &body[0].node else {
            panic!("expected if statement");
        };
        assert_eq!(body.len(), 1);
        assert_eq!(orelse.len(), 1);
    }

    #[test]
    fn parse_precedence() {
        let body = module_body("b = (1 + 1) * (1 + 1 + 1)\n");
        let Node::Assign { value, .. } = &body[0].node else { panic!() };
        let Node::BinOp { op: shapecheck_ast::BinOpKind::Mul, .. } = &value.node else {
            panic!("expected multiplication at the top");
        };
    }

    #[test]
    fn parse_lambda_nesting() {
        let body = module_body("compose = lambda f, g: lambda x: f(g(x))\n");
        let Node::Assign { value, .. } = &body[0].node else { panic!() };
        let Node::Lambda { params, body } = &value.node else { panic!("expected lambda") };
        assert_eq!(params.len(), 2);
        assert!(matches!(body.node, Node::Lambda { .. }));
    }

    #[test]
    fn parse_ternary() {
        let body = module_body("r = n + 1 if p else n + 2\n");
        let Node::Assign { value, .. } = &body[0].node else { panic!() };
        assert!(matches!(value.node, Node::IfExp { .. }));
    }

    #[test]
    fn pattern_unwraps_single_expression() {
        let pattern = parse_pattern("_a or _b").unwrap();
        assert!(matches!(
            pattern.node,
            Node::BoolOp { op: BoolOpKind::Or, .. }
        ));
    }

    #[test]
    fn pattern_keeps_single_statement() {
        let pattern = parse_pattern("_lhs = _rhs").unwrap();
        assert!(matches!(pattern.node, Node::Assign { .. }));
    }

    #[test]
    fn pattern_keeps_multiline_module_shape() {
        let pattern = parse_pattern("if _p:\n    __top\nelse:\n    __bot\n").unwrap();
        assert!(matches!(pattern.node, Node::If { .. }));
    }
}
