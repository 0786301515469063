use std::fmt;

use logos::Logos;

use shapecheck_ast::Span;

use crate::result::ParseError;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    // Keywords
    //
    //
    #[token("def")]
    Def,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("return")]
    Return,
    #[token("assert")]
    Assert,
    #[token("lambda")]
    Lambda,
    #[token("pass")]
    Pass,
    #[token("import")]
    Import,
    #[token("as")]
    As,
    #[token("not")]
    Not,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("None")]
    NoneKw,
    #[token("True")]
    TrueKw,
    #[token("False")]
    FalseKw,

    // Parens and Brackets
    //
    //
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Symbols
    //
    //
    #[token("->")]
    RightArrow,
    #[token("==")]
    EqEq,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Equals,
    #[token("+")]
    Plus,
    #[token("*")]
    Star,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    // Names and Literals
    //
    //
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),
    #[regex(r"0|[1-9][0-9]*", |lex| lex.slice().parse::<i64>().ok())]
    NumLit(i64),

    // Layout tokens, synthesized by the indentation pass
    //
    //
    Newline,
    Indent,
    Dedent,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(id) => write!(f, "identifier `{id}`"),
            Token::NumLit(n) => write!(f, "number `{n}`"),
            Token::Newline => write!(f, "end of line"),
            Token::Indent => write!(f, "indented block"),
            Token::Dedent => write!(f, "end of block"),
            other => write!(f, "`{other:?}`"),
        }
    }
}

/// Tokenizes a full source file, inserting `Newline`, `Indent` and `Dedent`
/// tokens according to Python-style layout rules. Lines are joined implicitly
/// inside parentheses and brackets.
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut tokens: Vec<(Token, Span)> = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut depth: usize = 0;

    let mut offset = 0usize;
    for raw in source.split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let mut content_start = 0usize;
        if depth == 0 {
            let mut indent = 0usize;
            for c in line.chars() {
                match c {
                    ' ' => indent += 1,
                    '\t' => {
                        let at = (line_start + indent) as u32;
                        return Err(ParseError::tab_in_indent(Span::new(at, at + 1)));
                    }
                    _ => break,
                }
            }
            let rest = &line[indent..];
            if rest.is_empty() || rest.starts_with('#') {
                continue;
            }

            let here = (line_start + indent) as u32;
            if indent > *indents.last().expect("non-empty indent stack") {
                indents.push(indent);
                tokens.push((Token::Indent, Span::new(here, here)));
            } else {
                while indent < *indents.last().expect("non-empty indent stack") {
                    indents.pop();
                    tokens.push((Token::Dedent, Span::new(here, here)));
                }
                if indent != *indents.last().expect("non-empty indent stack") {
                    return Err(ParseError::inconsistent_dedent(Span::new(here, here + 1)));
                }
            }
            content_start = indent;
        }

        let base = line_start + content_start;
        let mut lexer = Token::lexer(&line[content_start..]);
        while let Some(result) = lexer.next() {
            let range = lexer.span();
            let span =
                Span::new((base + range.start) as u32, (base + range.end) as u32);
            let token = result.map_err(|_| ParseError::invalid_token(span))?;
            match token {
                Token::LParen | Token::LBracket => depth += 1,
                Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            tokens.push((token, span));
        }

        if depth == 0 {
            let eol = (line_start + line.len()) as u32;
            tokens.push((Token::Newline, Span::new(eol, eol)));
        }
    }

    let end = source.len() as u32;
    while indents.len() > 1 {
        indents.pop();
        tokens.push((Token::Dedent, Span::new(end, end)));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|(token, _)| token).collect()
    }

    #[test]
    fn lex_assignment() {
        assert_eq!(
            kinds("a = 1"),
            vec![
                Token::Ident("a".to_owned()),
                Token::Equals,
                Token::NumLit(1),
                Token::Newline
            ]
        );
    }

    #[test]
    fn lex_layout() {
        let tokens = kinds("if p:\n    pass\nelse:\n    pass\n");
        assert_eq!(
            tokens,
            vec![
                Token::If,
                Token::Ident("p".to_owned()),
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::Pass,
                Token::Newline,
                Token::Dedent,
                Token::Else,
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::Pass,
                Token::Newline,
                Token::Dedent,
            ]
        );
    }

    #[test]
    fn lex_joins_lines_inside_parens() {
        let tokens = kinds("f(a,\n  b)");
        assert!(!tokens[..tokens.len() - 1].contains(&Token::Newline));
        assert!(!tokens.contains(&Token::Indent));
    }

    #[test]
    fn lex_skips_blank_and_comment_lines() {
        let tokens = kinds("a = 1\n\n# comment\nb = 2\n");
        let newlines = tokens.iter().filter(|t| **t == Token::Newline).count();
        assert_eq!(newlines, 2);
    }

    #[test]
    fn lex_rejects_inconsistent_dedent() {
        assert!(matches!(
            lex("if p:\n        pass\n    pass\n"),
            Err(ParseError::InconsistentDedent { .. })
        ));
    }
}
