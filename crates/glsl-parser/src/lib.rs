//! Recursive-descent parser (`spec.md` §4.6–§4.8, component F), building
//! `glsl_ast` nodes over a pre-tokenized stream. Unlike the teacher's
//! multi-error-recovery `AstGen` (`hash-parser::parser::AstGen`), this
//! parser stops at the first diagnostic: `spec.md` §7 specifies that any
//! soft error aborts the compilation, so there is nothing to recover into.
//! `pos` is a plain `usize` rather than the teacher's `Cell<usize>` for the
//! same reason — there is only ever one active parser, never a borrowed
//! sub-generator running concurrently over the same stream.

mod decl;
mod expr;
mod stmt;
mod ty;

use glsl_ast::TranslationUnit;
use glsl_lexer::{Keyword, Operator, Token, TokenKind};
use glsl_reporting::{DiagnosticCode, Report, ShaderLog};
use glsl_utils::span::Span;

pub type PResult<T> = Result<T, ()>;

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    log: &'a mut ShaderLog,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], log: &'a mut ShaderLog) -> Self {
        Self { tokens, pos: 0, log }
    }

    pub fn parse_translation_unit(&mut self) -> PResult<TranslationUnit> {
        decl::parse_translation_unit(self)
    }

    fn peek(&self) -> &TokenKind {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        self.tokens.get(self.pos + n).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        self.tokens.get(self.pos).map(|t| t.span).unwrap_or_else(|| {
            self.tokens.last().map(|t| t.span).unwrap_or_default()
        })
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token {
            kind: TokenKind::Eof,
            span: self.current_span(),
            line: self.tokens.last().map(|t| t.line).unwrap_or(0),
        });
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn is_operator(&self, op: Operator) -> bool {
        matches!(self.peek(), TokenKind::Operator(o) if *o == op)
    }

    fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat_operator(&mut self, op: Operator) -> bool {
        if self.is_operator(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.is_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_operator(&mut self, op: Operator) -> PResult<()> {
        if self.eat_operator(op) {
            Ok(())
        } else {
            self.error(DiagnosticCode::L0001)
        }
    }

    fn expect_identifier(&mut self) -> PResult<String> {
        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.bump();
                Ok(name)
            }
            _ => self.error(DiagnosticCode::L0001),
        }
    }

    fn error<T>(&mut self, code: DiagnosticCode) -> PResult<T> {
        self.log.push(Report::new(code, self.current_line()));
        Err(())
    }

    fn current_line(&self) -> u32 {
        self.tokens.get(self.pos).or_else(|| self.tokens.last()).map(|t| t.line).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use glsl_lexer::tokenize;
    use glsl_reporting::ShaderLog;

    use super::*;

    fn parse(src: &str) -> PResult<TranslationUnit> {
        let mut log = ShaderLog::new();
        let tokens = tokenize(src, &mut log);
        assert!(!log.has_errors(), "lexing failed: {}", log.render());
        let mut log2 = ShaderLog::new();
        let mut p = Parser::new(&tokens, &mut log2);
        let result = p.parse_translation_unit();
        if result.is_err() {
            panic!("parse failed: {}", log2.render());
        }
        result
    }

    #[test]
    fn parses_empty_main() {
        let unit = parse("void main() { }").unwrap();
        assert_eq!(unit.decls.len(), 1);
    }

    #[test]
    fn parses_global_uniform_and_expression_statement() {
        let unit = parse(
            "uniform vec4 color;\nvoid main() { gl_FragColor = color; }\n",
        )
        .unwrap();
        assert_eq!(unit.decls.len(), 2);
    }

    #[test]
    fn parses_for_loop_and_if() {
        let src = r#"
            void main() {
                float sum = 0.0;
                for (int i = 0; i < 4; i++) {
                    if (sum < 1.0) {
                        sum = sum + 1.0;
                    } else {
                        break;
                    }
                }
            }
        "#;
        parse(src).unwrap();
    }

    #[test]
    fn parses_struct_and_constructor_call() {
        let src = r#"
            struct Light { vec3 color; float intensity; };
            void main() {
                Light l = Light(vec3(1.0, 1.0, 1.0), 2.0);
            }
        "#;
        parse(src).unwrap();
    }

    #[test]
    fn rejects_while_loop() {
        let mut log = ShaderLog::new();
        let tokens = tokenize("void main() { while (true) { } }", &mut log);
        let mut plog = ShaderLog::new();
        let mut p = Parser::new(&tokens, &mut plog);
        // `while` parses into an `UnsupportedLoop` node rather than failing
        // outright — rejection happens in lowering (`X0001`).
        p.parse_translation_unit().unwrap();
    }
}
