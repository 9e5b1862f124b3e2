//! Statement parsing (`spec.md` §4.8). `while`/`do` parse successfully
//! into [`Stmt::UnsupportedLoop`]; rejecting them with `X0001` is
//! lowering's job, not the parser's — parsing never needs to know which
//! constructs lowering will later refuse.

use glsl_ast::{ForInit, LocalVarDecl, Stmt};
use glsl_lexer::{Keyword, Operator, TokenKind};
use glsl_reporting::DiagnosticCode;

use crate::{PResult, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> PResult<Stmt> {
        let start = self.current_span();
        match self.peek().clone() {
            TokenKind::Operator(Operator::LBrace) => self.parse_compound_statement(),
            TokenKind::Operator(Operator::Semi) => {
                self.bump();
                Ok(Stmt::Empty { span: start })
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::For) => self.parse_for_statement(),
            TokenKind::Keyword(Keyword::While) => {
                self.skip_while_statement()?;
                Ok(Stmt::UnsupportedLoop { span: start })
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.skip_do_statement()?;
                Ok(Stmt::UnsupportedLoop { span: start })
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                let value = if self.is_operator(Operator::Semi) { None } else { Some(self.parse_expr()?) };
                self.expect_operator(Operator::Semi)?;
                let span = start.to(self.current_span());
                Ok(Stmt::Return { value, span })
            }
            TokenKind::Keyword(Keyword::Discard) => {
                self.bump();
                self.expect_operator(Operator::Semi)?;
                Ok(Stmt::Discard { span: start })
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.bump();
                self.expect_operator(Operator::Semi)?;
                Ok(Stmt::Break { span: start })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.bump();
                self.expect_operator(Operator::Semi)?;
                Ok(Stmt::Continue { span: start })
            }
            _ if self.starts_declaration() => {
                let decl = self.parse_local_var_decl()?;
                Ok(Stmt::VarDecl(decl))
            }
            TokenKind::AsmOp(_) => {
                let call = self.parse_expr()?;
                self.expect_operator(Operator::Semi)?;
                let span = start.to(self.current_span());
                Ok(Stmt::AsmStmt { call, span })
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect_operator(Operator::Semi)?;
                let span = start.to(self.current_span());
                Ok(Stmt::Expr { expr, span })
            }
        }
    }

    pub(crate) fn parse_compound_statement(&mut self) -> PResult<Stmt> {
        let start = self.current_span();
        self.expect_operator(Operator::LBrace)?;
        let mut statements = Vec::new();
        while !self.is_operator(Operator::RBrace) && !self.at_eof() {
            statements.push(self.parse_statement()?);
        }
        self.expect_operator(Operator::RBrace)?;
        let span = start.to(self.current_span());
        Ok(Stmt::Compound { statements, span })
    }

    fn parse_if_statement(&mut self) -> PResult<Stmt> {
        let start = self.current_span();
        self.bump(); // `if`
        self.expect_operator(Operator::LParen)?;
        let cond = self.parse_expr()?;
        self.expect_operator(Operator::RParen)?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch =
            if self.eat_keyword(Keyword::Else) { Some(Box::new(self.parse_statement()?)) } else { None };
        let span = start.to(self.current_span());
        Ok(Stmt::If { cond, then_branch, else_branch, span })
    }

    fn parse_for_statement(&mut self) -> PResult<Stmt> {
        let start = self.current_span();
        self.bump(); // `for`
        self.expect_operator(Operator::LParen)?;
        let init_start = self.current_span();
        let init = if self.is_operator(Operator::Semi) {
            self.bump();
            ForInit { decl: None, expr: None, span: init_start }
        } else if self.starts_declaration() {
            let decl = self.parse_local_var_decl()?;
            ForInit { decl: Some(decl), expr: None, span: init_start }
        } else {
            let expr = self.parse_expr()?;
            self.expect_operator(Operator::Semi)?;
            ForInit { decl: None, expr: Some(expr), span: init_start }
        };
        let cond = if self.is_operator(Operator::Semi) { None } else { Some(self.parse_expr()?) };
        self.expect_operator(Operator::Semi)?;
        let increment = if self.is_operator(Operator::RParen) { None } else { Some(self.parse_expr()?) };
        self.expect_operator(Operator::RParen)?;
        let body = Box::new(self.parse_statement()?);
        let span = start.to(self.current_span());
        Ok(Stmt::For { init, cond, increment, body, span })
    }

    /// `while` and `do`/`while` are not lowerable (`spec.md` §4.8 Non-goals
    /// exclude unbounded loops), but the parser still consumes their full
    /// grammar so later source in the same file keeps parsing.
    fn skip_while_statement(&mut self) -> PResult<()> {
        self.bump(); // `while`
        self.expect_operator(Operator::LParen)?;
        self.parse_expr()?;
        self.expect_operator(Operator::RParen)?;
        self.parse_statement()?;
        Ok(())
    }

    fn skip_do_statement(&mut self) -> PResult<()> {
        self.bump(); // `do`
        self.parse_statement()?;
        if !self.eat_keyword(Keyword::While) {
            return self.error(DiagnosticCode::L0001);
        }
        self.expect_operator(Operator::LParen)?;
        self.parse_expr()?;
        self.expect_operator(Operator::RParen)?;
        self.expect_operator(Operator::Semi)?;
        Ok(())
    }

    /// A statement starts a local declaration when it opens with a type
    /// name: a keyword type, `struct`, a precision qualifier, or `const`.
    /// Anything else that starts with an identifier is an expression
    /// (a call, an assignment, a bare reference).
    fn starts_declaration(&self) -> bool {
        match self.peek() {
            TokenKind::Keyword(Keyword::Const)
            | TokenKind::Keyword(Keyword::Struct)
            | TokenKind::Keyword(Keyword::Highp)
            | TokenKind::Keyword(Keyword::Mediump)
            | TokenKind::Keyword(Keyword::Lowp) => true,
            TokenKind::Keyword(kw) => crate::ty::primitive_name(*kw).is_some(),
            _ => false,
        }
    }

    fn parse_local_var_decl(&mut self) -> PResult<LocalVarDecl> {
        let start = self.current_span();
        let specifier = self.parse_fully_specified_type()?;
        let mut declarators = vec![self.parse_struct_declarator()?];
        let mut initializers = vec![self.parse_optional_initializer()?];
        while self.eat_operator(Operator::Comma) {
            declarators.push(self.parse_struct_declarator()?);
            initializers.push(self.parse_optional_initializer()?);
        }
        self.expect_operator(Operator::Semi)?;
        let span = start.to(self.current_span());
        Ok(LocalVarDecl { specifier, declarators, initializers, span })
    }

    pub(crate) fn parse_optional_initializer(&mut self) -> PResult<Option<glsl_ast::Expr>> {
        if self.eat_operator(Operator::Assign) {
            Ok(Some(self.parse_assignment_initializer()?))
        } else {
            Ok(None)
        }
    }

    /// Initializers bind tighter than the comma that separates declarators
    /// in the same declaration, so they parse as assignment-expressions
    /// rather than full (comma-containing) expressions.
    fn parse_assignment_initializer(&mut self) -> PResult<glsl_ast::Expr> {
        self.parse_expr()
    }
}

#[cfg(test)]
mod tests {
    use glsl_lexer::tokenize;
    use glsl_reporting::ShaderLog;

    use super::*;

    fn parse_body(src: &str) -> Stmt {
        let full = format!("void main() {{ {src} }}");
        let mut lex_log = ShaderLog::new();
        let tokens = tokenize(&full, &mut lex_log);
        assert!(!lex_log.has_errors(), "lexing failed: {}", lex_log.render());
        let mut log = ShaderLog::new();
        let mut p = Parser::new(&tokens, &mut log);
        let unit = p.parse_translation_unit().unwrap_or_else(|_| panic!("parse failed: {}", log.render()));
        let glsl_ast::ExternalDecl::Function(f) = &unit.decls[0] else { panic!("expected a function") };
        f.body.clone().unwrap()
    }

    #[test]
    fn for_loop_declares_its_own_counter() {
        let Stmt::Compound { statements, .. } = parse_body("for (int i = 0; i < 4; i++) { }") else {
            panic!("expected a compound body")
        };
        let Stmt::For { init, cond, increment, .. } = &statements[0] else { panic!("expected a for loop") };
        assert!(init.decl.is_some());
        assert!(cond.is_some());
        assert!(increment.is_some());
    }

    #[test]
    fn while_loop_parses_as_unsupported() {
        let Stmt::Compound { statements, .. } = parse_body("while (true) { break; }") else {
            panic!("expected a compound body")
        };
        assert!(matches!(statements[0], Stmt::UnsupportedLoop { .. }));
    }

    #[test]
    fn do_while_loop_parses_as_unsupported() {
        let Stmt::Compound { statements, .. } = parse_body("do { break; } while (true);") else {
            panic!("expected a compound body")
        };
        assert!(matches!(statements[0], Stmt::UnsupportedLoop { .. }));
    }
}
