//! External (top-level) declaration parsing (`spec.md` §4.6): functions,
//! global variables, `precision` statements, `invariant` re-declarations,
//! and bare `struct` declarations.

use glsl_ast::{
    ExternalDecl, FunctionDecl, GlobalVarDecl, InvariantDecl, Param, ParamDirection, PrecisionDecl,
    TranslationUnit, TypeQualifier, TypeSpecifierKind,
};
use glsl_lexer::{Keyword, Operator, TokenKind};
use glsl_reporting::DiagnosticCode;

use crate::{PResult, Parser};

pub(crate) fn parse_translation_unit(p: &mut Parser) -> PResult<TranslationUnit> {
    let mut decls = Vec::new();
    while !p.at_eof() {
        decls.push(p.parse_external_decl()?);
    }
    Ok(TranslationUnit { decls })
}

impl<'a> Parser<'a> {
    fn parse_external_decl(&mut self) -> PResult<ExternalDecl> {
        let start = self.current_span();
        if self.is_keyword(Keyword::Precision) {
            return self.parse_precision_decl(start);
        }
        if self.is_keyword(Keyword::Invariant) && self.peek_nth(1) != &TokenKind::Keyword(Keyword::Varying) {
            return self.parse_invariant_decl(start);
        }

        let fst = self.parse_fully_specified_type()?;

        if fst.qualifier == TypeQualifier::None {
            if let TypeSpecifierKind::Struct(spec) = &fst.specifier.kind {
                if self.eat_operator(Operator::Semi) {
                    return Ok(ExternalDecl::StructOnly(spec.clone()));
                }
            }
            if let TokenKind::Identifier(name) = self.peek().clone() {
                if self.peek_nth(1) == &TokenKind::Operator(Operator::LParen) {
                    self.bump(); // the name
                    return self.parse_function_decl(fst.specifier, name, start);
                }
            }
        }

        self.parse_global_var_decl(fst, start)
    }

    fn parse_precision_decl(&mut self, start: glsl_utils::span::Span) -> PResult<ExternalDecl> {
        self.bump(); // `precision`
        let Some(precision) = self.parse_precision_qualifier() else {
            return self.error(DiagnosticCode::L0001);
        };
        let ty = match self.peek().clone() {
            TokenKind::Keyword(kw) => match crate::ty::primitive_name(kw) {
                Some(name) => {
                    self.bump();
                    name
                }
                None => return self.error(DiagnosticCode::L0001),
            },
            _ => return self.error(DiagnosticCode::L0001),
        };
        self.expect_operator(Operator::Semi)?;
        let span = start.to(self.current_span());
        Ok(ExternalDecl::Precision(PrecisionDecl { precision, ty, span }))
    }

    fn parse_invariant_decl(&mut self, start: glsl_utils::span::Span) -> PResult<ExternalDecl> {
        self.bump(); // `invariant`
        let mut names = vec![self.expect_identifier()?];
        while self.eat_operator(Operator::Comma) {
            names.push(self.expect_identifier()?);
        }
        self.expect_operator(Operator::Semi)?;
        let span = start.to(self.current_span());
        Ok(ExternalDecl::Invariant(InvariantDecl { names, span }))
    }

    fn parse_function_decl(
        &mut self,
        return_type: glsl_ast::TypeSpecifier,
        name: String,
        start: glsl_utils::span::Span,
    ) -> PResult<ExternalDecl> {
        self.expect_operator(Operator::LParen)?;
        let mut params = Vec::new();
        if !self.is_operator(Operator::RParen) {
            if self.is_keyword(Keyword::Void) && self.peek_nth(1) == &TokenKind::Operator(Operator::RParen) {
                self.bump();
            } else {
                params.push(self.parse_param(params.len())?);
                while self.eat_operator(Operator::Comma) {
                    params.push(self.parse_param(params.len())?);
                }
            }
        }
        self.expect_operator(Operator::RParen)?;
        let body = if self.eat_operator(Operator::Semi) { None } else { Some(self.parse_compound_statement()?) };
        let span = start.to(self.current_span());
        Ok(ExternalDecl::Function(FunctionDecl { return_type, name, params, body, span }))
    }

    fn parse_param(&mut self, index: usize) -> PResult<Param> {
        let start = self.current_span();
        let is_const = self.eat_keyword(Keyword::Const);
        let direction = if self.eat_keyword(Keyword::In) {
            ParamDirection::In
        } else if self.eat_keyword(Keyword::Out) {
            ParamDirection::Out
        } else if self.eat_keyword(Keyword::Inout) {
            ParamDirection::InOut
        } else {
            ParamDirection::In
        };
        let specifier = self.parse_type_specifier()?;
        // Anonymous parameters (no identifier follows the type) are
        // synthesized a positional name so later stages can still refer to
        // them as ordinary locals.
        let name = if let TokenKind::Identifier(n) = self.peek().clone() {
            self.bump();
            n
        } else {
            format!("${index}")
        };
        let array_len = if self.eat_operator(Operator::LBracket) {
            let len = self.expect_int_constant()?;
            self.expect_operator(Operator::RBracket)?;
            Some(len)
        } else {
            None
        };
        let span = start.to(self.current_span());
        Ok(Param { is_const, direction, specifier, name, array_len, span })
    }

    /// Parameter array sizes must be manifest constants; unlike local/global
    /// declarators (`spec.md` §4.6 allows a general constant expression
    /// there, folded during lowering), a parameter's size is needed before
    /// any lowering happens, so only a literal is accepted here.
    fn expect_int_constant(&mut self) -> PResult<u32> {
        match self.peek().clone() {
            TokenKind::IntConstant(v) if v >= 0 => {
                self.bump();
                Ok(v as u32)
            }
            _ => self.error(DiagnosticCode::L0001),
        }
    }

    fn parse_global_var_decl(
        &mut self,
        specifier: glsl_ast::FullySpecifiedType,
        start: glsl_utils::span::Span,
    ) -> PResult<ExternalDecl> {
        let mut declarators = vec![self.parse_struct_declarator()?];
        let mut initializers = vec![self.parse_optional_initializer()?];
        while self.eat_operator(Operator::Comma) {
            declarators.push(self.parse_struct_declarator()?);
            initializers.push(self.parse_optional_initializer()?);
        }
        self.expect_operator(Operator::Semi)?;
        let span = start.to(self.current_span());
        Ok(ExternalDecl::Variable(GlobalVarDecl { specifier, declarators, initializers, span }))
    }
}

#[cfg(test)]
mod tests {
    use glsl_lexer::tokenize;
    use glsl_reporting::ShaderLog;

    use super::*;
    use crate::Parser;

    fn parse(src: &str) -> TranslationUnit {
        let mut lex_log = ShaderLog::new();
        let tokens = tokenize(src, &mut lex_log);
        assert!(!lex_log.has_errors(), "lexing failed: {}", lex_log.render());
        let mut log = ShaderLog::new();
        let mut p = Parser::new(&tokens, &mut log);
        p.parse_translation_unit().unwrap_or_else(|_| panic!("parse failed: {}", log.render()))
    }

    #[test]
    fn precision_decl_parses() {
        let unit = parse("precision highp float;\nvoid main() { }\n");
        assert!(matches!(unit.decls[0], ExternalDecl::Precision(_)));
    }

    #[test]
    fn invariant_redeclaration_parses() {
        let unit = parse(
            "varying vec4 v_color;\ninvariant v_color;\nvoid main() { }\n",
        );
        assert!(matches!(unit.decls[1], ExternalDecl::Invariant(_)));
    }

    #[test]
    fn invariant_varying_qualifier_is_not_a_redeclaration() {
        let unit = parse("invariant varying vec4 v_color;\nvoid main() { }\n");
        match &unit.decls[0] {
            ExternalDecl::Variable(v) => assert_eq!(v.specifier.qualifier, TypeQualifier::InvariantVarying),
            other => panic!("expected a variable decl, got {other:?}"),
        }
    }

    #[test]
    fn function_prototype_then_definition() {
        let unit = parse(
            r#"
            float square(float x);
            float square(float x) { return x * x; }
            void main() { }
            "#,
        );
        match &unit.decls[0] {
            ExternalDecl::Function(f) => assert!(f.body.is_none()),
            other => panic!("expected a prototype, got {other:?}"),
        }
        match &unit.decls[1] {
            ExternalDecl::Function(f) => assert!(f.body.is_some()),
            other => panic!("expected a definition, got {other:?}"),
        }
    }

    #[test]
    fn anonymous_parameter_gets_synthesized_name() {
        let unit = parse("float identity(float) { return 0.0; }\n");
        match &unit.decls[0] {
            ExternalDecl::Function(f) => assert_eq!(f.params[0].name, "$0"),
            other => panic!("expected a function, got {other:?}"),
        }
    }

    #[test]
    fn struct_only_decl_has_no_variable() {
        let unit = parse("struct Light { vec3 color; };\nvoid main() { }\n");
        assert!(matches!(unit.decls[0], ExternalDecl::StructOnly(_)));
    }

    #[test]
    fn global_variable_with_initializer() {
        let unit = parse("const float kPi = 3.14159;\nvoid main() { }\n");
        match &unit.decls[0] {
            ExternalDecl::Variable(v) => {
                assert_eq!(v.specifier.qualifier, TypeQualifier::Const);
                assert!(v.initializers[0].is_some());
            }
            other => panic!("expected a variable decl, got {other:?}"),
        }
    }
}
