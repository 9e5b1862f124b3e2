//! Type-specifier parsing (`spec.md` §4.6 grammar).

use glsl_ast::{
    FullySpecifiedType, PrecisionQualifier, PrimitiveName, StructDeclarator, StructFieldDecl,
    StructSpecifier, TypeQualifier, TypeSpecifier, TypeSpecifierKind,
};
use glsl_lexer::{Keyword, Operator, TokenKind};
use glsl_reporting::DiagnosticCode;

use crate::{PResult, Parser};

pub fn primitive_name(kw: Keyword) -> Option<PrimitiveName> {
    use Keyword::*;
    Some(match kw {
        Void => PrimitiveName::Void,
        Bool => PrimitiveName::Bool,
        Int => PrimitiveName::Int,
        Float => PrimitiveName::Float,
        Bvec2 => PrimitiveName::Bvec2,
        Bvec3 => PrimitiveName::Bvec3,
        Bvec4 => PrimitiveName::Bvec4,
        Ivec2 => PrimitiveName::Ivec2,
        Ivec3 => PrimitiveName::Ivec3,
        Ivec4 => PrimitiveName::Ivec4,
        Vec2 => PrimitiveName::Vec2,
        Vec3 => PrimitiveName::Vec3,
        Vec4 => PrimitiveName::Vec4,
        Mat2 => PrimitiveName::Mat2,
        Mat3 => PrimitiveName::Mat3,
        Mat4 => PrimitiveName::Mat4,
        Sampler2D => PrimitiveName::Sampler2D,
        Sampler3D => PrimitiveName::Sampler3D,
        SamplerCube => PrimitiveName::SamplerCube,
        _ => return None,
    })
}

impl<'a> Parser<'a> {
    pub(crate) fn parse_precision_qualifier(&mut self) -> Option<PrecisionQualifier> {
        if self.eat_keyword(Keyword::Highp) {
            Some(PrecisionQualifier::Highp)
        } else if self.eat_keyword(Keyword::Mediump) {
            Some(PrecisionQualifier::Mediump)
        } else if self.eat_keyword(Keyword::Lowp) {
            Some(PrecisionQualifier::Lowp)
        } else {
            None
        }
    }

    /// `type_specifier ::= precision_modifier type_specifier_no_prec`.
    pub(crate) fn parse_type_specifier(&mut self) -> PResult<TypeSpecifier> {
        let start = self.current_span();
        let precision = self.parse_precision_qualifier();
        let kind = if self.is_keyword(Keyword::Struct) {
            TypeSpecifierKind::Struct(self.parse_struct_specifier()?)
        } else if let TokenKind::Keyword(kw) = self.peek().clone() {
            match primitive_name(kw) {
                Some(name) => {
                    self.bump();
                    TypeSpecifierKind::Primitive(name)
                }
                None => return self.error(DiagnosticCode::L0001),
            }
        } else if let TokenKind::Identifier(name) = self.peek().clone() {
            self.bump();
            TypeSpecifierKind::Named(name)
        } else {
            return self.error(DiagnosticCode::L0001);
        };
        Ok(TypeSpecifier { precision, kind, span: start })
    }

    /// `fully_specified_type ::= [qualifier] type_specifier`.
    pub(crate) fn parse_fully_specified_type(&mut self) -> PResult<FullySpecifiedType> {
        let start = self.current_span();
        let qualifier = if self.is_keyword(Keyword::Invariant) && self.peek_nth(1) == &TokenKind::Keyword(Keyword::Varying)
        {
            self.bump();
            self.bump();
            TypeQualifier::InvariantVarying
        } else if self.eat_keyword(Keyword::Const) {
            TypeQualifier::Const
        } else if self.eat_keyword(Keyword::Attribute) {
            TypeQualifier::Attribute
        } else if self.eat_keyword(Keyword::Varying) {
            TypeQualifier::Varying
        } else if self.eat_keyword(Keyword::Uniform) {
            TypeQualifier::Uniform
        } else {
            TypeQualifier::None
        };
        let specifier = self.parse_type_specifier()?;
        Ok(FullySpecifiedType { qualifier, specifier, span: start })
    }

    /// `struct_specifier ::= "struct" [ident] "{" struct_declaration+ "}"`.
    /// Nested struct specifiers are rejected by `nesting` acting as a
    /// recursion guard (`spec.md` §4.6).
    pub(crate) fn parse_struct_specifier(&mut self) -> PResult<StructSpecifier> {
        self.parse_struct_specifier_at_depth(0)
    }

    fn parse_struct_specifier_at_depth(&mut self, depth: u32) -> PResult<StructSpecifier> {
        const MAX_STRUCT_NESTING: u32 = 1;
        let start = self.current_span();
        self.bump(); // `struct`
        if depth > MAX_STRUCT_NESTING {
            return self.error(DiagnosticCode::L0001);
        }
        let name = if let TokenKind::Identifier(n) = self.peek().clone() {
            self.bump();
            Some(n)
        } else {
            None
        };
        self.expect_operator(Operator::LBrace)?;
        let mut fields = Vec::new();
        while !self.is_operator(Operator::RBrace) && !self.at_eof() {
            fields.push(self.parse_struct_field_decl(depth)?);
        }
        self.expect_operator(Operator::RBrace)?;
        Ok(StructSpecifier { name, fields, span: start })
    }

    fn parse_struct_field_decl(&mut self, depth: u32) -> PResult<StructFieldDecl> {
        let start = self.current_span();
        let precision = self.parse_precision_qualifier();
        let kind = if self.is_keyword(Keyword::Struct) {
            TypeSpecifierKind::Struct(self.parse_struct_specifier_at_depth(depth + 1)?)
        } else if let TokenKind::Keyword(kw) = self.peek().clone() {
            match primitive_name(kw) {
                Some(name) => {
                    self.bump();
                    TypeSpecifierKind::Primitive(name)
                }
                None => return self.error(DiagnosticCode::L0001),
            }
        } else if let TokenKind::Identifier(name) = self.peek().clone() {
            self.bump();
            TypeSpecifierKind::Named(name)
        } else {
            return self.error(DiagnosticCode::L0001);
        };
        let specifier = TypeSpecifier { precision, kind, span: start };
        let mut declarators = vec![self.parse_struct_declarator()?];
        while self.eat_operator(Operator::Comma) {
            declarators.push(self.parse_struct_declarator()?);
        }
        self.expect_operator(Operator::Semi)?;
        Ok(StructFieldDecl { specifier, declarators, span: start })
    }

    pub(crate) fn parse_struct_declarator(&mut self) -> PResult<StructDeclarator> {
        let start = self.current_span();
        let name = self.expect_identifier()?;
        let array_len = if self.eat_operator(Operator::LBracket) {
            let e = self.parse_expr()?;
            self.expect_operator(Operator::RBracket)?;
            Some(Box::new(e))
        } else {
            None
        };
        Ok(StructDeclarator { name, array_len, span: start })
    }
}
