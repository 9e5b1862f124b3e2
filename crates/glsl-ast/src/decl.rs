//! Top-level / external declaration nodes (`spec.md` §4.6).

use glsl_utils::span::Span;

use crate::stmt::Stmt;
use crate::ty::{FullySpecifiedType, PrecisionQualifier, PrimitiveName, StructDeclarator, TypeSpecifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub is_const: bool,
    pub direction: ParamDirection,
    pub specifier: TypeSpecifier,
    /// Anonymous parameters receive a synthesized `$<index>` name at parse
    /// time (`spec.md` §4.6), so this is never empty.
    pub name: String,
    pub array_len: Option<u32>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub return_type: TypeSpecifier,
    pub name: String,
    pub params: Vec<Param>,
    /// `None` for a prototype (`;`), `Some` for a definition.
    pub body: Option<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct PrecisionDecl {
    pub precision: PrecisionQualifier,
    pub ty: PrimitiveName,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InvariantDecl {
    pub names: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct GlobalVarDecl {
    pub specifier: FullySpecifiedType,
    pub declarators: Vec<StructDeclarator>,
    pub initializers: Vec<Option<crate::expr::Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExternalDecl {
    Function(FunctionDecl),
    Precision(PrecisionDecl),
    Invariant(InvariantDecl),
    Variable(GlobalVarDecl),
    /// A bare `struct Name { ... };` declaration with no variable attached.
    StructOnly(crate::ty::StructSpecifier),
}

#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub decls: Vec<ExternalDecl>,
}
