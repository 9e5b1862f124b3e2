//! Type-specifier nodes (`spec.md` §4.6 grammar).

use glsl_utils::span::Span;

use crate::expr::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecisionQualifier {
    Highp,
    Mediump,
    Lowp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeQualifier {
    None,
    Const,
    Attribute,
    Varying,
    InvariantVarying,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveName {
    Void,
    Bool,
    Int,
    Float,
    Bvec2,
    Bvec3,
    Bvec4,
    Ivec2,
    Ivec3,
    Ivec4,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
    Sampler3D,
    SamplerCube,
}

/// `type_specifier_no_prec`: either a primitive keyword, a previously
/// declared `struct`/typedef name, or an inline `struct { ... }` body.
#[derive(Debug, Clone)]
pub enum TypeSpecifierKind {
    Primitive(PrimitiveName),
    Named(String),
    Struct(StructSpecifier),
}

#[derive(Debug, Clone)]
pub struct TypeSpecifier {
    pub precision: Option<PrecisionQualifier>,
    pub kind: TypeSpecifierKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FullySpecifiedType {
    pub qualifier: TypeQualifier,
    pub specifier: TypeSpecifier,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructDeclarator {
    pub name: String,
    /// `[const_expr]`; folded to a constant during lowering (`S0002`).
    pub array_len: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructFieldDecl {
    pub specifier: TypeSpecifier,
    pub declarators: Vec<StructDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructSpecifier {
    pub name: Option<String>,
    pub fields: Vec<StructFieldDecl>,
    pub span: Span,
}
