//! Abstract syntax tree (`spec.md` §4.6–§4.8): the parse-tree shape that
//! `glsl-parser` builds and `glsl-lower` consumes.

pub mod decl;
pub mod expr;
pub mod stmt;
pub mod ty;

pub use decl::{
    ExternalDecl, FunctionDecl, GlobalVarDecl, InvariantDecl, Param, ParamDirection, PrecisionDecl,
    TranslationUnit,
};
pub use expr::{AssignOp, BinOp, Expr, PostfixOp, UnOp};
pub use stmt::{ForInit, LocalVarDecl, Stmt};
pub use ty::{
    FullySpecifiedType, PrecisionQualifier, PrimitiveName, StructDeclarator, StructFieldDecl,
    StructSpecifier, TypeQualifier, TypeSpecifier, TypeSpecifierKind,
};
