//! Statement nodes (`spec.md` §4.8).

use glsl_utils::span::Span;

use crate::expr::Expr;
use crate::ty::{FullySpecifiedType, StructDeclarator};

#[derive(Debug, Clone)]
pub struct LocalVarDecl {
    pub specifier: FullySpecifiedType,
    pub declarators: Vec<StructDeclarator>,
    /// Parallel to `declarators`; `None` when a declarator has no
    /// initializer.
    pub initializers: Vec<Option<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForInit {
    pub decl: Option<LocalVarDecl>,
    pub expr: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Compound { statements: Vec<Stmt>, span: Span },
    Expr { expr: Expr, span: Span },
    /// The empty statement (`;`).
    Empty { span: Span },
    VarDecl(LocalVarDecl),
    If { cond: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>>, span: Span },
    For {
        init: ForInit,
        cond: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    /// `while`/`do-while`, rejected during lowering with `X0001`; kept in
    /// the AST so the parser can still build a tree and let lowering emit
    /// the diagnostic at the statement's span.
    UnsupportedLoop { span: Span },
    Return { value: Option<Expr>, span: Span },
    Discard { span: Span },
    Break { span: Span },
    Continue { span: Span },
    AsmStmt { call: Expr, span: Span },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Compound { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::Empty { span }
            | Stmt::If { span, .. }
            | Stmt::For { span, .. }
            | Stmt::UnsupportedLoop { span }
            | Stmt::Return { span, .. }
            | Stmt::Discard { span }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::AsmStmt { span, .. } => *span,
            Stmt::VarDecl(decl) => decl.span,
        }
    }
}
