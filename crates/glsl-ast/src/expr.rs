//! Expression nodes (`spec.md` §4.7.1 grammar). This is the raw parse tree;
//! `glsl-lower` turns it into the `Expression` representation of `spec.md`
//! §3.3 (constant folding, register lowering, swizzle synthesis).

use glsl_utils::span::Span;

use crate::ty::TypeSpecifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    Xor,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    PreInc,
    PreDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    MulAssign,
    DivAssign,
    AddAssign,
    SubAssign,
}

#[derive(Debug, Clone)]
pub enum Expr {
    IntLiteral { value: i64, span: Span },
    FloatLiteral { value: f64, span: Span },
    BoolLiteral { value: bool, span: Span },
    /// `__retval`, only legal inside the synthesized body of a built-in
    /// function emulated via inline assembly.
    Retval { span: Span },
    Ident { name: String, span: Span },
    Field { base: Box<Expr>, name: String, span: Span },
    Index { base: Box<Expr>, index: Box<Expr>, span: Span },
    Unary { op: UnOp, operand: Box<Expr>, span: Span },
    Postfix { op: PostfixOp, operand: Box<Expr>, span: Span },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, span: Span },
    Conditional { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr>, span: Span },
    Assign { op: AssignOp, target: Box<Expr>, value: Box<Expr>, span: Span },
    /// `ident(args)`: disambiguated during lowering into a function call or
    /// a type constructor by looking the name up in scope.
    Call { callee: String, args: Vec<Expr>, span: Span },
    /// `T(args)` where `T` is a primitive/vector/matrix type name — kept
    /// distinct from `Call` because the callee is a type, not an
    /// identifier, and the parser already knows which case it is.
    Constructor { ty: TypeSpecifier, args: Vec<Expr>, span: Span },
    /// Inline-assembly call (`__asmOP(dst, src, ...)`), bypassing type
    /// checking (`spec.md` §4.8).
    AsmCall { opcode: String, args: Vec<Expr>, span: Span },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLiteral { span, .. }
            | Expr::FloatLiteral { span, .. }
            | Expr::BoolLiteral { span, .. }
            | Expr::Retval { span }
            | Expr::Ident { span, .. }
            | Expr::Field { span, .. }
            | Expr::Index { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Postfix { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Call { span, .. }
            | Expr::Constructor { span, .. }
            | Expr::AsmCall { span, .. } => *span,
        }
    }
}
