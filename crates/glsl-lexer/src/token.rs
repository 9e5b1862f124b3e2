//! Token kinds (`spec.md` §4.5.1).

use std::fmt;

use glsl_utils::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Attribute,
    Const,
    Uniform,
    Varying,
    Invariant,
    In,
    Out,
    Inout,
    Struct,
    Void,
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Bvec2,
    Bvec3,
    Bvec4,
    Ivec2,
    Ivec3,
    Ivec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    True,
    False,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Return,
    Discard,
    Precision,
    Highp,
    Mediump,
    Lowp,
}

impl Keyword {
    pub fn lookup(ident: &str) -> Option<Keyword> {
        use Keyword::*;
        Some(match ident {
            "attribute" => Attribute,
            "const" => Const,
            "uniform" => Uniform,
            "varying" => Varying,
            "invariant" => Invariant,
            "in" => In,
            "out" => Out,
            "inout" => Inout,
            "struct" => Struct,
            "void" => Void,
            "bool" => Bool,
            "int" => Int,
            "float" => Float,
            "vec2" => Vec2,
            "vec3" => Vec3,
            "vec4" => Vec4,
            "bvec2" => Bvec2,
            "bvec3" => Bvec3,
            "bvec4" => Bvec4,
            "ivec2" => Ivec2,
            "ivec3" => Ivec3,
            "ivec4" => Ivec4,
            "mat2" => Mat2,
            "mat3" => Mat3,
            "mat4" => Mat4,
            "sampler2D" => Sampler2D,
            "sampler3D" => Sampler3D,
            "samplerCube" => SamplerCube,
            "true" => True,
            "false" => False,
            "if" => If,
            "else" => Else,
            "for" => For,
            "while" => While,
            "do" => Do,
            "break" => Break,
            "continue" => Continue,
            "return" => Return,
            "discard" => Discard,
            "precision" => Precision,
            "highp" => Highp,
            "mediump" => Mediump,
            "lowp" => Lowp,
            // `while`/`do` are recognized so the parser can reject them with
            // `X0001` rather than treating them as unknown identifiers.
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    AndAnd,
    OrOr,
    XorXor,
    Not,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Question,
    Colon,
    /// Bitwise operators have no ESSL-100 expression-grammar use; they
    /// exist only for `#if` integer expressions (`spec.md` §4.5.3).
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    /// `__asmOP` / `__asmOP_SAT` family (`spec.md` §4.5.1); carries the
    /// opcode name with the `__asm` prefix stripped.
    AsmOp(String),
    Retval,
    IntConstant(i64),
    FloatConstant(f64),
    Operator(Operator),
    Eol,
    Eof,
    Hash,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: u32,
}

impl Operator {
    /// The literal source spelling, used where directive handling needs to
    /// reconstruct text rather than debug-print the token (`#pragma`,
    /// `#extension`, `#error`).
    pub fn as_str(self) -> &'static str {
        use Operator::*;
        match self {
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Assign => "=",
            EqEq => "==",
            NotEq => "!=",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            AndAnd => "&&",
            OrOr => "||",
            XorXor => "^^",
            Not => "!",
            PlusPlus => "++",
            MinusMinus => "--",
            PlusEq => "+=",
            MinusEq => "-=",
            StarEq => "*=",
            SlashEq => "/=",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Semi => ";",
            Comma => ",",
            Dot => ".",
            Question => "?",
            Colon => ":",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            Shl => "<<",
            Shr => ">>",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "{k:?}"),
            TokenKind::Identifier(s) => write!(f, "{s}"),
            TokenKind::AsmOp(s) => write!(f, "__asm{s}"),
            TokenKind::Retval => write!(f, "__retval"),
            TokenKind::IntConstant(v) => write!(f, "{v}"),
            TokenKind::FloatConstant(v) => write!(f, "{v}"),
            TokenKind::Operator(o) => write!(f, "{}", o.as_str()),
            TokenKind::Eol => write!(f, "<eol>"),
            TokenKind::Eof => write!(f, "<eof>"),
            TokenKind::Hash => write!(f, "#"),
            TokenKind::Error(s) => write!(f, "<error: {s}>"),
        }
    }
}
