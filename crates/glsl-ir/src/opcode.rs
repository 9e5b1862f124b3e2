//! IL opcode set (`spec.md` §4.10.1; `Opcode` in
//! `original_source/src/gl/frontend/il.h`).

use std::fmt;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, AsRefStr, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Opcode {
    // Address
    Arl,
    // Arithmetic
    Abs,
    Add,
    Mul,
    Sub,
    Mad,
    Lrp,
    Cmp,
    Min,
    Max,
    Flr,
    Frc,
    Mov,
    Pow,
    Rcp,
    Rsq,
    Ex2,
    Lg2,
    Exp,
    Log,
    Scs,
    Sin,
    Cos,
    Ssg,
    // `_SAT` saturating variants of every arithmetic opcode above.
    AbsSat,
    AddSat,
    MulSat,
    SubSat,
    MadSat,
    LrpSat,
    CmpSat,
    MinSat,
    MaxSat,
    FlrSat,
    FrcSat,
    MovSat,
    PowSat,
    RcpSat,
    RsqSat,
    Ex2Sat,
    Lg2Sat,
    ExpSat,
    LogSat,
    ScsSat,
    SinSat,
    CosSat,
    SsgSat,
    // Reductions
    Dp2,
    Dp3,
    Dp4,
    Dph,
    Dst,
    // Comparisons
    Seq,
    Sne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Sfl,
    Str,
    // Extended swizzle
    Swz,
    // Texture
    Tex,
    Txb,
    Txl,
    Txp,
    // Cross product
    Xpd,
    // Control
    Cal,
    Bra,
    Ret,
    Brk,
    If,
    Else,
    Endif,
    Loop,
    Endloop,
    Rep,
    Endrep,
    Kil,
    // Vincent extensions
    Scc,
    Phi,
}

impl Opcode {
    /// Every arithmetic opcode has a `_SAT` sibling (`spec.md` §4.10.1).
    pub fn saturating(self) -> Option<Opcode> {
        use Opcode::*;
        Some(match self {
            Abs => AbsSat,
            Add => AddSat,
            Mul => MulSat,
            Sub => SubSat,
            Mad => MadSat,
            Lrp => LrpSat,
            Cmp => CmpSat,
            Min => MinSat,
            Max => MaxSat,
            Flr => FlrSat,
            Frc => FrcSat,
            Mov => MovSat,
            Pow => PowSat,
            Rcp => RcpSat,
            Rsq => RsqSat,
            Ex2 => Ex2Sat,
            Lg2 => Lg2Sat,
            Exp => ExpSat,
            Log => LogSat,
            Scs => ScsSat,
            Sin => SinSat,
            Cos => CosSat,
            Ssg => SsgSat,
            _ => return None,
        })
    }

    /// Control-flow opcodes end the current block and start a new one
    /// (`spec.md` §4.10.2).
    pub fn ends_block(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Cal | Bra | Ret | Brk | If | Else | Endif | Loop | Endloop | Rep | Endrep | Kil
        )
    }

    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            AbsSat => "ABS_SAT",
            AddSat => "ADD_SAT",
            MulSat => "MUL_SAT",
            SubSat => "SUB_SAT",
            MadSat => "MAD_SAT",
            LrpSat => "LRP_SAT",
            CmpSat => "CMP_SAT",
            MinSat => "MIN_SAT",
            MaxSat => "MAX_SAT",
            FlrSat => "FLR_SAT",
            FrcSat => "FRC_SAT",
            MovSat => "MOV_SAT",
            PowSat => "POW_SAT",
            RcpSat => "RCP_SAT",
            RsqSat => "RSQ_SAT",
            Ex2Sat => "EX2_SAT",
            Lg2Sat => "LG2_SAT",
            ExpSat => "EXP_SAT",
            LogSat => "LOG_SAT",
            ScsSat => "SCS_SAT",
            SinSat => "SIN_SAT",
            CosSat => "COS_SAT",
            SsgSat => "SSG_SAT",
            other => other.into(),
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Opcode> {
        if let Some(base) = s.strip_suffix("_SAT") {
            let base: Opcode = base.parse().ok()?;
            return base.saturating();
        }
        s.parse().ok()
    }

    pub fn iter_all() -> impl Iterator<Item = Opcode> {
        Opcode::iter()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// `Cond`: `F | LT | EQ | LE | GT | NE | GE | T`, bits encode less/equal/greater
/// (`spec.md` §4.10.1).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, AsRefStr, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Cond {
    F,
    Lt,
    Eq,
    Le,
    Gt,
    Ne,
    Ge,
    T,
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// `spec.md` §4.10.1 `Tex` instruction target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    D2,
    D3,
    Cube,
}

impl fmt::Display for TextureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureTarget::D2 => write!(f, "2D"),
            TextureTarget::D3 => write!(f, "3D"),
            TextureTarget::Cube => write!(f, "CUBE"),
        }
    }
}

/// Extended-swizzle operand for `SWZ` (`spec.md` §4.10.4): `0 | 1 | -0 | -1 | ±x | ±y | ±z | ±w`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ExtSwizzleOption {
    Zero { negate: bool },
    One { negate: bool },
    Component { index: u8, negate: bool },
}

impl fmt::Display for ExtSwizzleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = |n: bool| if n { "-" } else { "" };
        match self {
            ExtSwizzleOption::Zero { negate } => write!(f, "{}0", sign(*negate)),
            ExtSwizzleOption::One { negate } => write!(f, "{}1", sign(*negate)),
            ExtSwizzleOption::Component { index, negate } => {
                write!(f, "{}{}", sign(*negate), "xyzw".as_bytes()[*index as usize] as char)
            }
        }
    }
}
