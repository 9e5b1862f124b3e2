//! Instructions (`spec.md` §4.10.1).

use crate::opcode::{Cond, ExtSwizzleOption, Opcode, TextureTarget};
use crate::progvar::{AddrId, BlockId, ProgVarId};

/// `xyzw` component mask/selector, stored as a 4-bit set plus an explicit
/// permutation for swizzled sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mask(pub u8);

impl Mask {
    pub const XYZW: Mask = Mask(0b1111);

    pub fn from_components(components: &[u8]) -> Mask {
        Mask(components.iter().fold(0u8, |m, &c| m | (1 << c)))
    }

    pub fn contains(self, component: u8) -> bool {
        self.0 & (1 << component) != 0
    }

    pub fn to_string(self) -> String {
        "xyzw".chars().enumerate().filter(|(i, _)| self.contains(*i as u8)).map(|(_, c)| c).collect()
    }
}

/// Source component selection, one index (0..=3) per output lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle(pub [u8; 4]);

impl Swizzle {
    pub const IDENTITY: Swizzle = Swizzle([0, 1, 2, 3]);
}

/// A register reference: base variable, optional addressed offset,
/// component swizzle, and negate flag (`spec.md` §4.7.3 `SrcReg`/`DstReg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg {
    pub var: ProgVarId,
    pub offset: u32,
    pub addr: Option<AddrId>,
    pub swizzle: Swizzle,
    pub mask: Mask,
    pub negate: bool,
}

impl Reg {
    pub fn simple(var: ProgVarId) -> Self {
        Self { var, offset: 0, addr: None, swizzle: Swizzle::IDENTITY, mask: Mask::XYZW, negate: false }
    }
}

/// A branch/conditional's guard: condition plus up to four lane selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guard {
    pub cond: Cond,
    pub selectors: [u8; 4],
}

impl Default for Guard {
    fn default() -> Self {
        Guard { cond: Cond::T, selectors: [0, 1, 2, 3] }
    }
}

/// Tagged union over instruction shapes (`spec.md` §4.10.1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstrKind {
    Base,
    Unary { dst: Reg, src: Reg },
    Binary { dst: Reg, l: Reg, r: Reg },
    Ternary { dst: Reg, a: Reg, b: Reg, c: Reg },
    Src { src: Reg },
    Swz { dst: Reg, src: ProgVarId, options: [ExtSwizzleOption; 4] },
    Tex { dst: Reg, coords: Reg, sampler: ProgVarId, offset: Option<Reg>, target: TextureTarget },
    Arl { dst: AddrId, src: Reg },
    Branch { target: BlockId, guard: Guard },
    Cond { guard: Guard },
    Phi,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    pub kind: InstrKind,
}

impl Instruction {
    pub fn new(opcode: Opcode, kind: InstrKind) -> Self {
        Self { opcode, kind }
    }
}
