//! Basic blocks and labels (`spec.md` §4.10.2).

use crate::instr::Instruction;
use crate::progvar::BlockId;

/// A maximal straight-line instruction sequence ended by a control-flow
/// opcode (`spec.md` §4.10.2, Glossary).
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub instructions: Vec<Instruction>,
}

/// A forward-declarable branch target. `target` is `None` until the
/// labeled block is created, matching the original's null-target
/// `Label` object (`spec.md` §4.10.2).
#[derive(Debug, Clone, Default)]
pub struct Label {
    pub target: Option<BlockId>,
}
