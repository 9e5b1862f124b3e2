//! The assembled `ShaderProgram` and its builder (`spec.md` §4.9, §4.10.2).

use index_vec::IndexVec;

use crate::block::{Block, Label};
use crate::instr::{Guard, Instruction};
use crate::opcode::Opcode;
use crate::progvar::{BlockId, ProgVarTable};

/// The full in-memory IL for one shader, produced either by lowering
/// (`spec.md` §4.9 step 6) or by the text reader (`spec.md` §4.10.5).
#[derive(Debug, Default)]
pub struct ShaderProgram {
    pub vars: ProgVarTable,
    pub(crate) blocks: IndexVec<BlockId, Block>,
    labels: Vec<Label>,
}

impl ShaderProgram {
    pub fn new() -> Self {
        let mut program = Self { vars: ProgVarTable::new(), blocks: IndexVec::new(), labels: Vec::new() };
        program.blocks.push(Block::default());
        program
    }

    /// A program with no blocks yet, used by the text reader (`spec.md`
    /// §4.10.5) which creates one block per `b<id>:` line it encounters
    /// rather than starting from an implicit entry block.
    pub fn empty() -> Self {
        Self { vars: ProgVarTable::new(), blocks: IndexVec::new(), labels: Vec::new() }
    }

    pub fn blocks(&self) -> &IndexVec<BlockId, Block> {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id]
    }

    pub fn entry_block(&self) -> BlockId {
        BlockId::from_raw(0)
    }

    /// Creates a fresh, empty `Label` with no target (`spec.md` §4.10.2),
    /// to be resolved by a later `bind_label`.
    pub fn new_label(&mut self) -> usize {
        self.labels.push(Label::default());
        self.labels.len() - 1
    }

    pub fn label_target(&self, label: usize) -> Option<BlockId> {
        self.labels[label].target
    }

    /// Creates a new block and binds `label` to it, resolving any earlier
    /// forward reference.
    pub fn bind_label(&mut self, label: usize) -> BlockId {
        let id = self.blocks.push(Block::default());
        self.labels[label].target = Some(id);
        id
    }
}

/// Sequential instruction emitter that tracks the current block and
/// splits it whenever a control-flow opcode is appended (`spec.md`
/// §4.10.2).
pub struct ProgramBuilder<'p> {
    program: &'p mut ShaderProgram,
    current: BlockId,
}

impl<'p> ProgramBuilder<'p> {
    pub fn new(program: &'p mut ShaderProgram) -> Self {
        let current = program.entry_block();
        Self { program, current }
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn program(&self) -> &ShaderProgram {
        self.program
    }

    pub fn program_mut(&mut self) -> &mut ShaderProgram {
        self.program
    }

    /// Appends `instr` to the current block; if its opcode ends a block, a
    /// fresh block is opened and becomes current.
    pub fn emit(&mut self, instr: Instruction) {
        let ends_block = instr.opcode.ends_block();
        self.program.block_mut(self.current).instructions.push(instr);
        if ends_block {
            self.current = self.program.blocks.push(Block::default());
        }
    }

    /// Explicitly starts a new block without emitting a terminator,
    /// used when splicing a called function's body in (`spec.md` §4.9
    /// step 5).
    pub fn start_block(&mut self) -> BlockId {
        self.current = self.program.blocks.push(Block::default());
        self.current
    }

    pub fn jump_to(&mut self, target: BlockId, guard: Guard) {
        use crate::instr::InstrKind;
        self.emit(Instruction::new(Opcode::Bra, InstrKind::Branch { target, guard }));
    }
}
