//! Expression/statement lowering (`spec.md` §4.7–§4.9): walks the AST
//! `glsl-parser` builds, resolves names against `glsl-symbols`/`glsl-types`,
//! folds constants via `glsl-const`, and emits `glsl-ir` instructions.
//!
//! The lowering methods never hold a [`glsl_ir::ProgramBuilder`] as a
//! field of [`Lowerer`] — it borrows the [`glsl_ir::ShaderProgram`] that
//! the driver (`decl.rs`) owns locally, so it is threaded through every
//! call as an explicit `&mut ProgramBuilder` parameter instead, the same
//! way `glsl-parser::Parser` threads `&mut self` through `ty`/`expr`/
//! `stmt`/`decl`.

pub mod decl;
pub mod expr;
pub mod stmt;

use glsl_const::Constant;
use glsl_ir::{AddrId, BlockId, Mask, ProgVarId, Swizzle};
use glsl_reporting::{DiagnosticCode, Report, ShaderLog};
use glsl_symbols::{ScopeId, SymbolId, SymbolStore};
use glsl_types::{Precision, TypeId, TypeStore};
use glsl_utils::FxHashMap;

/// Result type for lowering, mirroring `glsl_parser::PResult`: the
/// diagnostic itself is already on the log by the time `Err` is returned,
/// so callers only need to know whether to keep going.
pub type LResult<T> = Result<T, ()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

/// A fully-evaluated expression result: either folded to a compile-time
/// constant, or materialized into a register (`spec.md` §4.7.2's
/// `Expression` carries exactly one of these, the "constant or register"
/// split called out in §3.3).
#[derive(Debug, Clone)]
pub enum Value {
    Const(Vec<Constant>, TypeId),
    Reg(RegValue),
}

/// A value already sitting in a register, with whatever swizzle/negate a
/// preceding field-access or unary-minus attached.
#[derive(Debug, Clone, Copy)]
pub struct RegValue {
    pub var: ProgVarId,
    pub offset: u32,
    pub swizzle: [u8; 4],
    pub negate: bool,
    pub ty: TypeId,
}

impl RegValue {
    pub fn whole(var: ProgVarId, ty: TypeId) -> Self {
        Self { var, offset: 0, swizzle: [0, 1, 2, 3], negate: false, ty }
    }

    fn as_reg(&self) -> glsl_ir::Reg {
        glsl_ir::Reg {
            var: self.var,
            offset: self.offset,
            addr: None,
            swizzle: Swizzle(self.swizzle),
            mask: Mask::XYZW,
            negate: self.negate,
        }
    }
}

/// An assignable location. Swizzle assignment targets a subset of
/// components of one slot; everything else assigns the whole register
/// (possibly spanning several slots, for arrays/structs/matrices).
#[derive(Debug, Clone, Copy)]
pub enum PlaceKind {
    Whole,
    Swizzle { components: [u8; 4], count: u8 },
}

#[derive(Debug, Clone, Copy)]
pub struct Place {
    pub var: ProgVarId,
    pub offset: u32,
    pub addr: Option<AddrId>,
    pub kind: PlaceKind,
    pub ty: TypeId,
}

/// Per-`for`-loop lowering state (`spec.md` §4.8): the boolean temporary
/// that `continue` sets, consulted to guard the remainder of the body.
struct LoopCtx {
    continue_flag: ProgVarId,
}

/// Owns everything lowering needs except the program being built, which
/// the driver keeps local and threads through as `&mut ProgramBuilder`
/// (see the module doc comment for why).
pub struct Lowerer<'a> {
    pub types: TypeStore,
    pub symbols: SymbolStore,
    pub log: &'a mut ShaderLog,
    pub kind: ShaderKind,
    pub global_scope: ScopeId,
    scope: ScopeId,
    line: u32,
    loops: Vec<LoopCtx>,
    /// The function whose body is currently being lowered, consulted by
    /// `return` to find its result temp (`decl.rs` sets this for the
    /// duration of each function's codegen pass).
    pub(crate) current_function: Option<SymbolId>,
    /// Call sites whose `CAL` target wasn't known yet when emitted
    /// (the callee may be defined later in the unit, or may be the
    /// current function itself); patched once every reachable function
    /// has a compiled entry block (`decl.rs`'s `compile_call_graph`).
    pub(crate) call_patches: Vec<(BlockId, usize, SymbolId)>,
    /// Entry block of each function that has been compiled so far,
    /// keyed by its symbol.
    pub(crate) compiled_functions: FxHashMap<SymbolId, BlockId>,
    pub(crate) wrote_gl_position: bool,
}

impl<'a> Lowerer<'a> {
    pub fn new(kind: ShaderKind, log: &'a mut ShaderLog) -> Self {
        let types = TypeStore::new();
        let mut symbols = SymbolStore::new();
        let global_scope = symbols.create_scope(None);
        Self {
            types,
            symbols,
            log,
            kind,
            global_scope,
            scope: global_scope,
            line: 0,
            loops: Vec::new(),
            current_function: None,
            call_patches: Vec::new(),
            compiled_functions: FxHashMap::default(),
            wrote_gl_position: false,
        }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    fn push_scope(&mut self) -> ScopeId {
        let parent = self.scope;
        self.scope = self.symbols.create_scope(Some(parent));
        self.scope
    }

    fn pop_scope(&mut self, saved: ScopeId) {
        self.scope = saved;
    }

    /// Switches to an already-existing scope (a function's parameter
    /// scope, typically), returning whatever was current so the caller
    /// can restore it. Unlike `push_scope`, this never allocates.
    pub(crate) fn enter_scope(&mut self, scope: ScopeId) -> ScopeId {
        std::mem::replace(&mut self.scope, scope)
    }

    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    /// Reports `code` at the current line and returns `Err`; every
    /// lowering function that fails goes through this so the log always
    /// reflects the "abort at first diagnostic" contract (`spec.md` §5).
    pub(crate) fn error<T>(&mut self, code: DiagnosticCode) -> LResult<T> {
        self.log.push(Report::new(code, self.line));
        Err(())
    }

    pub(crate) fn error_detail<T>(&mut self, code: DiagnosticCode, detail: impl Into<String>) -> LResult<T> {
        self.log.push(Report::new(code, self.line).with_detail(detail));
        Err(())
    }

    pub(crate) fn warn(&mut self, code: DiagnosticCode) {
        self.log.push(Report::new(code, self.line));
    }

    pub(crate) fn value_ty(&self, v: &Value) -> TypeId {
        match v {
            Value::Const(_, ty) => *ty,
            Value::Reg(r) => r.ty,
        }
    }

    pub(crate) fn elements_of(&self, ty: TypeId) -> u8 {
        self.types.get(ty).elements()
    }

    pub(crate) fn default_precision(&self, ty: TypeId) -> Precision {
        let prec = self.types.get(ty).precision();
        if prec != Precision::Undefined {
            return prec;
        }
        match self.types.get(ty).base() {
            Some(glsl_types::BaseKind::Int) => self.symbols.scope(self.global_scope).precisions.int,
            Some(glsl_types::BaseKind::Float) => self.symbols.scope(self.global_scope).precisions.float,
            _ => Precision::High,
        }
    }
}
