//! Program-variable tables (`spec.md` §4.10.3).

use glsl_const::Constant;
use glsl_types::{Precision, TypeId};
use glsl_utils::counter;

counter! {
    /// Identifies a `Const`/`Temp`/`In`/`Out`/`Param` variable, written as
    /// `$<id>` in IL text.
    pub struct ProgVarId;
}

counter! {
    /// Identifies an `ADDRESS` register, written as `a<id>`.
    pub struct AddrId;
}

counter! {
    /// Identifies a basic block / label target, written as `b<id>`.
    pub struct BlockId;
}

/// External binding slot attached to `In`/`Out`/`Param` variables
/// (`spec.md` §4.10.4).
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Attrib { location: u32 },
    Varying { location: u32 },
    Param { location: u32 },
    None,
}

/// Which of the five segments (`spec.md` §4.10.3) a [`ProgVar`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Const,
    Temp,
    In,
    Out,
    Param,
}

#[derive(Debug, Clone)]
pub struct ProgVar {
    pub id: ProgVarId,
    pub segment: Segment,
    pub ty: TypeId,
    pub precision: Precision,
    /// Number of 4-component slots (`spec.md` §3.1 `size`).
    pub size: u32,
    /// External name for `In`/`Out`/`Param` (`spec.md` §4.10.3); absent for
    /// internal temporaries and deduplicated constants.
    pub external_name: Option<String>,
    pub binding: Binding,
    /// `Const` value, set only for `Segment::Const` variables.
    pub constant: Option<Vec<Constant>>,
    /// Marked during the writer's liveness pass (`spec.md` §4.10.4); only
    /// `used` variables appear in the emitted header.
    pub used: bool,
}

impl ProgVar {
    pub fn new(id: ProgVarId, segment: Segment, ty: TypeId, precision: Precision, size: u32) -> Self {
        Self {
            id,
            segment,
            ty,
            precision,
            size,
            external_name: None,
            binding: Binding::None,
            constant: None,
            used: false,
        }
    }
}

/// Owns every [`ProgVar`]/address register allocated for one shader
/// program (`spec.md` §4.10.3). Lists are prepend order to match the
/// original's linked-list chaining; `const_hash` deduplicates constants.
#[derive(Debug, Default)]
pub struct ProgVarTable {
    vars: Vec<ProgVar>,
    addr_count: u32,
    const_hash: glsl_utils::FxHashMap<u32, Vec<ProgVarId>>,
}

impl ProgVarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ProgVarId) -> &ProgVar {
        &self.vars[id.raw() as usize]
    }

    pub fn get_mut(&mut self, id: ProgVarId) -> &mut ProgVar {
        &mut self.vars[id.raw() as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProgVar> {
        self.vars.iter()
    }

    fn alloc(&mut self, segment: Segment, ty: TypeId, precision: Precision, size: u32) -> ProgVarId {
        let id = ProgVarId::from_raw(self.vars.len() as u32);
        self.vars.push(ProgVar::new(id, segment, ty, precision, size));
        id
    }

    pub fn create_temp(&mut self, ty: TypeId, precision: Precision, size: u32) -> ProgVarId {
        self.alloc(Segment::Temp, ty, precision, size)
    }

    pub fn create_in(
        &mut self,
        ty: TypeId,
        precision: Precision,
        size: u32,
        name: impl Into<String>,
        binding: Binding,
    ) -> ProgVarId {
        let id = self.alloc(Segment::In, ty, precision, size);
        let var = self.get_mut(id);
        var.external_name = Some(name.into());
        var.binding = binding;
        id
    }

    pub fn create_out(
        &mut self,
        ty: TypeId,
        precision: Precision,
        size: u32,
        name: impl Into<String>,
        binding: Binding,
    ) -> ProgVarId {
        let id = self.alloc(Segment::Out, ty, precision, size);
        let var = self.get_mut(id);
        var.external_name = Some(name.into());
        var.binding = binding;
        id
    }

    pub fn create_param(
        &mut self,
        ty: TypeId,
        precision: Precision,
        size: u32,
        name: impl Into<String>,
        binding: Binding,
    ) -> ProgVarId {
        let id = self.alloc(Segment::Param, ty, precision, size);
        let var = self.get_mut(id);
        var.external_name = Some(name.into());
        var.binding = binding;
        id
    }

    /// `create_prog_var_const`: hashes `(constant, type)`, dedups by
    /// `equals`, otherwise allocates and chains.
    pub fn create_const(
        &mut self,
        value: Vec<Constant>,
        ty: TypeId,
        hash: u32,
        equals: impl Fn(&[Constant], &[Constant]) -> bool,
    ) -> ProgVarId {
        if let Some(bucket) = self.const_hash.get(&hash) {
            for &id in bucket {
                if let Some(existing) = &self.get(id).constant {
                    if self.get(id).ty == ty && equals(existing, &value) {
                        return id;
                    }
                }
            }
        }
        let size = value.len() as u32;
        let id = self.alloc(Segment::Const, ty, Precision::Undefined, size);
        self.get_mut(id).constant = Some(value);
        self.const_hash.entry(hash).or_default().push(id);
        id
    }

    pub fn create_addr(&mut self) -> AddrId {
        let id = AddrId::from_raw(self.addr_count);
        self.addr_count += 1;
        id
    }

    pub fn addr_count(&self) -> u32 {
        self.addr_count
    }
}
