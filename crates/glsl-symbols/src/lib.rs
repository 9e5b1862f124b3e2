//! Symbol and scope tables (`spec.md` §3.2, §4.4; `Scope`/`Symbol` in
//! `original_source/src/gl/frontend/symbols.h`).
//!
//! A [`Scope`] is a fixed-bucket hash table chained on collision, with a
//! parent pointer for nested lookup and five default-precision slots
//! (`int`, `float`, `sampler2D`, `sampler3D`, `samplerCube`). Symbols and
//! scopes are both arena-allocated and live for the whole compilation,
//! mirroring the original's module-lifetime `MemoryPool`.

use glsl_const::Constant;
use glsl_types::{Precision, SamplerKind, TypeId};
use glsl_utils::{arena::Arena, counter};
use smallvec::SmallVec;

/// Bucket count for a [`Scope`]'s hash table (`symbol_hash` range).
pub const BUCKET_COUNT: usize = 17;

counter! {
    pub struct ScopeId;
}

counter! {
    pub struct SymbolId;
}

/// `symbol_hash(name) = ((len + mix of bytes 0,2,7,last)) mod BUCKET_COUNT`.
pub fn symbol_hash(name: &str) -> usize {
    let bytes = name.as_bytes();
    let len = bytes.len();
    let byte_at = |i: usize| -> u32 { bytes.get(i).copied().unwrap_or(0) as u32 };
    let last = if len == 0 { 0 } else { byte_at(len - 1) };
    let mix = byte_at(0).wrapping_mul(3) ^ byte_at(2).wrapping_mul(5) ^ byte_at(7).wrapping_mul(7) ^ last;
    (len as u32).wrapping_add(mix) as usize % BUCKET_COUNT
}

/// The five default-precision slots carried by every scope (`spec.md`
/// §3.2); inherited from the parent on `create_scope`, undefined at the
/// root unless set by a `precision` declaration there.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPrecisions {
    pub int: Precision,
    pub float: Precision,
    pub sampler_2d: Precision,
    pub sampler_3d: Precision,
    pub sampler_cube: Precision,
}

impl DefaultPrecisions {
    pub fn sampler(&self, kind: SamplerKind) -> Precision {
        match kind {
            SamplerKind::Sampler2D => self.sampler_2d,
            SamplerKind::Sampler3D => self.sampler_3d,
            SamplerKind::SamplerCube => self.sampler_cube,
        }
    }

    pub fn sampler_mut(&mut self, kind: SamplerKind) -> &mut Precision {
        match kind {
            SamplerKind::Sampler2D => &mut self.sampler_2d,
            SamplerKind::Sampler3D => &mut self.sampler_3d,
            SamplerKind::SamplerCube => &mut self.sampler_cube,
        }
    }
}

/// Built-in vertex/fragment output slot a symbol may be bound to
/// (`spec.md` §3.2, §6.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinSlot {
    Position,
    PointSize,
    FragCoord,
    FrontFacing,
    FragColor,
    FragData,
    PointCoord,
}

/// A function's overload chain link plus lowering state (`spec.md` §3.2).
#[derive(Debug, Clone, Default)]
pub struct FunctionInfo {
    /// Next overload of the same name in the same scope, if any.
    pub next_overload: Option<SymbolId>,
    pub param_scope: Option<ScopeId>,
    /// Parameter symbols in declaration order, created in `param_scope`.
    pub params: SmallVec<[SymbolId; 4]>,
    pub body: SmallVec<[u32; 8]>,
    /// `TEMP` register holding the function's return value, assigned on
    /// first `return`.
    pub result_temp: Option<u32>,
    /// IL label marking the function's entry block.
    pub entry_label: Option<u32>,
    pub defined: bool,
}

#[derive(Debug, Clone)]
pub enum Qualifier {
    Variable,
    Function(FunctionInfo),
    Parameter { index: u32, direction: glsl_types::Direction, is_const: bool },
    Constant { initializer: Vec<Constant> },
    TypeName,
    Field { ordinal: u32, offset: u32 },
    Attribute,
    Uniform,
    Varying { invariant: bool },
    Builtin(BuiltinSlot),
}

/// A declared name (`spec.md` §3.2). `prog_var` is a back-pointer to the
/// IL register this symbol lowers to, created lazily on first use by the
/// lowering stage (kept as an opaque `u32` here so this crate does not
/// depend on `glsl-ir`).
#[derive(Debug, Clone)]
pub struct Symbol {
    pub scope: ScopeId,
    pub name: String,
    pub ty: TypeId,
    pub qualifier: Qualifier,
    pub prog_var: Option<u32>,
}

/// `SymbolArray`: a growable stack of symbol handles used while walking
/// the call graph (`spec.md` §4.4).
pub type SymbolArray = Vec<SymbolId>;

#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub precisions: DefaultPrecisions,
    buckets: [Vec<SymbolId>; BUCKET_COUNT],
}

impl Scope {
    fn new(parent: Option<ScopeId>, precisions: DefaultPrecisions) -> Self {
        Self { parent, precisions, buckets: std::array::from_fn(|_| Vec::new()) }
    }
}

/// Owns every [`Scope`] and [`Symbol`] allocated during a compilation.
#[derive(Debug, Default)]
pub struct SymbolStore {
    scopes: Arena<ScopeId, Scope>,
    symbols: Arena<SymbolId, Symbol>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self { scopes: Arena::new(), symbols: Arena::new() }
    }

    /// `create_scope`: inherits the parent's default-precision slots
    /// (undefined at the root).
    pub fn create_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let precisions =
            parent.map(|p| self.scopes.get(p).precisions).unwrap_or_default();
        self.scopes.alloc(Scope::new(parent, precisions))
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        self.scopes.get(id)
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.scopes.get_mut(id)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.symbols.get(id)
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        self.symbols.get_mut(id)
    }

    /// `create_symbol`: prepends to the appropriate bucket so later
    /// lookups in the same scope favor the most recently declared symbol
    /// of a given name, matching the original's shadowing-within-overload
    /// behaviour for functions.
    pub fn create_symbol(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        ty: TypeId,
        qualifier: Qualifier,
    ) -> SymbolId {
        let name = name.into();
        let bucket = symbol_hash(&name);
        let id = self.symbols.alloc(Symbol { scope, name, ty, qualifier, prog_var: None });
        self.scopes.get_mut(scope).buckets[bucket].insert(0, id);
        id
    }

    /// `find`: scans the one bucket in `scope` that `name` hashes to.
    pub fn find(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let bucket = symbol_hash(name);
        self.scopes.get(scope).buckets[bucket]
            .iter()
            .copied()
            .find(|&id| self.symbols.get(id).name == name)
    }

    /// `find_nested`: walks from `scope` to the root, returning the first
    /// match.
    pub fn find_nested(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(s) = current {
            if let Some(id) = self.find(s, name) {
                return Some(id);
            }
            current = self.scopes.get(s).parent;
        }
        None
    }

    /// All symbols in `scope`'s bucket for `name`, most-recent first; used
    /// to walk a function's overload chain by name.
    pub fn find_all(&self, scope: ScopeId, name: &str) -> Vec<SymbolId> {
        let bucket = symbol_hash(name);
        self.scopes.get(scope).buckets[bucket]
            .iter()
            .copied()
            .filter(|&id| self.symbols.get(id).name == name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glsl_types::TypeStore;

    #[test]
    fn nested_lookup_walks_to_root() {
        let mut store = SymbolStore::new();
        let mut types = TypeStore::new();
        let root = store.create_scope(None);
        let inner = store.create_scope(Some(root));
        let float_ty = types.scalar(glsl_types::BaseKind::Float, Precision::High);
        store.create_symbol(root, "x", float_ty, Qualifier::Variable);
        assert!(store.find(inner, "x").is_none());
        assert!(store.find_nested(inner, "x").is_some());
    }

    #[test]
    fn child_scope_inherits_precisions() {
        let mut store = SymbolStore::new();
        let root = store.create_scope(None);
        store.scope_mut(root).precisions.float = Precision::High;
        let child = store.create_scope(Some(root));
        assert_eq!(store.scope(child).precisions.float, Precision::High);
    }

    #[test]
    fn redeclaration_shadows_in_same_bucket() {
        let mut store = SymbolStore::new();
        let mut types = TypeStore::new();
        let root = store.create_scope(None);
        let float_ty = types.scalar(glsl_types::BaseKind::Float, Precision::High);
        let int_ty = types.scalar(glsl_types::BaseKind::Int, Precision::High);
        store.create_symbol(root, "f", float_ty, Qualifier::Variable);
        let latest = store.create_symbol(root, "f", int_ty, Qualifier::Variable);
        assert_eq!(store.find(root, "f"), Some(latest));
    }
}
