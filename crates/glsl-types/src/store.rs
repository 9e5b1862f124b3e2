use glsl_utils::{arena::Arena, FxHashMap};

use crate::{
    ArrayLength, BaseKind, Direction, FunctionParam, FunctionSignature, PrimitiveDesc, Precision,
    SamplerKind, Shape, StructField, StructLayout, TypeId, TypeKind,
};

/// Owns every [`TypeKind`] allocated during a compilation. Primitives and
/// samplers are canonicalized through `primitive_cache`/`sampler_cache` so
/// that `basic_type(kind, prec)` called twice with the same arguments
/// returns the same [`TypeId`] (`spec.md` §8.1 invariant); `void` is
/// allocated once eagerly. Struct, array and function types are always
/// allocated fresh, mirroring the per-declaration allocation the original
/// performs out of the module arena.
#[derive(Debug)]
pub struct TypeStore {
    arena: Arena<TypeId, TypeKind>,
    primitive_cache: FxHashMap<PrimitiveDesc, TypeId>,
    sampler_cache: FxHashMap<(SamplerKind, Precision), TypeId>,
    void_ty: TypeId,
}

impl TypeStore {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let void_ty = arena.alloc(TypeKind::Void);
        Self {
            arena,
            primitive_cache: FxHashMap::default(),
            sampler_cache: FxHashMap::default(),
            void_ty,
        }
    }

    pub fn void(&self) -> TypeId {
        self.void_ty
    }

    pub fn get(&self, id: TypeId) -> &TypeKind {
        self.arena.get(id)
    }

    /// `GlesBasicType`/`GlesVectorType`/`GlesMatrixType`: canonical
    /// primitive lookup.
    pub fn primitive(&mut self, base: BaseKind, shape: Shape, precision: Precision) -> TypeId {
        let desc = PrimitiveDesc { base, shape, precision };
        if let Some(id) = self.primitive_cache.get(&desc) {
            return *id;
        }
        let id = self.arena.alloc(TypeKind::Primitive(desc));
        self.primitive_cache.insert(desc, id);
        id
    }

    pub fn scalar(&mut self, base: BaseKind, precision: Precision) -> TypeId {
        self.primitive(base, Shape::Scalar, precision)
    }

    pub fn vector(&mut self, base: BaseKind, precision: Precision, n: u8) -> TypeId {
        debug_assert!((2..=4).contains(&n));
        self.primitive(base, Shape::Vector(n), precision)
    }

    pub fn matrix(&mut self, precision: Precision, n: u8) -> TypeId {
        debug_assert!((2..=4).contains(&n));
        self.primitive(BaseKind::Float, Shape::Matrix(n), precision)
    }

    pub fn sampler(&mut self, kind: SamplerKind, precision: Precision) -> TypeId {
        if let Some(id) = self.sampler_cache.get(&(kind, precision)) {
            return *id;
        }
        let id = self.arena.alloc(TypeKind::Sampler { kind, precision });
        self.sampler_cache.insert((kind, precision), id);
        id
    }

    /// `GlesElementType`: the row/column scalar of a vector or matrix.
    pub fn element_type(&mut self, ty: TypeId) -> TypeId {
        match self.get(ty).clone() {
            TypeKind::Primitive(PrimitiveDesc { base, shape: Shape::Vector(_), precision }) => {
                self.scalar(base, precision)
            }
            TypeKind::Primitive(PrimitiveDesc { shape: Shape::Matrix(n), precision, .. }) => {
                self.vector(BaseKind::Float, precision, n)
            }
            _ => ty,
        }
    }

    /// `type_array`: always allocated fresh.
    pub fn array(&mut self, element: TypeId, length: ArrayLength) -> TypeId {
        self.arena.alloc(TypeKind::Array { element, length })
    }

    pub fn struct_type(&mut self, name: Option<String>, fields: Vec<StructField>) -> TypeId {
        let size = fields.last().map_or(0, |f| f.offset + self.size_of(f.ty));
        self.arena.alloc(TypeKind::Struct(StructLayout { name, fields, size }))
    }

    pub fn function(
        &mut self,
        return_type: TypeId,
        params: impl IntoIterator<Item = (TypeId, Direction)>,
    ) -> TypeId {
        let params =
            params.into_iter().map(|(ty, direction)| FunctionParam { ty, direction }).collect();
        self.arena.alloc(TypeKind::Function(FunctionSignature { return_type, params }))
    }

    /// Number of 4-component slots occupied by a value of this type
    /// (`spec.md` §3.1 invariants).
    pub fn size_of(&self, ty: TypeId) -> u32 {
        match self.get(ty) {
            TypeKind::Void => 0,
            TypeKind::Primitive(desc) => desc.shape.size(),
            TypeKind::Sampler { .. } => 1,
            TypeKind::Array { element, length } => match length {
                ArrayLength::Sized(n) => n * self.size_of(*element),
                ArrayLength::Unsized => 0,
            },
            TypeKind::Struct(layout) => layout.size,
            TypeKind::Function(_) => 0,
        }
    }

    /// Structural equality (`GlesTypeMatch`): arrays compare element type
    /// (and length, once known), structs compare full layout, functions
    /// compare return type and every parameter's type and direction.
    pub fn matches(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (TypeKind::Void, TypeKind::Void) => true,
            (TypeKind::Primitive(x), TypeKind::Primitive(y)) => x.base == y.base && x.shape == y.shape,
            (TypeKind::Sampler { kind: k1, .. }, TypeKind::Sampler { kind: k2, .. }) => k1 == k2,
            (
                TypeKind::Array { element: e1, length: l1 },
                TypeKind::Array { element: e2, length: l2 },
            ) => self.matches(*e1, *e2) && l1 == l2,
            (TypeKind::Struct(x), TypeKind::Struct(y)) => {
                x.fields.len() == y.fields.len()
                    && x.fields.iter().zip(&y.fields).all(|(fx, fy)| self.matches(fx.ty, fy.ty))
            }
            (TypeKind::Function(x), TypeKind::Function(y)) => {
                self.matches(x.return_type, y.return_type)
                    && x.params.len() == y.params.len()
                    && x.params.iter().zip(&y.params).all(|(px, py)| {
                        self.matches(px.ty, py.ty) && px.direction == py.direction
                    })
            }
            _ => false,
        }
    }

    /// Ignores array size and parameter direction; used for overload
    /// disambiguation (`spec.md` §4.3).
    pub fn is_overload(&self, a: TypeId, b: TypeId) -> bool {
        match (self.get(a), self.get(b)) {
            (
                TypeKind::Array { element: e1, .. },
                TypeKind::Array { element: e2, .. },
            ) => self.is_overload(*e1, *e2),
            _ => self.return_type_matches_ignoring_quals(a, b),
        }
    }

    fn return_type_matches_ignoring_quals(&self, a: TypeId, b: TypeId) -> bool {
        match (self.get(a), self.get(b)) {
            (TypeKind::Primitive(x), TypeKind::Primitive(y)) => x.base == y.base && x.shape == y.shape,
            (TypeKind::Sampler { kind: k1, .. }, TypeKind::Sampler { kind: k2, .. }) => k1 == k2,
            (TypeKind::Struct(x), TypeKind::Struct(y)) => {
                x.fields.len() == y.fields.len()
                    && x.fields
                        .iter()
                        .zip(&y.fields)
                        .all(|(fx, fy)| self.return_type_matches_ignoring_quals(fx.ty, fy.ty))
            }
            (TypeKind::Void, TypeKind::Void) => true,
            _ => false,
        }
    }

    pub fn param_qualifiers_match(&self, a: &FunctionSignature, b: &FunctionSignature) -> bool {
        a.params.len() == b.params.len()
            && a.params.iter().zip(&b.params).all(|(x, y)| x.direction == y.direction)
    }

    pub fn param_sizes_match(&self, a: &FunctionSignature, b: &FunctionSignature) -> bool {
        a.params.len() == b.params.len()
            && a.params.iter().zip(&b.params).all(|(x, y)| self.matches(x.ty, y.ty))
    }

    pub fn return_type_matches(&self, a: &FunctionSignature, b: &FunctionSignature) -> bool {
        self.matches(a.return_type, b.return_type)
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}
