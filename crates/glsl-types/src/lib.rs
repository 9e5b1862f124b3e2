//! Type system (`spec.md` §3.1, §4.3; `TypeValue`/`Type` in
//! `original_source/src/gl/frontend/types.h`).
//!
//! Primitive types are canonical: two requests for the same
//! `(base, shape, precision)` triple hand back the same [`TypeId`]. Array,
//! struct and function types are allocated fresh per declaration in the
//! module-lifetime [`TypeStore`] arena, matching the original's
//! per-compilation `MemoryPool`.

mod store;

use std::fmt;

use glsl_utils::counter;
use smallvec::SmallVec;

counter! {
    /// Index into a [`TypeStore`]'s arena. Canonical for primitives and
    /// samplers; fresh per declaration for array/struct/function types.
    pub struct TypeId;
}

pub use store::TypeStore;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    #[default]
    Undefined,
    Low,
    Medium,
    High,
}

impl Precision {
    /// Precision promotion is monotone (`spec.md` §8.2): the result of a
    /// binary arithmetic op takes the max of its operands' precision.
    pub fn max(self, other: Precision) -> Precision {
        use Precision::*;
        match (self, other) {
            (High, _) | (_, High) => High,
            (Medium, _) | (_, Medium) => Medium,
            (Low, _) | (_, Low) => Low,
            (Undefined, Undefined) => Undefined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Bool,
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    Sampler2D,
    Sampler3D,
    SamplerCube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Vector(u8),
    Matrix(u8),
}

impl Shape {
    pub fn elements(self) -> u8 {
        match self {
            Shape::Scalar => 1,
            Shape::Vector(n) => n,
            Shape::Matrix(n) => n,
        }
    }

    /// Number of 4-component slots occupied (`spec.md` §3.1 invariant:
    /// `size == elements` for `matN`, `size == 1` otherwise).
    pub fn size(self) -> u32 {
        match self {
            Shape::Matrix(n) => n as u32,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveDesc {
    pub base: BaseKind,
    pub shape: Shape,
    pub precision: Precision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayLength {
    Sized(u32),
    /// Only valid for the array-type function-argument case (`spec.md`
    /// §3.1); declarations require a positive length (`S0017`).
    Unsized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub name: String,
    pub ty: TypeId,
    /// Offset of the field within the struct, in 4-component slots.
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct StructLayout {
    pub name: Option<String>,
    pub fields: Vec<StructField>,
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct FunctionParam {
    pub ty: TypeId,
    pub direction: Direction,
}

#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub return_type: TypeId,
    pub params: SmallVec<[FunctionParam; 4]>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Void,
    Primitive(PrimitiveDesc),
    Sampler { kind: SamplerKind, precision: Precision },
    Array { element: TypeId, length: ArrayLength },
    Struct(StructLayout),
    Function(FunctionSignature),
}

impl TypeKind {
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeKind::Primitive(_) | TypeKind::Sampler { .. })
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, TypeKind::Sampler { .. })
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, TypeKind::Primitive(PrimitiveDesc { shape: Shape::Scalar, .. }))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, TypeKind::Primitive(PrimitiveDesc { shape: Shape::Vector(_), .. }))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, TypeKind::Primitive(PrimitiveDesc { shape: Shape::Matrix(_), .. }))
    }

    pub fn base(&self) -> Option<BaseKind> {
        match self {
            TypeKind::Primitive(desc) => Some(desc.base),
            _ => None,
        }
    }

    pub fn precision(&self) -> Precision {
        match self {
            TypeKind::Primitive(desc) => desc.precision,
            TypeKind::Sampler { precision, .. } => *precision,
            _ => Precision::Undefined,
        }
    }

    /// Component count (`spec.md` §3.1 `elements`). 1 for scalars, samplers,
    /// structs, arrays, void and functions; N for vecN/matN.
    pub fn elements(&self) -> u8 {
        match self {
            TypeKind::Primitive(desc) => desc.shape.elements(),
            _ => 1,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => Ok(()),
            Shape::Vector(n) => write!(f, "vec{n}"),
            Shape::Matrix(n) => write!(f, "mat{n}"),
        }
    }
}
