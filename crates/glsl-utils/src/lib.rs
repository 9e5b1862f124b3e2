//! Shared utilities used across the shader compiler crates: an arena-style
//! index slab, an append-only diagnostic/IL log buffer, source spans, and a
//! counter macro for generating opaque id newtypes.

pub mod arena;
pub mod counter;
pub mod log_buf;
pub mod span;

pub use index_vec;
pub use rustc_hash::{FxHashMap, FxHashSet};
