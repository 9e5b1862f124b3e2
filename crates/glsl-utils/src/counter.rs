/// Generates an opaque, `Copy` id newtype with a monotonically increasing
/// constructor, the way `hash-utils`' `counter!` macro produces ids like
/// `ModuleId`/`SourceId`. Used for ids that are handed out across arena
/// boundaries (e.g. block ids, label ids) rather than stored as a plain
/// `index_vec` index.
#[macro_export]
macro_rules! counter {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        $vis struct $name(u32);

        impl $name {
            $vis fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            $vis fn raw(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }

        impl $crate::index_vec::Idx for $name {
            fn from_usize(idx: usize) -> Self {
                Self(idx as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

/// A simple monotonic counter for ids that are not backed by an arena slab
/// (e.g. `ShaderProgram` block/address counters in `spec.md` §3.4).
#[derive(Debug, Default, Clone, Copy)]
pub struct Counter(u32);

impl Counter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next(&mut self) -> u32 {
        let id = self.0;
        self.0 += 1;
        id
    }

    pub fn total(&self) -> u32 {
        self.0
    }
}
