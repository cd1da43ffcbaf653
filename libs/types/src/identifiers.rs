//! Typed identifiers
//!
//! Zero-cost wrappers around `u64` so that pool ids cannot be confused with
//! arena indices, amounts or other integers at call sites.

/// Macro for generating zero-cost typed ID wrappers
///
/// Creates a new type that wraps `u64` with type safety while keeping the
/// same runtime representation.
#[macro_export]
macro_rules! define_typed_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize
        )]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create a new typed ID
            #[inline(always)]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Extract the inner value
            #[inline(always)]
            pub const fn inner(&self) -> u64 {
                self.0
            }

            /// Position of this id in a creation-ordered arena
            #[inline(always)]
            pub const fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<u64> for $name {
            #[inline(always)]
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            #[inline(always)]
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

define_typed_id!(
    /// Stable identifier of a pool, assigned in creation order by the registry
    PoolId
);
