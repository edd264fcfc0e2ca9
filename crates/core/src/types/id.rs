//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally passing a booking ID where a slot ID is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>`, `Into<i64>`, `Display` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use smart_parking_core::define_id;
/// define_id!(GateId);
/// define_id!(LaneId);
///
/// let gate = GateId::new(1);
/// let lane: LaneId = "7".parse().unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: GateId = lane;
/// # assert_eq!(gate.as_i64(), 1);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(SlotId);
define_id!(BookingId);
define_id!(PaymentId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_matches_path_segment() {
        assert_eq!(SlotId::new(42).to_string(), "42");
    }

    #[test]
    fn test_id_display_honors_width() {
        assert_eq!(format!("[{:>5}]", SlotId::new(42)), "[   42]");
        assert_eq!(format!("[{:<4}]", BookingId::new(7)), "[7   ]");
    }

    #[test]
    fn test_id_from_str_trims_whitespace() {
        let id: BookingId = " 17 ".parse().unwrap();
        assert_eq!(id.as_i64(), 17);
        assert!("abc".parse::<BookingId>().is_err());
    }

    #[test]
    fn test_id_is_transparent_in_json() {
        let id = UserId::new(5);
        assert_eq!(serde_json::to_string(&id).unwrap(), "5");
        let parsed: UserId = serde_json::from_str("5").unwrap();
        assert_eq!(parsed, id);
    }
}
