// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helper macro for modeling C-style open enums.
//!
//! The ABI allows peers to send values outside the set of named variants, so
//! these types cannot be Rust enums: merely storing an unknown variant in a
//! Rust enum is undefined behavior. They are modeled as integer newtypes with
//! associated constants instead.

/// Defines an integer newtype with a set of named constants and a `Debug`
/// impl that prints the constant name when the value matches one.
macro_rules! newtype_enum {
    (
        $(#[$type_attrs:meta])*
        $visibility:vis enum $type:ident : $base_integer:ty => {
            $(
                $(#[$variant_attrs:meta])*
                $variant:ident = $value:expr,
            )*
        }
    ) => {
        $(#[$type_attrs])*
        #[repr(transparent)]
        #[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
        $visibility struct $type(pub $base_integer);

        #[allow(unused)]
        impl $type {
            $(
                $(#[$variant_attrs])*
                pub const $variant: $type = $type($value);
            )*
        }

        impl core::fmt::Debug for $type {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match *self {
                    $(
                        $type::$variant => write!(f, stringify!($variant)),
                    )*
                    $type(unknown) => {
                        write!(f, "{}({:#x})", stringify!($type), unknown)
                    }
                }
            }
        }
    };
}
