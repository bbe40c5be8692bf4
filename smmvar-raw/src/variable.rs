// SPDX-License-Identifier: MIT OR Apache-2.0

//! Variable attributes and check-constraint properties.

use bitflags::bitflags;

bitflags! {
    /// Flags describing the attributes of a variable.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct VariableAttributes: u32 {
        /// Variable is maintained across a power cycle.
        const NON_VOLATILE = 0x01;

        /// Variable is accessible during the time that boot services are
        /// accessible.
        const BOOTSERVICE_ACCESS = 0x02;

        /// Variable is accessible during the time that runtime services are
        /// accessible.
        const RUNTIME_ACCESS = 0x04;

        /// Variable is stored in the portion of NVR allocated for error
        /// records.
        const HARDWARE_ERROR_RECORD = 0x08;

        /// Deprecated counter-based authentication.
        const AUTHENTICATED_WRITE_ACCESS = 0x10;

        /// Variable payload begins with an EFI_VARIABLE_AUTHENTICATION_2
        /// descriptor.
        const TIME_BASED_AUTHENTICATED_WRITE_ACCESS = 0x20;

        /// The variable payload is appended to the current value instead of
        /// replacing it. Never stored; only meaningful on a set request.
        const APPEND_WRITE = 0x40;
    }
}

bitflags! {
    /// Property flags of a variable check-constraint registration.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct VarCheckProperty: u16 {
        /// The variable is read-only once the constraint is registered.
        const READ_ONLY = 0x01;
    }
}

/// The only defined revision of the var-check property structure.
pub const VAR_CHECK_PROPERTY_REVISION: u16 = 0x0001;

/// Check-constraints registered against a single variable.
///
/// Wire layout (24 bytes, little-endian):
/// `revision:u16, property:u16, attributes:u32, min_size:u64, max_size:u64`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VarCheckVariableProperty {
    /// Structure revision; must be [`VAR_CHECK_PROPERTY_REVISION`].
    pub revision: u16,
    /// Property flags.
    pub property: VarCheckProperty,
    /// Attributes the variable is required to carry. Zero disables the check.
    pub attributes: VariableAttributes,
    /// Smallest permitted data size in bytes.
    pub min_size: u64,
    /// Largest permitted data size in bytes.
    pub max_size: u64,
}

impl VarCheckVariableProperty {
    /// Serialized size of the structure.
    pub const ENCODED_SIZE: usize = 24;

    /// Parses the structure from the start of `bytes`.
    ///
    /// Returns `None` if `bytes` is shorter than [`Self::ENCODED_SIZE`].
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::ENCODED_SIZE {
            return None;
        }
        Some(Self {
            revision: u16::from_le_bytes([bytes[0], bytes[1]]),
            property: VarCheckProperty::from_bits_retain(u16::from_le_bytes([
                bytes[2], bytes[3],
            ])),
            attributes: VariableAttributes::from_bits_retain(u32::from_le_bytes([
                bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
            min_size: u64::from_le_bytes(bytes[8..16].try_into().unwrap()),
            max_size: u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
        })
    }

    /// Writes the structure to the start of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than [`Self::ENCODED_SIZE`].
    pub fn emit(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.revision.to_le_bytes());
        out[2..4].copy_from_slice(&self.property.bits().to_le_bytes());
        out[4..8].copy_from_slice(&self.attributes.bits().to_le_bytes());
        out[8..16].copy_from_slice(&self.min_size.to_le_bytes());
        out[16..24].copy_from_slice(&self.max_size.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_round_trip() {
        let property = VarCheckVariableProperty {
            revision: VAR_CHECK_PROPERTY_REVISION,
            property: VarCheckProperty::READ_ONLY,
            attributes: VariableAttributes::NON_VOLATILE,
            min_size: 1,
            max_size: 100,
        };

        let mut buf = [0u8; VarCheckVariableProperty::ENCODED_SIZE];
        property.emit(&mut buf);
        assert_eq!(VarCheckVariableProperty::parse(&buf), Some(property));

        // Truncated input is rejected rather than partially parsed.
        assert_eq!(VarCheckVariableProperty::parse(&buf[..23]), None);
    }
}
