// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMM variable communicate structures.
//!
//! Each request payload starts with a fixed header followed by a
//! variable-length tail (UCS-2 name, then data for access requests). The
//! headers are parsed and emitted field by field; all size arithmetic is
//! overflow-checked so a hostile length field cannot wrap a bounds check.

use crate::variable::{VarCheckVariableProperty, VariableAttributes};
use uguid::Guid;

/// Size of the communicate header preceding every request payload:
/// `function:u64` followed by `return_status:u64`.
pub const COMMUNICATE_HEADER_SIZE: usize = 16;

/// Header of a GetVariable/SetVariable request.
///
/// Wire layout: `guid:16B, data_size:u64, name_size:u64, attributes:u32`,
/// followed by the name (`name_size` bytes including the NUL terminator) and
/// the data (`data_size` bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccessVariable {
    /// Vendor GUID of the variable.
    pub guid: Guid,
    /// Size of the data that follows the name, in bytes.
    pub data_size: u64,
    /// Size of the name in bytes, including the NUL terminator.
    pub name_size: u64,
    /// Attributes carried by the request.
    pub attributes: VariableAttributes,
}

impl AccessVariable {
    /// Offset of the name field; also the serialized header size.
    pub const NAME_OFFSET: usize = 36;

    /// Parses the fixed header from the start of `bytes`.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::NAME_OFFSET {
            return None;
        }
        Some(Self {
            guid: Guid::from_bytes(bytes[0..16].try_into().unwrap()),
            data_size: u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
            name_size: u64::from_le_bytes(bytes[24..32].try_into().unwrap()),
            attributes: VariableAttributes::from_bits_retain(u32::from_le_bytes(
                bytes[32..36].try_into().unwrap(),
            )),
        })
    }

    /// Writes the fixed header to the start of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than [`Self::NAME_OFFSET`].
    pub fn emit(&self, out: &mut [u8]) {
        out[0..16].copy_from_slice(&self.guid.to_bytes());
        out[16..24].copy_from_slice(&self.data_size.to_le_bytes());
        out[24..32].copy_from_slice(&self.name_size.to_le_bytes());
        out[32..36].copy_from_slice(&self.attributes.bits().to_le_bytes());
    }

    /// Offset of the data field, checked against overflow.
    #[must_use]
    pub fn data_offset(&self) -> Option<usize> {
        Self::NAME_OFFSET.checked_add(usize::try_from(self.name_size).ok()?)
    }

    /// Total size of the serialized request, checked against overflow.
    #[must_use]
    pub fn total_size(&self) -> Option<usize> {
        self.data_offset()?
            .checked_add(usize::try_from(self.data_size).ok()?)
    }
}

/// Header of a GetNextVariableName request.
///
/// Wire layout: `guid:16B, name_size:u64`, followed by the name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NextVariableName {
    /// Vendor GUID of the previously returned variable.
    pub guid: Guid,
    /// On request: capacity of the name buffer in bytes. On reply: size of
    /// the returned name in bytes, including the NUL terminator.
    pub name_size: u64,
}

impl NextVariableName {
    /// Offset of the name field; also the serialized header size.
    pub const NAME_OFFSET: usize = 24;

    /// Parses the fixed header from the start of `bytes`.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::NAME_OFFSET {
            return None;
        }
        Some(Self {
            guid: Guid::from_bytes(bytes[0..16].try_into().unwrap()),
            name_size: u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
        })
    }

    /// Writes the fixed header to the start of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than [`Self::NAME_OFFSET`].
    pub fn emit(&self, out: &mut [u8]) {
        out[0..16].copy_from_slice(&self.guid.to_bytes());
        out[16..24].copy_from_slice(&self.name_size.to_le_bytes());
    }

    /// Total size of the serialized request, checked against overflow.
    #[must_use]
    pub fn total_size(&self) -> Option<usize> {
        Self::NAME_OFFSET.checked_add(usize::try_from(self.name_size).ok()?)
    }
}

/// QueryVariableInfo request and reply (28 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryVariableInfo {
    /// Capacity of the store for the queried class, in bytes.
    pub maximum_variable_storage_size: u64,
    /// Capacity minus the bytes currently stored for the class.
    pub remaining_variable_storage_size: u64,
    /// Largest data size a single variable may have.
    pub maximum_variable_size: u64,
    /// Class selector; only the NON_VOLATILE bit participates.
    pub attributes: VariableAttributes,
}

impl QueryVariableInfo {
    /// Serialized size of the structure.
    pub const ENCODED_SIZE: usize = 28;

    /// Parses the structure from the start of `bytes`.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::ENCODED_SIZE {
            return None;
        }
        Some(Self {
            maximum_variable_storage_size: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            remaining_variable_storage_size: u64::from_le_bytes(
                bytes[8..16].try_into().unwrap(),
            ),
            maximum_variable_size: u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
            attributes: VariableAttributes::from_bits_retain(u32::from_le_bytes(
                bytes[24..28].try_into().unwrap(),
            )),
        })
    }

    /// Writes the structure to the start of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than [`Self::ENCODED_SIZE`].
    pub fn emit(&self, out: &mut [u8]) {
        out[0..8].copy_from_slice(&self.maximum_variable_storage_size.to_le_bytes());
        out[8..16].copy_from_slice(&self.remaining_variable_storage_size.to_le_bytes());
        out[16..24].copy_from_slice(&self.maximum_variable_size.to_le_bytes());
        out[24..28].copy_from_slice(&self.attributes.bits().to_le_bytes());
    }
}

/// Header of a Get/SetVarCheckProperty request.
///
/// Wire layout: `guid:16B, name_size:u64, property:24B`, followed by the
/// name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckVariableProperty {
    /// Vendor GUID of the variable.
    pub guid: Guid,
    /// Size of the name in bytes, including the NUL terminator.
    pub name_size: u64,
    /// The constraint block.
    pub property: VarCheckVariableProperty,
}

impl CheckVariableProperty {
    /// Offset of the name field; also the serialized header size.
    pub const NAME_OFFSET: usize = 24 + VarCheckVariableProperty::ENCODED_SIZE;

    /// Parses the fixed header from the start of `bytes`.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::NAME_OFFSET {
            return None;
        }
        Some(Self {
            guid: Guid::from_bytes(bytes[0..16].try_into().unwrap()),
            name_size: u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
            property: VarCheckVariableProperty::parse(&bytes[24..])?,
        })
    }

    /// Writes the fixed header to the start of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than [`Self::NAME_OFFSET`].
    pub fn emit(&self, out: &mut [u8]) {
        out[0..16].copy_from_slice(&self.guid.to_bytes());
        out[16..24].copy_from_slice(&self.name_size.to_le_bytes());
        self.property.emit(&mut out[24..]);
    }

    /// Total size of the serialized request, checked against overflow.
    #[must_use]
    pub fn total_size(&self) -> Option<usize> {
        Self::NAME_OFFSET.checked_add(usize::try_from(self.name_size).ok()?)
    }
}

/// GetPayloadSize reply: the largest payload a single request may carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PayloadSize {
    /// Payload size in bytes.
    pub size: u64,
}

impl PayloadSize {
    /// Serialized size of the structure.
    pub const ENCODED_SIZE: usize = 8;

    /// Writes the structure to the start of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than [`Self::ENCODED_SIZE`].
    pub fn emit(&self, out: &mut [u8]) {
        out[0..8].copy_from_slice(&self.size.to_le_bytes());
    }
}
