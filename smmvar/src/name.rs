// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, NUL-terminated UCS-2 variable names.

use core::fmt;

/// Upper bound on a variable name in bytes, NUL terminator included.
pub const MAX_NAME_SIZE: usize = 128;

/// Upper bound on a variable name in UCS-2 code units, terminator included.
pub const MAX_NAME_UNITS: usize = MAX_NAME_SIZE / 2;

/// Errors which can occur when constructing a [`VariableName`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameError {
    /// The name does not fit within [`MAX_NAME_SIZE`] bytes.
    Oversized,

    /// The name is not NUL-terminated, or the terminator is not the final
    /// code unit.
    NotNulTerminated,

    /// A NUL code unit was encountered before the end of the name.
    InteriorNul(usize),

    /// The byte length is not a whole number of UCS-2 code units.
    OddByteLength,

    /// A character could not be represented in UCS-2.
    InvalidChar,
}

/// A variable name: a NUL-terminated UCS-2 string of at most
/// [`MAX_NAME_UNITS`] code units, stored inline.
///
/// The empty name (a single NUL) is valid; it selects the first entry when
/// enumerating and never names a stored variable.
#[derive(Clone, Copy)]
pub struct VariableName {
    units: [u16; MAX_NAME_UNITS],
    /// Length in code units, terminator included. Always at least 1.
    len: usize,
}

impl VariableName {
    /// The empty name, used to start an enumeration.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            units: [0; MAX_NAME_UNITS],
            len: 1,
        }
    }

    /// Creates a name from UCS-2 code units that include the terminator.
    pub fn from_u16_with_nul(units: &[u16]) -> Result<Self, NameError> {
        let nul_pos = units
            .iter()
            .position(|&unit| unit == 0)
            .ok_or(NameError::NotNulTerminated)?;
        if nul_pos + 1 != units.len() {
            return Err(NameError::InteriorNul(nul_pos));
        }
        if units.len() > MAX_NAME_UNITS {
            return Err(NameError::Oversized);
        }

        let mut name = Self::empty();
        name.units[..units.len()].copy_from_slice(units);
        name.len = units.len();
        Ok(name)
    }

    /// Creates a name from its little-endian byte representation, terminator
    /// included.
    pub fn from_bytes_with_nul(bytes: &[u8]) -> Result<Self, NameError> {
        if bytes.len() % 2 != 0 {
            return Err(NameError::OddByteLength);
        }
        if bytes.len() > MAX_NAME_SIZE {
            return Err(NameError::Oversized);
        }

        let mut units = [0u16; MAX_NAME_UNITS];
        for (unit, pair) in units.iter_mut().zip(bytes.chunks_exact(2)) {
            *unit = u16::from_le_bytes([pair[0], pair[1]]);
        }
        Self::from_u16_with_nul(&units[..bytes.len() / 2])
    }

    /// The name as code units, terminator included.
    #[must_use]
    pub fn as_units_with_nul(&self) -> &[u16] {
        &self.units[..self.len]
    }

    /// The name as code units, terminator excluded.
    #[must_use]
    pub fn as_units(&self) -> &[u16] {
        &self.units[..self.len - 1]
    }

    /// Size of the name in bytes, terminator included.
    #[must_use]
    pub const fn num_bytes(&self) -> usize {
        self.len * 2
    }

    /// Whether this is the empty name.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 1
    }

    /// Writes the little-endian byte representation, terminator included,
    /// to the start of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than [`Self::num_bytes`].
    pub fn emit(&self, out: &mut [u8]) {
        for (pair, unit) in out.chunks_exact_mut(2).zip(self.as_units_with_nul()) {
            pair.copy_from_slice(&unit.to_le_bytes());
        }
    }
}

impl TryFrom<&str> for VariableName {
    type Error = NameError;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        let mut units = [0u16; MAX_NAME_UNITS];
        let used = match ucs2::encode(input, &mut units) {
            Ok(used) => used,
            Err(ucs2::Error::BufferOverflow) => return Err(NameError::Oversized),
            Err(_) => return Err(NameError::InvalidChar),
        };
        if used >= MAX_NAME_UNITS {
            return Err(NameError::Oversized);
        }
        Self::from_u16_with_nul(&units[..used + 1])
    }
}

impl PartialEq for VariableName {
    fn eq(&self, other: &Self) -> bool {
        self.as_units_with_nul() == other.as_units_with_nul()
    }
}

impl Eq for VariableName {}

impl fmt::Display for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &unit in self.as_units() {
            // UCS-2 has no surrogate pairs, so each unit is one BMP scalar.
            let c = char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER);
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariableName(\"{self}\")")
    }
}
