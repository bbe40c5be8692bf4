// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-memory variable index.
//!
//! The index is the catalog of every variable the service knows about:
//! metadata (GUID, name, attributes, storage UID, authentication state) and
//! optional check-constraints. Entries live in a fixed-capacity slot table;
//! slot order is enumeration order.
//!
//! Non-volatile entries are serialized into a byte image ([`VariableIndex::dump`])
//! that the persistence layer writes to one of two alternating storage
//! objects. A 32-bit counter at the front of the image decides which copy is
//! newer after a reboot; it wraps, and ordering is defined modulo 2³².

use crate::name::VariableName;
use alloc::vec::Vec;
use smmvar_raw::time::Time;
use smmvar_raw::variable::{VarCheckVariableProperty, VariableAttributes};
use smmvar_raw::Guid;

/// Size of an authenticated-write fingerprint in bytes (SHA-256).
pub const FINGERPRINT_SIZE: usize = 32;

/// Serialized size of a metadata record:
/// `guid:16 ∥ timestamp:16 ∥ fingerprint:32 ∥ attributes:u32 ∥
/// name_size:u32 ∥ uid:u64 ∥ name:128`.
pub const METADATA_RECORD_SIZE: usize = 80 + crate::name::MAX_NAME_SIZE;

/// Serialized size of a constraints record.
pub const CONSTRAINTS_RECORD_SIZE: usize = VarCheckVariableProperty::ENCODED_SIZE;

/// Metadata held for every known variable.
#[derive(Clone, Copy, Debug)]
pub struct VariableMetadata {
    /// Vendor GUID.
    pub guid: Guid,
    /// Variable name.
    pub name: VariableName,
    /// Stored attributes. Empty until the variable is first set.
    pub attributes: VariableAttributes,
    /// Storage UID of the data object; assigned when the entry is created
    /// and stable for the entry's lifetime.
    pub uid: u64,
    /// Timestamp of the latest accepted authenticated write.
    pub timestamp: Time,
    /// Fingerprint of the principal bound to this variable; all zeros until
    /// the first authenticated write.
    pub fingerprint: [u8; FINGERPRINT_SIZE],
}

/// One slot of the index: metadata, optional constraints, and the two
/// lifecycle flags. An entry stays allocated as long as either flag is set.
#[derive(Clone, Copy, Debug)]
pub struct VariableInfo {
    /// The variable metadata.
    pub metadata: VariableMetadata,
    /// Registered check-constraints; meaningful iff `is_constraints_set`.
    pub check_constraints: VarCheckVariableProperty,
    /// Whether the variable currently has a value.
    pub is_variable_set: bool,
    /// Whether check-constraints have been registered.
    pub is_constraints_set: bool,
}

impl VariableInfo {
    /// Whether the metadata carries the NON_VOLATILE attribute.
    #[must_use]
    pub fn is_nv(&self) -> bool {
        self.metadata
            .attributes
            .contains(VariableAttributes::NON_VOLATILE)
    }
}

/// Stable handle to an index slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryId(usize);

/// Errors produced by index operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexError {
    /// Every slot is occupied.
    Full,
    /// The serialization buffer cannot hold the full index image.
    BufferTooSmall,
    /// An enumeration step named a variable that is not indexed.
    UnknownVariable,
}

/// The in-memory variable index.
#[derive(Debug)]
pub struct VariableIndex {
    entries: Vec<Option<VariableInfo>>,
    counter: u32,
    dirty: bool,
    next_uid: u64,
}

impl VariableIndex {
    /// Creates an empty index with capacity for `max_variables` entries.
    #[must_use]
    pub fn new(max_variables: usize) -> Self {
        let mut entries = Vec::new();
        entries.resize_with(max_variables, || None);
        Self {
            entries,
            counter: 0,
            dirty: false,
            next_uid: 1,
        }
    }

    /// The current persistence counter.
    #[must_use]
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    pub(crate) fn set_counter(&mut self, counter: u32) {
        self.counter = counter;
    }

    /// Whether NV-visible state changed since the last successful dump.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Largest possible serialized size of this index.
    #[must_use]
    pub fn max_dump_size(&self) -> usize {
        4 + self.entries.len() * (METADATA_RECORD_SIZE + 1 + CONSTRAINTS_RECORD_SIZE)
    }

    /// Shared access to an entry.
    ///
    /// # Panics
    ///
    /// Panics if `id` no longer names a live entry.
    #[must_use]
    pub fn get(&self, id: EntryId) -> &VariableInfo {
        self.entries[id.0].as_ref().expect("stale entry id")
    }

    fn get_mut(&mut self, id: EntryId) -> &mut VariableInfo {
        self.entries[id.0].as_mut().expect("stale entry id")
    }

    /// Iterates over the live entries in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &VariableInfo> {
        self.entries.iter().filter_map(Option::as_ref)
    }

    /// Iterates over the ids of live entries in enumeration order.
    pub fn entry_ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| EntryId(i)))
    }

    /// Finds the entry for `(guid, name)`.
    #[must_use]
    pub fn find(&self, guid: &Guid, name: &VariableName) -> Option<EntryId> {
        self.entry_ids().find(|&id| {
            let info = self.get(id);
            info.metadata.guid == *guid && info.metadata.name == *name
        })
    }

    /// Adds a fresh entry for `(guid, name)` and returns its id.
    ///
    /// Callers look the name up first; adding a duplicate is a caller error
    /// and results in a shadowed entry.
    pub fn add_entry(&mut self, guid: &Guid, name: &VariableName) -> Result<EntryId, IndexError> {
        let slot = self
            .entries
            .iter()
            .position(Option::is_none)
            .ok_or(IndexError::Full)?;

        let uid = self.next_uid;
        self.next_uid += 1;

        self.entries[slot] = Some(VariableInfo {
            metadata: VariableMetadata {
                guid: *guid,
                name: *name,
                attributes: VariableAttributes::empty(),
                uid,
                timestamp: Time::default(),
                fingerprint: [0; FINGERPRINT_SIZE],
            },
            check_constraints: VarCheckVariableProperty::default(),
            is_variable_set: false,
            is_constraints_set: false,
        });
        Ok(EntryId(slot))
    }

    /// The enumeration step: the empty name selects the first set entry,
    /// otherwise `(guid, name)` must be indexed and the next set entry after
    /// it is returned. `Ok(None)` signals the end of the enumeration.
    ///
    /// Entries without a value are skipped; visibility filtering beyond that
    /// is the caller's concern.
    pub fn find_next(
        &self,
        guid: &Guid,
        name: &VariableName,
    ) -> Result<Option<EntryId>, IndexError> {
        let first_candidate = if name.is_empty() {
            0
        } else {
            let EntryId(pos) = self
                .find(guid, name)
                .ok_or(IndexError::UnknownVariable)?;
            pos + 1
        };

        Ok(self
            .entry_ids()
            .filter(|&EntryId(pos)| pos >= first_candidate)
            .find(|&id| self.get(id).is_variable_set))
    }

    /// Records that the variable now has a value with the given attributes.
    pub fn set_variable(&mut self, id: EntryId, attributes: VariableAttributes) {
        let nv_visible = self.get(id).is_nv()
            || attributes.contains(VariableAttributes::NON_VOLATILE);

        let info = self.get_mut(id);
        info.metadata.attributes = attributes;
        info.is_variable_set = true;

        if nv_visible {
            self.dirty = true;
        }
    }

    /// Records the authentication state accepted for the latest write.
    pub fn record_authentication(
        &mut self,
        id: EntryId,
        timestamp: Time,
        fingerprint: [u8; FINGERPRINT_SIZE],
    ) {
        let info = self.get_mut(id);
        info.metadata.timestamp = timestamp;
        info.metadata.fingerprint = fingerprint;

        if self.get(id).is_nv() {
            self.dirty = true;
        }
    }

    /// Registers check-constraints for the entry.
    pub fn set_constraints(&mut self, id: EntryId, constraints: VarCheckVariableProperty) {
        let info = self.get_mut(id);
        info.check_constraints = constraints;
        info.is_constraints_set = true;

        if self.get(id).is_nv() {
            self.dirty = true;
        }
    }

    /// Records that the variable no longer has a value. The slot survives if
    /// constraints are registered; otherwise it becomes reclaimable through
    /// [`Self::remove_unused_entry`].
    pub fn clear_variable(&mut self, id: EntryId) {
        if !self.get(id).is_variable_set {
            return;
        }
        let nv = self.get(id).is_nv();
        self.get_mut(id).is_variable_set = false;
        if nv {
            self.dirty = true;
        }
    }

    /// Frees the slot if neither the variable nor constraints are set.
    pub fn remove_unused_entry(&mut self, id: EntryId) {
        let info = self.get(id);
        if !info.is_variable_set && !info.is_constraints_set {
            self.entries[id.0] = None;
        }
    }

    /// Overwrites an entry with a previously taken snapshot. Used to undo a
    /// mutation whose commit failed; the dirty flag stays set so the next
    /// commit persists the restored state.
    pub(crate) fn revert_entry(&mut self, id: EntryId, snapshot: VariableInfo) {
        self.entries[id.0] = Some(snapshot);
    }

    /// Frees a slot unconditionally. Used to undo a failed `add_entry`.
    pub(crate) fn discard_entry(&mut self, id: EntryId) {
        self.entries[id.0] = None;
    }

    /// Serializes the counter and every NV entry into `buf`.
    ///
    /// On success returns the number of bytes written and whether NV state
    /// had changed since the previous dump; the dirty flag is cleared. When
    /// `buf` cannot hold the full image nothing is written and the dirty
    /// flag is left alone.
    pub fn dump(&mut self, buf: &mut [u8]) -> Result<(usize, bool), IndexError> {
        let needed = self.dump_size();
        if buf.len() < needed {
            return Err(IndexError::BufferTooSmall);
        }

        buf[0..4].copy_from_slice(&self.counter.to_le_bytes());
        let mut offset = 4;

        for info in self.iter().filter(|info| info.is_nv()) {
            Self::dump_metadata(&info.metadata, &mut buf[offset..]);
            offset += METADATA_RECORD_SIZE;

            buf[offset] = u8::from(info.is_constraints_set);
            offset += 1;

            if info.is_constraints_set {
                info.check_constraints.emit(&mut buf[offset..]);
                offset += CONSTRAINTS_RECORD_SIZE;
            }
        }

        let was_dirty = self.dirty;
        self.dirty = false;
        Ok((offset, was_dirty))
    }

    /// Rebuilds the index from a serialized image, returning the number of
    /// bytes consumed. Trailing bytes that do not form a whole record are
    /// ignored; restored entries are marked as set until reconciliation
    /// proves otherwise.
    pub fn restore(&mut self, data: &[u8]) -> usize {
        if data.len() < 4 {
            return 0;
        }
        self.counter = u32::from_le_bytes(data[0..4].try_into().unwrap());
        let mut offset = 4;

        while offset + METADATA_RECORD_SIZE + 1 <= data.len() {
            let Some(metadata) = Self::restore_metadata(&data[offset..]) else {
                log::warn!("variable index image has a malformed record; truncating restore");
                break;
            };
            let record_end = offset + METADATA_RECORD_SIZE;
            let has_constraints = data[record_end] != 0;

            let mut constraints = VarCheckVariableProperty::default();
            let mut next = record_end + 1;
            if has_constraints {
                match VarCheckVariableProperty::parse(&data[next..]) {
                    Some(parsed) => {
                        constraints = parsed;
                        next += CONSTRAINTS_RECORD_SIZE;
                    }
                    None => break,
                }
            }

            let Some(slot) = self.entries.iter().position(Option::is_none) else {
                log::warn!("variable index image holds more records than slots");
                break;
            };
            self.next_uid = self.next_uid.max(metadata.uid + 1);
            self.entries[slot] = Some(VariableInfo {
                metadata,
                check_constraints: constraints,
                is_variable_set: true,
                is_constraints_set: has_constraints,
            });
            offset = next;
        }

        offset
    }

    fn dump_size(&self) -> usize {
        4 + self
            .iter()
            .filter(|info| info.is_nv())
            .map(|info| {
                METADATA_RECORD_SIZE
                    + 1
                    + if info.is_constraints_set {
                        CONSTRAINTS_RECORD_SIZE
                    } else {
                        0
                    }
            })
            .sum::<usize>()
    }

    fn dump_metadata(metadata: &VariableMetadata, out: &mut [u8]) {
        out[0..16].copy_from_slice(&metadata.guid.to_bytes());
        metadata.timestamp.emit(&mut out[16..32]);
        out[32..64].copy_from_slice(&metadata.fingerprint);
        out[64..68].copy_from_slice(&metadata.attributes.bits().to_le_bytes());
        out[68..72].copy_from_slice(&(metadata.name.num_bytes() as u32).to_le_bytes());
        out[72..80].copy_from_slice(&metadata.uid.to_le_bytes());

        let name_out = &mut out[80..80 + crate::name::MAX_NAME_SIZE];
        name_out.fill(0);
        metadata.name.emit(name_out);
    }

    fn restore_metadata(record: &[u8]) -> Option<VariableMetadata> {
        let guid = Guid::from_bytes(record[0..16].try_into().unwrap());
        let timestamp = Time::parse(&record[16..32])?;
        let fingerprint: [u8; FINGERPRINT_SIZE] = record[32..64].try_into().unwrap();
        let attributes = VariableAttributes::from_bits_retain(u32::from_le_bytes(
            record[64..68].try_into().unwrap(),
        ));
        let name_size = u32::from_le_bytes(record[68..72].try_into().unwrap()) as usize;
        let uid = u64::from_le_bytes(record[72..80].try_into().unwrap());

        if name_size > crate::name::MAX_NAME_SIZE {
            return None;
        }
        let name = VariableName::from_bytes_with_nul(&record[80..80 + name_size]).ok()?;

        Some(VariableMetadata {
            guid,
            name,
            attributes,
            uid,
            timestamp,
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use smmvar_raw::variable::VarCheckProperty;
    use uguid::guid;

    const GUID_1: Guid = guid!("12341234-1234-1234-0001-020304050607");
    const GUID_2: Guid = guid!("55443322-2345-2345-1011-121314151617");

    const MAX_VARIABLES: usize = 10;

    fn name(s: &str) -> VariableName {
        VariableName::try_from(s).unwrap()
    }

    fn read_only_constraints() -> VarCheckVariableProperty {
        VarCheckVariableProperty {
            revision: 10,
            property: VarCheckProperty::READ_ONLY,
            attributes: VariableAttributes::empty(),
            min_size: 1,
            max_size: 100,
        }
    }

    /// Adds var1 (volatile), var2_nv, and var3_nv, in that order.
    fn create_variables(index: &mut VariableIndex) {
        let id = index.add_entry(&GUID_1, &name("var1")).unwrap();
        index.set_variable(id, VariableAttributes::BOOTSERVICE_ACCESS);

        let id = index.add_entry(&GUID_2, &name("var2_nv")).unwrap();
        index.set_variable(
            id,
            VariableAttributes::NON_VOLATILE | VariableAttributes::BOOTSERVICE_ACCESS,
        );

        let id = index.add_entry(&GUID_1, &name("var3_nv")).unwrap();
        index.set_variable(
            id,
            VariableAttributes::NON_VOLATILE
                | VariableAttributes::RUNTIME_ACCESS
                | VariableAttributes::BOOTSERVICE_ACCESS,
        );
    }

    #[test]
    fn empty_index_operations() {
        let index = VariableIndex::new(MAX_VARIABLES);

        assert_eq!(index.find(&GUID_1, &name("var1")), None);

        // Enumerating from an unknown name is rejected.
        assert_eq!(
            index.find_next(&GUID_1, &name("var1")),
            Err(IndexError::UnknownVariable)
        );

        // Enumerating from the start of an empty index finds nothing.
        assert_eq!(index.find_next(&GUID_1, &VariableName::empty()), Ok(None));
    }

    #[test]
    fn index_full() {
        let mut index = VariableIndex::new(MAX_VARIABLES);
        let var_name = name("var1");

        for i in 0..MAX_VARIABLES {
            let guid = Guid::from_bytes({
                let mut bytes = GUID_1.to_bytes();
                bytes[0] = i as u8;
                bytes
            });
            assert!(index.add_entry(&guid, &var_name).is_ok());
        }

        assert_eq!(index.add_entry(&GUID_2, &var_name), Err(IndexError::Full));
    }

    #[test]
    fn enumerate_entries() {
        let mut index = VariableIndex::new(MAX_VARIABLES);
        create_variables(&mut index);

        let id = index
            .find_next(&GUID_1, &VariableName::empty())
            .unwrap()
            .unwrap();
        let info = index.get(id);
        assert_eq!(info.metadata.attributes, VariableAttributes::BOOTSERVICE_ACCESS);
        assert_eq!(info.metadata.guid, GUID_1);
        assert_eq!(info.metadata.name, name("var1"));

        let (guid, var_name) = (info.metadata.guid, info.metadata.name);
        let id = index.find_next(&guid, &var_name).unwrap().unwrap();
        let info = index.get(id);
        assert_eq!(
            info.metadata.attributes,
            VariableAttributes::NON_VOLATILE | VariableAttributes::BOOTSERVICE_ACCESS
        );
        assert_eq!(info.metadata.name, name("var2_nv"));

        let (guid, var_name) = (info.metadata.guid, info.metadata.name);
        let id = index.find_next(&guid, &var_name).unwrap().unwrap();
        let info = index.get(id);
        assert_eq!(info.metadata.name, name("var3_nv"));

        let (guid, var_name) = (info.metadata.guid, info.metadata.name);
        assert_eq!(index.find_next(&guid, &var_name), Ok(None));
    }

    #[test]
    fn dump_restore_round_trip() {
        let mut index = VariableIndex::new(MAX_VARIABLES);
        create_variables(&mut index);

        let mut buf = vec![0u8; index.max_dump_size()];
        let (dump_len, is_dirty) = index.dump(&mut buf).unwrap();
        assert!(is_dirty);
        // Counter followed by the records of the two NV variables.
        assert_eq!(dump_len, 4 + 2 * (METADATA_RECORD_SIZE + 1));

        // Nothing changed, so a repeated dump reports clean.
        let (dump_len_2, is_dirty) = index.dump(&mut buf).unwrap();
        assert!(!is_dirty);
        assert_eq!(dump_len_2, dump_len);

        // Simulate a reboot.
        let mut restored = VariableIndex::new(MAX_VARIABLES);
        assert_eq!(restored.restore(&buf[..dump_len]), dump_len);

        // Only the NV variables survive.
        let id = restored
            .find_next(&GUID_1, &VariableName::empty())
            .unwrap()
            .unwrap();
        let info = restored.get(id);
        assert_eq!(
            info.metadata.attributes,
            VariableAttributes::NON_VOLATILE | VariableAttributes::BOOTSERVICE_ACCESS
        );
        assert!(info.is_variable_set);

        let (guid, var_name) = (info.metadata.guid, info.metadata.name);
        let id = restored.find_next(&guid, &var_name).unwrap().unwrap();
        let info = restored.get(id);
        assert_eq!(
            info.metadata.attributes,
            VariableAttributes::NON_VOLATILE
                | VariableAttributes::RUNTIME_ACCESS
                | VariableAttributes::BOOTSERVICE_ACCESS
        );

        let (guid, var_name) = (info.metadata.guid, info.metadata.name);
        assert_eq!(restored.find_next(&guid, &var_name), Ok(None));
    }

    #[test]
    fn dump_restore_constrained_variable() {
        let mut index = VariableIndex::new(MAX_VARIABLES);
        create_variables(&mut index);

        let id = index.find(&GUID_2, &name("var2_nv")).unwrap();
        assert!(index.get(id).is_variable_set);
        assert!(!index.get(id).is_constraints_set);

        index.set_constraints(id, read_only_constraints());
        assert!(index.get(id).is_constraints_set);
        assert!(index.get(id).is_variable_set);

        let mut buf = vec![0u8; index.max_dump_size()];
        let (dump_len, is_dirty) = index.dump(&mut buf).unwrap();
        assert!(is_dirty);
        // Two NV records, one of which carries constraints.
        assert_eq!(
            dump_len,
            4 + 2 * (METADATA_RECORD_SIZE + 1) + CONSTRAINTS_RECORD_SIZE
        );

        let mut restored = VariableIndex::new(MAX_VARIABLES);
        assert_eq!(restored.restore(&buf[..dump_len]), dump_len);

        let id = restored.find(&GUID_2, &name("var2_nv")).unwrap();
        assert!(restored.get(id).is_constraints_set);
        assert_eq!(restored.get(id).check_constraints, read_only_constraints());
    }

    #[test]
    fn dump_buffer_too_small() {
        let mut index = VariableIndex::new(MAX_VARIABLES);
        create_variables(&mut index);

        // Room for the counter and a single record, but two are needed.
        let mut buf = vec![0u8; 4 + METADATA_RECORD_SIZE + 1];
        assert_eq!(index.dump(&mut buf), Err(IndexError::BufferTooSmall));

        // The failed dump must not have cleared the dirty flag.
        assert!(index.is_dirty());
    }

    #[test]
    fn remove_variable_dirty_tracking() {
        let mut index = VariableIndex::new(MAX_VARIABLES);
        create_variables(&mut index);

        // Remove one of the NV variables.
        let id = index.find(&GUID_2, &name("var2_nv")).unwrap();
        index.clear_variable(id);
        index.remove_unused_entry(id);

        let mut buf = vec![0u8; index.max_dump_size()];
        let (dump_len, is_dirty) = index.dump(&mut buf).unwrap();
        assert!(is_dirty);
        assert_eq!(dump_len, 4 + METADATA_RECORD_SIZE + 1);

        // Removing the volatile variable does not touch NV state.
        let id = index.find(&GUID_1, &name("var1")).unwrap();
        index.clear_variable(id);
        index.remove_unused_entry(id);

        let (dump_len, is_dirty) = index.dump(&mut buf).unwrap();
        assert!(!is_dirty);
        assert_eq!(dump_len, 4 + METADATA_RECORD_SIZE + 1);

        // Removing the last NV variable leaves only the counter.
        let id = index.find(&GUID_1, &name("var3_nv")).unwrap();
        index.clear_variable(id);
        index.remove_unused_entry(id);

        let (dump_len, is_dirty) = index.dump(&mut buf).unwrap();
        assert!(is_dirty);
        assert_eq!(dump_len, 4);

        assert_eq!(index.find_next(&GUID_1, &VariableName::empty()), Ok(None));
    }

    #[test]
    fn iteration_skips_freed_slots() {
        let mut index = VariableIndex::new(MAX_VARIABLES);
        create_variables(&mut index);

        let names: Vec<_> = index.iter().map(|info| info.metadata.name).collect();
        assert_eq!(names, vec![name("var1"), name("var2_nv"), name("var3_nv")]);

        // Remove the middle entry.
        let id = index.find(&GUID_2, &name("var2_nv")).unwrap();
        index.clear_variable(id);
        index.remove_unused_entry(id);

        let names: Vec<_> = index.iter().map(|info| info.metadata.name).collect();
        assert_eq!(names, vec![name("var1"), name("var3_nv")]);
    }

    #[test]
    fn constraints_keep_entry_alive() {
        let mut index = VariableIndex::new(MAX_VARIABLES);
        create_variables(&mut index);

        let id = index.find(&GUID_2, &name("var2_nv")).unwrap();
        index.set_constraints(id, read_only_constraints());

        // Clearing the variable keeps the slot because of the constraints.
        index.clear_variable(id);
        index.remove_unused_entry(id);

        let id = index.find(&GUID_2, &name("var2_nv")).unwrap();
        assert!(!index.get(id).is_variable_set);
        assert!(index.get(id).is_constraints_set);

        // Enumeration sees only the two set variables.
        let id = index
            .find_next(&GUID_1, &VariableName::empty())
            .unwrap()
            .unwrap();
        assert_eq!(index.get(id).metadata.name, name("var1"));

        let (guid, var_name) = (index.get(id).metadata.guid, index.get(id).metadata.name);
        let id = index.find_next(&guid, &var_name).unwrap().unwrap();
        assert_eq!(index.get(id).metadata.name, name("var3_nv"));

        let (guid, var_name) = (index.get(id).metadata.guid, index.get(id).metadata.name);
        assert_eq!(index.find_next(&guid, &var_name), Ok(None));

        // Plain iteration still returns all three entries.
        assert_eq!(index.iter().count(), 3);
    }

    #[test]
    fn constraints_before_first_write() {
        let mut index = VariableIndex::new(MAX_VARIABLES);

        assert_eq!(index.find(&GUID_2, &name("var2_nv")), None);

        let id = index.add_entry(&GUID_2, &name("var2_nv")).unwrap();
        index.set_constraints(id, read_only_constraints());
        assert!(!index.get(id).is_variable_set);
        assert!(index.get(id).is_constraints_set);

        index.set_variable(
            id,
            VariableAttributes::RUNTIME_ACCESS | VariableAttributes::BOOTSERVICE_ACCESS,
        );
        assert!(index.get(id).is_variable_set);
        assert!(index.get(id).is_constraints_set);

        assert_eq!(index.get(id).check_constraints, read_only_constraints());
    }

    #[test]
    fn counter_survives_round_trip() {
        let mut index = VariableIndex::new(MAX_VARIABLES);
        index.set_counter(41);
        create_variables(&mut index);

        let mut buf = vec![0u8; index.max_dump_size()];
        let (dump_len, _) = index.dump(&mut buf).unwrap();

        let mut restored = VariableIndex::new(MAX_VARIABLES);
        restored.restore(&buf[..dump_len]);
        assert_eq!(restored.counter(), 41);
    }

    #[test]
    fn restore_allocates_uids_above_restored_entries() {
        let mut index = VariableIndex::new(MAX_VARIABLES);
        create_variables(&mut index);
        let max_uid = index.iter().map(|info| info.metadata.uid).max().unwrap();

        let mut buf = vec![0u8; index.max_dump_size()];
        let (dump_len, _) = index.dump(&mut buf).unwrap();

        let mut restored = VariableIndex::new(MAX_VARIABLES);
        restored.restore(&buf[..dump_len]);

        let id = restored.add_entry(&GUID_1, &name("fresh")).unwrap();
        assert!(restored.get(id).metadata.uid > max_uid);
    }
}
