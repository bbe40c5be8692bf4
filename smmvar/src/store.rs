// SPDX-License-Identifier: MIT OR Apache-2.0

//! The UEFI variable store.
//!
//! [`UefiVariableStore`] owns the variable index and the two storage
//! facades, and enforces everything the UEFI variable model demands of a
//! SetVariable/GetVariable implementation: attribute validity, the
//! boot/runtime access boundary, check-constraints, append semantics,
//! storage accounting, and authenticated-write verification. Every
//! successful NV-visible mutation is committed through the A/B index
//! persistence before the call returns; a failed commit reverses the
//! in-memory mutation.

use crate::auth::{self, CryptoOps, PriorAuth};
use crate::index::{EntryId, VariableIndex, VariableInfo, FINGERPRINT_SIZE};
use crate::name::VariableName;
use crate::storage::{StorageBackend, StorageError, Uid, VariableStorage};
use crate::{Error, Result};
use alloc::vec;
use smmvar_raw::comms::QueryVariableInfo;
use smmvar_raw::time::Time;
use smmvar_raw::variable::{
    VarCheckProperty, VarCheckVariableProperty, VariableAttributes,
    VAR_CHECK_PROPERTY_REVISION,
};
use smmvar_raw::{Guid, Status};

/// Attribute bits this store accepts on SetVariable. Everything else —
/// including the deprecated counter-based authenticated access — is
/// rejected with [`Status::UNSUPPORTED`].
pub const SUPPORTED_ATTRIBUTES: VariableAttributes = VariableAttributes::NON_VOLATILE
    .union(VariableAttributes::BOOTSERVICE_ACCESS)
    .union(VariableAttributes::RUNTIME_ACCESS)
    .union(VariableAttributes::TIME_BASED_AUTHENTICATED_WRITE_ACCESS)
    .union(VariableAttributes::APPEND_WRITE);

/// Storage limits of one variable class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreLimits {
    /// Total bytes of variable data the class may hold.
    pub max_storage_size: usize,
    /// Largest data size of a single variable.
    pub max_variable_size: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_storage_size: usize::MAX,
            max_variable_size: 4096,
        }
    }
}

/// The variable store. One instance exists per partition; request handlers
/// borrow it for the duration of a single request.
pub struct UefiVariableStore<'a> {
    index: VariableIndex,
    persistent_store: VariableStorage<'a>,
    volatile_store: VariableStorage<'a>,
    nv_limits: StoreLimits,
    volatile_limits: StoreLimits,
    boot_services_active: bool,
    crypto: Option<&'a dyn CryptoOps>,
    trust_anchor: Option<&'a [u8]>,
}

impl core::fmt::Debug for UefiVariableStore<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UefiVariableStore")
            .field("index", &self.index)
            .field("persistent_store", &self.persistent_store)
            .field("volatile_store", &self.volatile_store)
            .field("boot_services_active", &self.boot_services_active)
            .finish_non_exhaustive()
    }
}

impl<'a> UefiVariableStore<'a> {
    /// Initializes the store: loads the authoritative index copy from the
    /// persistent backend and reconciles it with the stored objects.
    ///
    /// Fails with [`Status::LOAD_ERROR`] when the two persisted index
    /// copies cannot be arbitrated.
    pub fn init(
        owner_id: u32,
        max_variables: usize,
        persistent_backend: &'a mut dyn StorageBackend,
        volatile_backend: &'a mut dyn StorageBackend,
    ) -> Result<Self> {
        let mut index = VariableIndex::new(max_variables);
        let mut persistent_store = VariableStorage::new(persistent_backend, owner_id);
        let volatile_store = VariableStorage::new(volatile_backend, owner_id);

        persistent_store.load_index(&mut index)?;
        persistent_store.reconcile(&mut index);

        Ok(Self {
            index,
            persistent_store,
            volatile_store,
            nv_limits: StoreLimits::default(),
            volatile_limits: StoreLimits::default(),
            boot_services_active: true,
            crypto: None,
            trust_anchor: None,
        })
    }

    /// Configures the limits of the class selected by the NV bit of
    /// `attributes`.
    pub fn set_storage_limits(
        &mut self,
        attributes: VariableAttributes,
        max_storage_size: usize,
        max_variable_size: usize,
    ) {
        let limits = StoreLimits {
            max_storage_size,
            max_variable_size,
        };
        if attributes.contains(VariableAttributes::NON_VOLATILE) {
            self.nv_limits = limits;
        } else {
            self.volatile_limits = limits;
        }
    }

    /// Injects the crypto capability that enables authenticated writes,
    /// optionally with an external trust-anchor certificate. Without a
    /// capability, authenticated writes fail with [`Status::UNSUPPORTED`].
    pub fn set_crypto(&mut self, crypto: &'a dyn CryptoOps, trust_anchor: Option<&'a [u8]>) {
        self.crypto = Some(crypto);
        self.trust_anchor = trust_anchor;
    }

    /// UID of the index slot holding the authoritative copy.
    #[must_use]
    pub fn active_index_uid(&self) -> Uid {
        self.persistent_store.active_index_uid()
    }

    /// Current value of the index persistence counter.
    #[must_use]
    pub fn index_counter(&self) -> u32 {
        self.index.counter()
    }

    /// Creates, replaces, appends to, or deletes a variable.
    pub fn set_variable(
        &mut self,
        guid: &Guid,
        name: &VariableName,
        attributes: VariableAttributes,
        data: &[u8],
    ) -> Result<()> {
        if !SUPPORTED_ATTRIBUTES.contains(attributes) {
            return Err(Error::from(Status::UNSUPPORTED));
        }
        if attributes.contains(VariableAttributes::RUNTIME_ACCESS)
            && !attributes.contains(VariableAttributes::BOOTSERVICE_ACCESS)
        {
            return Err(Error::from(Status::INVALID_PARAMETER));
        }
        if name.is_empty() {
            return Err(Error::from(Status::INVALID_PARAMETER));
        }

        let append = attributes.contains(VariableAttributes::APPEND_WRITE);
        let stored_attributes = attributes - VariableAttributes::APPEND_WRITE;
        let existing = self.index.find(guid, name);

        // Authenticated payloads carry a descriptor to strip and verify
        // before anything else looks at the data.
        let (payload, auth_state) = if attributes
            .contains(VariableAttributes::TIME_BASED_AUTHENTICATED_WRITE_ACCESS)
        {
            let crypto = self.crypto.ok_or_else(|| Error::from(Status::UNSUPPORTED))?;
            let prior = existing.and_then(|id| {
                let info = self.index.get(id);
                (info.is_variable_set
                    && info
                        .metadata
                        .attributes
                        .contains(VariableAttributes::TIME_BASED_AUTHENTICATED_WRITE_ACCESS))
                .then(|| PriorAuth {
                    timestamp: info.metadata.timestamp,
                    fingerprint: info.metadata.fingerprint,
                })
            });
            let verified = auth::verify_write(
                crypto,
                self.trust_anchor,
                guid,
                name,
                attributes,
                data,
                prior.as_ref(),
            )?;
            (
                verified.payload,
                Some((verified.timestamp, verified.fingerprint)),
            )
        } else {
            (data, None)
        };

        if let Some(id) = existing {
            let info = self.index.get(id);
            if info.is_constraints_set {
                check_constraints_on_set(&info.check_constraints, stored_attributes, payload.len())?;
            }
        }

        let set_entry = existing.filter(|&id| self.index.get(id).is_variable_set);
        let is_delete = payload.is_empty();

        match set_entry {
            Some(_) if is_delete && append => Ok(()),
            Some(id) if is_delete => self.delete_variable(id),
            Some(id) => {
                if self.index.get(id).metadata.attributes != stored_attributes {
                    return Err(Error::from(Status::INVALID_PARAMETER));
                }
                if append {
                    self.append_variable(id, payload, auth_state)
                } else {
                    self.replace_variable(id, payload, auth_state)
                }
            }
            None if is_delete => Err(Error::from(Status::NOT_FOUND)),
            None => self.create_variable(existing, guid, name, stored_attributes, payload, auth_state),
        }
    }

    /// Reads a variable's attributes and data into `data_buf`.
    ///
    /// On [`Status::BUFFER_TOO_SMALL`] the error payload carries the
    /// required size.
    pub fn get_variable(
        &self,
        guid: &Guid,
        name: &VariableName,
        data_buf: &mut [u8],
    ) -> Result<(VariableAttributes, usize), Option<usize>> {
        let id = self
            .index
            .find(guid, name)
            .ok_or_else(|| Error::new(Status::NOT_FOUND, None))?;
        let info = self.index.get(id);
        if !self.is_accessible(info) {
            return Err(Error::new(Status::NOT_FOUND, None));
        }

        let storage = self.storage_for(info.is_nv());
        let size = storage
            .object_size(info.metadata.uid)
            .map_err(|_| Error::new(Status::DEVICE_ERROR, None))?;
        if data_buf.len() < size {
            return Err(Error::new(Status::BUFFER_TOO_SMALL, Some(size)));
        }

        let read = storage
            .read_object(info.metadata.uid, &mut data_buf[..size])
            .map_err(|_| Error::new(Status::DEVICE_ERROR, None))?;
        Ok((info.metadata.attributes, read))
    }

    /// The enumeration step of GetNextVariableName.
    ///
    /// `name_buffer_size` is the caller's name buffer capacity in bytes; a
    /// name that does not fit yields [`Status::BUFFER_TOO_SMALL`] with the
    /// required size, without advancing the enumeration.
    pub fn get_next_variable_name(
        &self,
        guid: &Guid,
        name: &VariableName,
        name_buffer_size: usize,
    ) -> Result<(Guid, VariableName), Option<usize>> {
        let mut cursor = (*guid, *name);

        loop {
            let next = self
                .index
                .find_next(&cursor.0, &cursor.1)
                .map_err(|_| Error::new(Status::INVALID_PARAMETER, None))?;

            let Some(id) = next else {
                return Err(Error::new(Status::NOT_FOUND, None));
            };

            let info = self.index.get(id);
            if self.is_accessible(info) {
                let required = info.metadata.name.num_bytes();
                if required > name_buffer_size {
                    return Err(Error::new(Status::BUFFER_TOO_SMALL, Some(required)));
                }
                return Ok((info.metadata.guid, info.metadata.name));
            }

            cursor = (info.metadata.guid, info.metadata.name);
        }
    }

    /// Reports capacity, free space, and the per-variable limit of the
    /// class selected by the NV bit of `attributes`.
    pub fn query_variable_info(
        &self,
        attributes: VariableAttributes,
    ) -> Result<QueryVariableInfo> {
        let nv = attributes.contains(VariableAttributes::NON_VOLATILE);
        let limits = self.limits_for(nv);
        let used = self.class_used_size(nv)?;

        Ok(QueryVariableInfo {
            maximum_variable_storage_size: limits.max_storage_size as u64,
            remaining_variable_storage_size: limits.max_storage_size.saturating_sub(used) as u64,
            maximum_variable_size: limits.max_variable_size as u64,
            attributes,
        })
    }

    /// Ends the boot-services phase. Boot-only variables become invisible
    /// until the store is reinitialized after a power cycle.
    pub fn exit_boot_service(&mut self) -> Result<()> {
        if self.boot_services_active {
            log::info!("exiting boot services phase");
            self.boot_services_active = false;
        }
        Ok(())
    }

    /// Registers check-constraints for a variable that need not exist yet.
    pub fn set_var_check_property(
        &mut self,
        guid: &Guid,
        name: &VariableName,
        property: VarCheckVariableProperty,
    ) -> Result<()> {
        if property.revision != VAR_CHECK_PROPERTY_REVISION {
            return Err(Error::from(Status::INVALID_PARAMETER));
        }
        if name.is_empty() {
            return Err(Error::from(Status::INVALID_PARAMETER));
        }

        let (id, fresh_entry) = match self.index.find(guid, name) {
            Some(id) => (id, false),
            None => {
                let id = self
                    .index
                    .add_entry(guid, name)
                    .map_err(|_| Error::from(Status::OUT_OF_RESOURCES))?;
                (id, true)
            }
        };

        let snapshot = *self.index.get(id);
        self.index.set_constraints(id, property);

        if let Err(e) = self.persistent_store.commit_index(&mut self.index) {
            if fresh_entry {
                self.index.discard_entry(id);
            } else {
                self.index.revert_entry(id, snapshot);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Reads the check-constraints registered for a variable.
    pub fn get_var_check_property(
        &self,
        guid: &Guid,
        name: &VariableName,
    ) -> Result<VarCheckVariableProperty> {
        let id = self
            .index
            .find(guid, name)
            .ok_or_else(|| Error::from(Status::NOT_FOUND))?;
        let info = self.index.get(id);
        if !info.is_constraints_set {
            return Err(Error::from(Status::NOT_FOUND));
        }
        Ok(info.check_constraints)
    }

    /// The access-mode filter: whether a variable is visible to reads and
    /// enumeration in the current phase.
    fn is_accessible(&self, info: &VariableInfo) -> bool {
        let attributes = info.metadata.attributes;
        info.is_variable_set
            && if self.boot_services_active {
                attributes.contains(VariableAttributes::BOOTSERVICE_ACCESS)
            } else {
                attributes.contains(VariableAttributes::RUNTIME_ACCESS)
            }
    }

    fn storage_for(&self, nv: bool) -> &VariableStorage<'a> {
        if nv {
            &self.persistent_store
        } else {
            &self.volatile_store
        }
    }

    fn storage_for_mut(&mut self, nv: bool) -> &mut VariableStorage<'a> {
        if nv {
            &mut self.persistent_store
        } else {
            &mut self.volatile_store
        }
    }

    fn limits_for(&self, nv: bool) -> &StoreLimits {
        if nv {
            &self.nv_limits
        } else {
            &self.volatile_limits
        }
    }

    /// Bytes of variable data currently stored for one class. Derived on
    /// demand from the object sizes, never cached.
    fn class_used_size(&self, nv: bool) -> Result<usize> {
        let storage = self.storage_for(nv);
        let mut used = 0usize;
        for info in self.index.iter() {
            if !info.is_variable_set || info.is_nv() != nv {
                continue;
            }
            used += storage
                .object_size(info.metadata.uid)
                .map_err(|_| Error::from(Status::DEVICE_ERROR))?;
        }
        Ok(used)
    }

    /// Checks that a write of `new_size` bytes (replacing `replaced_size`
    /// stored bytes) fits the class limits.
    fn check_capacity(
        &self,
        nv: bool,
        new_size: usize,
        replaced_size: usize,
    ) -> Result<()> {
        let limits = self.limits_for(nv);
        if new_size > limits.max_variable_size {
            return Err(Error::from(Status::OUT_OF_RESOURCES));
        }
        let used = self.class_used_size(nv)?;
        if used.saturating_sub(replaced_size) + new_size > limits.max_storage_size {
            return Err(Error::from(Status::OUT_OF_RESOURCES));
        }
        Ok(())
    }

    fn delete_variable(&mut self, id: EntryId) -> Result<()> {
        let snapshot = *self.index.get(id);
        let nv = snapshot.is_nv();
        let uid = snapshot.metadata.uid;

        // Index first, object second: a crash in between leaves a stray
        // object that reconciliation ignores, never a resurrected variable.
        self.index.clear_variable(id);
        if nv {
            if let Err(e) = self.persistent_store.commit_index(&mut self.index) {
                self.index.revert_entry(id, snapshot);
                return Err(e);
            }
        }

        if let Err(e) = self.storage_for_mut(nv).remove_object(uid) {
            if e != StorageError::DoesNotExist {
                log::warn!("removing data object {uid:#x} failed; object is now stray");
            }
        }
        self.index.remove_unused_entry(id);
        Ok(())
    }

    fn append_variable(
        &mut self,
        id: EntryId,
        payload: &[u8],
        auth_state: Option<(Time, [u8; FINGERPRINT_SIZE])>,
    ) -> Result<()> {
        let snapshot = *self.index.get(id);
        let nv = snapshot.is_nv();
        let uid = snapshot.metadata.uid;

        let storage = self.storage_for(nv);
        let old_size = storage
            .object_size(uid)
            .map_err(|_| Error::from(Status::DEVICE_ERROR))?;
        let new_size = old_size
            .checked_add(payload.len())
            .ok_or_else(|| Error::from(Status::OUT_OF_RESOURCES))?;
        self.check_capacity(nv, new_size, old_size)?;

        let mut contents = vec![0u8; new_size];
        storage
            .read_object(uid, &mut contents[..old_size])
            .map_err(|_| Error::from(Status::DEVICE_ERROR))?;
        contents[old_size..].copy_from_slice(payload);

        self.storage_for_mut(nv)
            .write_object(uid, &contents)
            .map_err(|e| Error::from(e.status()))?;

        self.finish_write(id, snapshot, snapshot.metadata.attributes, auth_state)
    }

    fn replace_variable(
        &mut self,
        id: EntryId,
        payload: &[u8],
        auth_state: Option<(Time, [u8; FINGERPRINT_SIZE])>,
    ) -> Result<()> {
        let snapshot = *self.index.get(id);
        let nv = snapshot.is_nv();
        let uid = snapshot.metadata.uid;

        let old_size = self
            .storage_for(nv)
            .object_size(uid)
            .map_err(|_| Error::from(Status::DEVICE_ERROR))?;
        self.check_capacity(nv, payload.len(), old_size)?;

        self.storage_for_mut(nv)
            .write_object(uid, payload)
            .map_err(|e| Error::from(e.status()))?;

        self.finish_write(id, snapshot, snapshot.metadata.attributes, auth_state)
    }

    fn create_variable(
        &mut self,
        constraints_entry: Option<EntryId>,
        guid: &Guid,
        name: &VariableName,
        attributes: VariableAttributes,
        payload: &[u8],
        auth_state: Option<(Time, [u8; FINGERPRINT_SIZE])>,
    ) -> Result<()> {
        let nv = attributes.contains(VariableAttributes::NON_VOLATILE);
        self.check_capacity(nv, payload.len(), 0)?;

        let (id, fresh_entry) = match constraints_entry {
            Some(id) => (id, false),
            None => {
                let id = self
                    .index
                    .add_entry(guid, name)
                    .map_err(|_| Error::from(Status::OUT_OF_RESOURCES))?;
                (id, true)
            }
        };
        let snapshot = *self.index.get(id);
        let uid = snapshot.metadata.uid;

        if let Err(e) = self.storage_for_mut(nv).write_object(uid, payload) {
            if fresh_entry {
                self.index.discard_entry(id);
            }
            return Err(Error::from(e.status()));
        }

        if let Err(e) = self.finish_write(id, snapshot, attributes, auth_state) {
            if fresh_entry {
                self.index.discard_entry(id);
            }
            let _ = self.storage_for_mut(nv).remove_object(uid);
            return Err(e);
        }
        Ok(())
    }

    /// Applies the index mutation of a successful data write and commits.
    /// A failed commit restores `snapshot` and surfaces the error.
    fn finish_write(
        &mut self,
        id: EntryId,
        snapshot: VariableInfo,
        attributes: VariableAttributes,
        auth_state: Option<(Time, [u8; FINGERPRINT_SIZE])>,
    ) -> Result<()> {
        self.index.set_variable(id, attributes);
        if let Some((timestamp, fingerprint)) = auth_state {
            self.index.record_authentication(id, timestamp, fingerprint);
        }

        if let Err(e) = self.persistent_store.commit_index(&mut self.index) {
            self.index.revert_entry(id, snapshot);
            return Err(e);
        }
        Ok(())
    }
}

/// Validates a write against registered check-constraints. A zero
/// `data_size` means deletion.
fn check_constraints_on_set(
    constraints: &VarCheckVariableProperty,
    attributes: VariableAttributes,
    data_size: usize,
) -> Result<()> {
    if constraints.property.contains(VarCheckProperty::READ_ONLY) {
        return Err(Error::from(Status::WRITE_PROTECTED));
    }

    if !constraints.attributes.is_empty() && !attributes.contains(constraints.attributes) {
        return Err(Error::from(Status::INVALID_PARAMETER));
    }

    if data_size == 0 {
        // Deletion; blocked only when the constraints pin a minimum size.
        if constraints.min_size > 0 {
            return Err(Error::from(Status::INVALID_PARAMETER));
        }
        return Ok(());
    }

    if (data_size as u64) < constraints.min_size || (data_size as u64) > constraints.max_size {
        return Err(Error::from(Status::INVALID_PARAMETER));
    }
    Ok(())
}
