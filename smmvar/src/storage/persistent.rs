// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{StorageBackend, StorageError, StorageResult, Uid};
use crate::index::VariableIndex;
use crate::{Error, Result};
use alloc::vec;
use alloc::vec::Vec;
use smmvar_raw::Status;

/// UID of the first index slot.
pub const INDEX_A_UID: Uid = 0x8000_0000_0000_0001;

/// UID of the second index slot.
pub const INDEX_B_UID: Uid = 0x8000_0000_0000_0002;

/// A storage backend bound to one owner, with the variable-object operations
/// and the double-buffered index persistence layered on top.
///
/// The store uses one instance per backend. Only the non-volatile instance
/// exercises the index operations; variable UIDs are allocated below the
/// reserved index UIDs, so the namespaces never collide.
pub struct VariableStorage<'a> {
    backend: &'a mut dyn StorageBackend,
    owner_id: u32,
    active_index_uid: Uid,
}

impl core::fmt::Debug for VariableStorage<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VariableStorage")
            .field("owner_id", &self.owner_id)
            .field("active_index_uid", &self.active_index_uid)
            .finish_non_exhaustive()
    }
}

impl<'a> VariableStorage<'a> {
    /// Binds `backend` to `owner_id`.
    pub fn new(backend: &'a mut dyn StorageBackend, owner_id: u32) -> Self {
        Self {
            backend,
            owner_id,
            active_index_uid: INDEX_A_UID,
        }
    }

    /// UID of the index slot that holds the authoritative copy.
    #[must_use]
    pub const fn active_index_uid(&self) -> Uid {
        self.active_index_uid
    }

    /// Writes a variable data object.
    pub fn write_object(&mut self, uid: Uid, data: &[u8]) -> StorageResult<()> {
        self.backend.set(self.owner_id, uid, data)
    }

    /// Reads a variable data object into `buf` and returns the bytes read.
    pub fn read_object(&self, uid: Uid, buf: &mut [u8]) -> StorageResult<usize> {
        self.backend.get(self.owner_id, uid, 0, buf)
    }

    /// Current size of a variable data object.
    pub fn object_size(&self, uid: Uid) -> StorageResult<usize> {
        Ok(self.backend.get_info(self.owner_id, uid)?.size)
    }

    /// Removes a variable data object.
    pub fn remove_object(&mut self, uid: Uid) -> StorageResult<()> {
        self.backend.remove(self.owner_id, uid)
    }

    /// Loads the authoritative index copy into `index`.
    ///
    /// Both slots are read; a slot that is absent or zero-length does not
    /// count. With both slots present the counters decide: B wins iff its
    /// counter is exactly one ahead of A's, modulo 2³². Equal counters leave
    /// no way to tell which copy survived a torn commit, so initialization
    /// fails with [`Status::LOAD_ERROR`].
    pub fn load_index(&mut self, index: &mut VariableIndex) -> Result<()> {
        let image_a = self.read_index_image(INDEX_A_UID)?;
        let image_b = self.read_index_image(INDEX_B_UID)?;

        let (image, active_uid) = match (&image_a, &image_b) {
            (None, None) => {
                log::info!("no variable index found; starting empty");
                self.active_index_uid = INDEX_A_UID;
                return Ok(());
            }
            (Some(a), None) => (a, INDEX_A_UID),
            (None, Some(b)) => (b, INDEX_B_UID),
            (Some(a), Some(b)) => {
                let counter_a = u32::from_le_bytes(a[0..4].try_into().unwrap());
                let counter_b = u32::from_le_bytes(b[0..4].try_into().unwrap());
                if counter_a == counter_b {
                    log::error!(
                        "both index copies carry counter {counter_a}; refusing to guess"
                    );
                    return Err(Error::from(Status::LOAD_ERROR));
                }
                if counter_b.wrapping_sub(counter_a) == 1 {
                    (b, INDEX_B_UID)
                } else {
                    (a, INDEX_A_UID)
                }
            }
        };

        index.restore(image);
        self.active_index_uid = active_uid;
        log::info!(
            "loaded variable index from slot {:#x}, counter {}",
            active_uid,
            index.counter()
        );
        Ok(())
    }

    /// Persists the index if it has NV-visible changes.
    ///
    /// The image is serialized with the incremented counter into the slot
    /// that is currently inactive; only after the backend accepts it does
    /// the active slot flip. On failure the previous copy stays
    /// authoritative and the index remains dirty.
    pub fn commit_index(&mut self, index: &mut VariableIndex) -> Result<()> {
        if !index.is_dirty() {
            return Ok(());
        }

        let inactive_uid = if self.active_index_uid == INDEX_A_UID {
            INDEX_B_UID
        } else {
            INDEX_A_UID
        };

        let previous_counter = index.counter();
        index.set_counter(previous_counter.wrapping_add(1));

        let mut image = vec![0u8; index.max_dump_size()];
        let written = match index.dump(&mut image) {
            Ok((written, _)) => written,
            Err(_) => {
                // Cannot happen with a max-size buffer, but never leave the
                // counter advanced past the persisted copy.
                index.set_counter(previous_counter);
                return Err(Error::from(Status::DEVICE_ERROR));
            }
        };

        if let Err(e) = self.backend.set(self.owner_id, inactive_uid, &image[..written]) {
            log::error!("variable index commit to slot {inactive_uid:#x} failed");
            index.set_counter(previous_counter);
            index.mark_dirty();
            return Err(Error::from(e.status()));
        }

        self.active_index_uid = inactive_uid;
        Ok(())
    }

    /// Clears index entries whose data object is gone.
    ///
    /// A crash between an index commit and the corresponding data write
    /// leaves an entry that points at nothing; such entries are dropped so
    /// the variable reads as absent. The repaired index is persisted by the
    /// next commit.
    pub fn reconcile(&self, index: &mut VariableIndex) {
        let ids: Vec<_> = index.entry_ids().collect();
        for id in ids {
            let info = index.get(id);
            if !info.is_variable_set || !info.is_nv() {
                continue;
            }
            if self.object_size(info.metadata.uid) == Err(StorageError::DoesNotExist) {
                log::warn!(
                    "variable '{}' is indexed but has no stored object; dropping",
                    info.metadata.name
                );
                index.clear_variable(id);
                index.remove_unused_entry(id);
            }
        }
    }

    fn read_index_image(&self, uid: Uid) -> Result<Option<Vec<u8>>> {
        let info = match self.backend.get_info(self.owner_id, uid) {
            Ok(info) => info,
            Err(StorageError::DoesNotExist) => return Ok(None),
            Err(e) => return Err(Error::from(e.status())),
        };
        // A slot that was created but never written is as good as absent,
        // and a slot shorter than the counter cannot be arbitrated.
        if info.size < 4 {
            return Ok(None);
        }

        let mut image = vec![0u8; info.size];
        match self.backend.get(self.owner_id, uid, 0, &mut image) {
            Ok(read) => {
                image.truncate(read);
                Ok(Some(image))
            }
            Err(e) => Err(Error::from(e.status())),
        }
    }
}
