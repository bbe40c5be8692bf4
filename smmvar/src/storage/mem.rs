// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ObjectInfo, StorageBackend, StorageError, StorageResult, Uid};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

#[derive(Debug, Default)]
struct MemObject {
    capacity: usize,
    data: Vec<u8>,
}

/// An in-memory [`StorageBackend`].
///
/// Serves as the volatile variable store and as a stand-in for a persistent
/// backend in tests, where "persistence" is the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemStore {
    objects: BTreeMap<(u32, Uid), MemObject>,
}

impl MemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every stored object.
    pub fn reset(&mut self) {
        self.objects.clear();
    }
}

impl StorageBackend for MemStore {
    fn create(&mut self, owner_id: u32, uid: Uid, capacity: usize) -> StorageResult<()> {
        if self.objects.contains_key(&(owner_id, uid)) {
            return Err(StorageError::InvalidArgument);
        }
        self.objects.insert(
            (owner_id, uid),
            MemObject {
                capacity,
                data: Vec::new(),
            },
        );
        Ok(())
    }

    fn set(&mut self, owner_id: u32, uid: Uid, data: &[u8]) -> StorageResult<()> {
        let object = self.objects.entry((owner_id, uid)).or_default();
        object.data = data.to_vec();
        object.capacity = object.capacity.max(data.len());
        Ok(())
    }

    fn get(
        &self,
        owner_id: u32,
        uid: Uid,
        offset: usize,
        buf: &mut [u8],
    ) -> StorageResult<usize> {
        let object = self
            .objects
            .get(&(owner_id, uid))
            .ok_or(StorageError::DoesNotExist)?;
        if offset > object.data.len() {
            return Err(StorageError::InvalidArgument);
        }

        let available = &object.data[offset..];
        let len = available.len().min(buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        Ok(len)
    }

    fn get_info(&self, owner_id: u32, uid: Uid) -> StorageResult<ObjectInfo> {
        let object = self
            .objects
            .get(&(owner_id, uid))
            .ok_or(StorageError::DoesNotExist)?;
        Ok(ObjectInfo {
            size: object.data.len(),
            capacity: object.capacity,
        })
    }

    fn remove(&mut self, owner_id: u32, uid: Uid) -> StorageResult<()> {
        self.objects
            .remove(&(owner_id, uid))
            .map(|_| ())
            .ok_or(StorageError::DoesNotExist)
    }
}
