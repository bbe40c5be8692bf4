// SPDX-License-Identifier: MIT OR Apache-2.0

use smmvar_raw::Status;

/// Identifier of a stored object within one owner's namespace.
pub type Uid = u64;

/// Errors surfaced by a storage backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// No object exists for the given UID.
    DoesNotExist,
    /// The backend cannot hold the object.
    InsufficientSpace,
    /// The operation arguments are not acceptable to the backend.
    InvalidArgument,
    /// The backing medium failed.
    StorageFailure,
}

impl StorageError {
    /// The UEFI status this backend error surfaces as.
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::DoesNotExist => Status::NOT_FOUND,
            Self::InsufficientSpace => Status::OUT_OF_RESOURCES,
            Self::InvalidArgument => Status::INVALID_PARAMETER,
            Self::StorageFailure => Status::DEVICE_ERROR,
        }
    }
}

/// Result alias for backend operations.
pub type StorageResult<T> = core::result::Result<T, StorageError>;

/// Size information about a stored object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Current size of the object contents in bytes.
    pub size: usize,
    /// Reserved capacity in bytes; at least `size`.
    pub capacity: usize,
}

/// A key/value store keyed by `(owner_id, uid)`.
///
/// Replacement through [`set`] must be atomic per UID: after a crash a
/// reader observes either the previous or the new contents, never a mix.
/// This is the property the A/B index persistence builds on.
///
/// [`set`]: Self::set
pub trait StorageBackend {
    /// Reserves an object of the given capacity with zero-length contents.
    ///
    /// Fails with [`StorageError::InvalidArgument`] if the object already
    /// exists.
    fn create(&mut self, owner_id: u32, uid: Uid, capacity: usize) -> StorageResult<()>;

    /// Creates the object if needed and atomically replaces its contents.
    fn set(&mut self, owner_id: u32, uid: Uid, data: &[u8]) -> StorageResult<()>;

    /// Reads from the object starting at `offset` into `buf`, returning the
    /// number of bytes read.
    fn get(&self, owner_id: u32, uid: Uid, offset: usize, buf: &mut [u8])
        -> StorageResult<usize>;

    /// Reports the size of an object.
    fn get_info(&self, owner_id: u32, uid: Uid) -> StorageResult<ObjectInfo>;

    /// Removes the object.
    fn remove(&mut self, owner_id: u32, uid: Uid) -> StorageResult<()>;
}
