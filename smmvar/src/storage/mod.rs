// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage for variable data and the persisted index.
//!
//! The service stores everything through the [`StorageBackend`] key/value
//! contract; [`MemStore`] implements it in memory and backs the volatile
//! store, while a deployment provides a flash- or RPMB-backed implementation
//! for the non-volatile store. [`VariableStorage`] layers the per-variable
//! object operations and the A/B index persistence scheme on top of a
//! backend.

mod backend;
mod mem;
mod persistent;

pub use backend::{ObjectInfo, StorageBackend, StorageError, StorageResult, Uid};
pub use mem::MemStore;
pub use persistent::{VariableStorage, INDEX_A_UID, INDEX_B_UID};
