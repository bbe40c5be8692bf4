// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secure-partition implementation of the UEFI SMM variable service.
//!
//! This crate implements the service side of the UEFI runtime variable
//! interface as deployed in a trusted execution environment: a normal-world
//! client (typically UEFI firmware) sends framed requests over a
//! message-routed transport, and the service applies UEFI semantics before
//! touching a secure storage backend.
//!
//! # Structure
//!
//! - [`index`] — the in-memory catalog of known variables and their
//!   metadata and check-constraints, including the serialized form used for
//!   A/B persistence.
//! - [`storage`] — the key/value backend contract, an in-memory
//!   implementation, and the persistence layer that arbitrates between the
//!   two index copies and reconciles the index with stored objects.
//! - [`store`] — the UEFI variable store: attribute and access enforcement,
//!   append semantics, storage accounting, and commit with rollback.
//! - [`auth`] — verification of time-based authenticated writes through an
//!   injected crypto capability.
//! - [`service`] — the per-opcode request handlers and the Management Mode
//!   frontend.
//!
//! # Concurrency
//!
//! The partition processes one request at a time to completion; nothing in
//! this crate locks, and every request handler takes the service by mutable
//! reference.
//!
//! Wire-level types live in the [`smmvar_raw`] crate and are re-exported
//! where they are part of this crate's API.

#![no_std]
#![deny(
    clippy::all,
    clippy::ptr_as_ptr,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unused
)]

extern crate alloc;

pub mod auth;
pub mod index;
pub mod name;
pub mod service;
pub mod storage;
pub mod store;

mod result;

pub use name::VariableName;
pub use result::{Error, Result, ResultExt};
pub use smmvar_raw::{guid, Guid, Status};
