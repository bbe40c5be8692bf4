// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw wire-ABI types for the SMM variable service.
//!
//! This crate defines the data that crosses the boundary between a
//! normal-world client (typically UEFI firmware) and the secure-world
//! variable service: function identifiers, the SMM communicate structures,
//! variable attributes, UEFI status codes, and the authenticated-variable
//! descriptors.
//!
//! Everything here is policy-free. Multi-byte fields are little-endian on the
//! wire; structures with variable-length tails are parsed and emitted
//! explicitly from byte slices instead of being cast from raw pointers, so
//! malformed frames surface as errors rather than undefined behavior.
//!
//! For the service implementation built on top of these types, see the
//! `smmvar` crate.

#![no_std]
#![deny(
    clippy::all,
    clippy::must_use_candidate,
    clippy::ptr_as_ptr,
    missing_debug_implementations,
    missing_docs,
    unused
)]

#[macro_use]
mod enums;

pub mod auth;
pub mod comms;
pub mod time;
pub mod variable;

mod status;

pub use status::Status;
pub use uguid::{guid, Guid};

newtype_enum! {
/// Function identifiers of the SMM variable service.
///
/// The numeric values are fixed by the UEFI MM variable ABI and must not be
/// renumbered.
#[must_use]
pub enum FunctionId: u64 => {
    /// Read a variable's attributes and data.
    GET_VARIABLE            = 1,
    /// Enumerate the next visible variable name.
    GET_NEXT_VARIABLE_NAME  = 2,
    /// Create, replace, append to, or delete a variable.
    SET_VARIABLE            = 3,
    /// Query storage capacity and limits for a variable class.
    QUERY_VARIABLE_INFO     = 4,
    /// Signal that the platform is about to boot an OS loader.
    READY_TO_BOOT           = 5,
    /// Signal the end of the boot-services phase.
    EXIT_BOOT_SERVICE       = 6,
    /// Read the check-constraints registered for a variable.
    GET_VAR_CHECK_PROPERTY  = 7,
    /// Register check-constraints for a variable.
    SET_VAR_CHECK_PROPERTY  = 8,
    /// Query the largest payload a single request may carry.
    GET_PAYLOAD_SIZE        = 9,
}}

newtype_enum! {
/// Return codes of the Management Mode transport (DEN0060A convention).
///
/// These travel in the transport layer, not in the UEFI `ReturnStatus` field;
/// the service maps its outcome onto them at the MM boundary.
#[must_use]
pub enum MmReturnCode: i64 => {
    /// The message was delivered and a reply was produced.
    SUCCESS           = 0,
    /// The function or service is not supported.
    NOT_SUPPORTED     = -1,
    /// The message was malformed.
    INVALID_PARAMETER = -2,
    /// The message was rejected before reaching a service.
    DENIED            = -3,
    /// The reply does not fit into the communication buffer.
    NO_MEMORY         = -5,
}}

/// GUID identifying the SMM variable service on the message transport.
pub const SMM_VARIABLE_GUID: Guid = guid!("ed32d533-99e6-4209-9cc0-2d72cdd998a7");
