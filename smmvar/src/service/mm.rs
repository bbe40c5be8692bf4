// SPDX-License-Identifier: MIT OR Apache-2.0

//! Management Mode frontend.
//!
//! A communicate buffer carries `function:u64 ∥ return_status:u64 ∥ payload`.
//! This frontend validates the frame, dispatches the payload to the service,
//! writes the UEFI status back into the header, and reports the transport
//! outcome as an [`MmReturnCode`]. Request and reply share the buffer, as
//! the MM communication protocol requires.

use super::SmmVariableService;
use alloc::vec::Vec;
use smmvar_raw::comms::COMMUNICATE_HEADER_SIZE;
use smmvar_raw::{FunctionId, MmReturnCode};

/// Handles one message in `buffer`, of which the first `request_len` bytes
/// are valid request data. Returns the transport return code and the total
/// length of the reply in the buffer.
pub fn handle_communicate(
    service: &mut SmmVariableService<'_>,
    buffer: &mut [u8],
    request_len: usize,
) -> (MmReturnCode, usize) {
    if request_len < COMMUNICATE_HEADER_SIZE || request_len > buffer.len() {
        return (MmReturnCode::DENIED, 0);
    }

    let function = FunctionId(u64::from_le_bytes(buffer[0..8].try_into().unwrap()));

    // The reply is built in place over the request, so the payload is
    // detached first.
    let request: Vec<u8> = buffer[COMMUNICATE_HEADER_SIZE..request_len].to_vec();
    let (status, response_len) = service.handle(
        function,
        &request,
        &mut buffer[COMMUNICATE_HEADER_SIZE..],
    );

    buffer[8..16].copy_from_slice(&status.0.to_le_bytes());

    let Some(total_len) = COMMUNICATE_HEADER_SIZE.checked_add(response_len) else {
        return (MmReturnCode::NO_MEMORY, 0);
    };
    if total_len > buffer.len() {
        return (MmReturnCode::NO_MEMORY, 0);
    }
    (MmReturnCode::SUCCESS, total_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStore;
    use crate::store::UefiVariableStore;
    use alloc::vec;
    use smmvar_raw::Status;

    const OWNER: u32 = 100;

    #[test]
    fn short_frame_is_denied() {
        let mut persistent = MemStore::new();
        let mut volatile = MemStore::new();
        let store = UefiVariableStore::init(OWNER, 5, &mut persistent, &mut volatile).unwrap();
        let mut service = SmmVariableService::new(store, 1024);

        let mut buffer = [0u8; 64];
        let (code, len) = handle_communicate(&mut service, &mut buffer, 8);
        assert_eq!(code, MmReturnCode::DENIED);
        assert_eq!(len, 0);
    }

    #[test]
    fn unknown_function_reports_unsupported_status() {
        let mut persistent = MemStore::new();
        let mut volatile = MemStore::new();
        let store = UefiVariableStore::init(OWNER, 5, &mut persistent, &mut volatile).unwrap();
        let mut service = SmmVariableService::new(store, 1024);

        let mut buffer = vec![0u8; 64];
        buffer[0..8].copy_from_slice(&0xDEAD_u64.to_le_bytes());

        let buffer_len = buffer.len();
        let (code, len) = handle_communicate(&mut service, &mut buffer, buffer_len);
        assert_eq!(code, MmReturnCode::SUCCESS);
        assert_eq!(len, COMMUNICATE_HEADER_SIZE);

        let status = u64::from_le_bytes(buffer[8..16].try_into().unwrap());
        assert_eq!(Status(status), Status::UNSUPPORTED);
    }
}
