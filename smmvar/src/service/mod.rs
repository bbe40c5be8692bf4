// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers of the SMM variable service.
//!
//! [`SmmVariableService`] decodes one request per call: it validates every
//! caller-supplied length against the framed request, copies the UCS-2 name
//! into a bounded buffer, invokes the store, and serializes the reply. The
//! UEFI status of the operation is the return value; transport concerns live
//! in the [`mm`] frontend.

use crate::name::VariableName;
use crate::store::UefiVariableStore;
use crate::ResultExt;
use smmvar_raw::comms::{
    AccessVariable, CheckVariableProperty, NextVariableName, PayloadSize, QueryVariableInfo,
};
use smmvar_raw::{FunctionId, Status};

pub mod mm;

/// The service endpoint: owns the store and dispatches by function id.
#[derive(Debug)]
pub struct SmmVariableService<'a> {
    store: UefiVariableStore<'a>,
    max_payload_size: usize,
}

impl<'a> SmmVariableService<'a> {
    /// Wraps a store. `max_payload_size` is the largest request payload the
    /// transport can carry; it is reported through `GET_PAYLOAD_SIZE`.
    pub fn new(store: UefiVariableStore<'a>, max_payload_size: usize) -> Self {
        Self {
            store,
            max_payload_size,
        }
    }

    /// The wrapped store.
    #[must_use]
    pub fn store(&self) -> &UefiVariableStore<'a> {
        &self.store
    }

    /// Mutable access to the wrapped store, for configuration.
    pub fn store_mut(&mut self) -> &mut UefiVariableStore<'a> {
        &mut self.store
    }

    /// Handles one decoded request and writes the reply into `response`.
    /// Returns the UEFI status and the number of response bytes produced.
    pub fn handle(
        &mut self,
        function: FunctionId,
        request: &[u8],
        response: &mut [u8],
    ) -> (Status, usize) {
        match function {
            FunctionId::GET_VARIABLE => self.get_variable(request, response),
            FunctionId::GET_NEXT_VARIABLE_NAME => self.get_next_variable_name(request, response),
            FunctionId::SET_VARIABLE => self.set_variable(request),
            FunctionId::QUERY_VARIABLE_INFO => self.query_variable_info(request, response),
            FunctionId::EXIT_BOOT_SERVICE => (self.store.exit_boot_service().status(), 0),
            FunctionId::GET_VAR_CHECK_PROPERTY => self.get_var_check_property(request, response),
            FunctionId::SET_VAR_CHECK_PROPERTY => self.set_var_check_property(request),
            FunctionId::GET_PAYLOAD_SIZE => self.get_payload_size(response),
            _ => {
                log::warn!("unsupported function {function:?}");
                (Status::UNSUPPORTED, 0)
            }
        }
    }

    fn get_variable(&self, request: &[u8], response: &mut [u8]) -> (Status, usize) {
        let Some((header, name)) = parse_access_header(request) else {
            return (Status::INVALID_PARAMETER, 0);
        };
        let data_offset = AccessVariable::NAME_OFFSET + name.num_bytes();
        if response.len() < data_offset {
            return (Status::BAD_BUFFER_SIZE, 0);
        }

        // The caller's buffer limit, additionally clamped to the response
        // buffer that actually carries the data back.
        let caller_limit = usize::try_from(header.data_size).unwrap_or(usize::MAX);
        let capacity = caller_limit.min(response.len() - data_offset);

        let mut reply = header;
        let (status, response_len) =
            match self
                .store
                .get_variable(&header.guid, &name, &mut response[data_offset..][..capacity])
            {
                Ok((attributes, data_size)) => {
                    reply.attributes = attributes;
                    reply.data_size = data_size as u64;
                    (Status::SUCCESS, data_offset + data_size)
                }
                Err(e) => {
                    if let Some(required) = e.data() {
                        reply.data_size = *required as u64;
                    }
                    (e.status(), data_offset)
                }
            };

        if status != Status::SUCCESS && status != Status::BUFFER_TOO_SMALL {
            return (status, 0);
        }

        reply.emit(response);
        name.emit(&mut response[AccessVariable::NAME_OFFSET..data_offset]);
        (status, response_len)
    }

    fn set_variable(&mut self, request: &[u8]) -> (Status, usize) {
        let Some((header, name)) = parse_access_header(request) else {
            return (Status::INVALID_PARAMETER, 0);
        };
        let data_offset = AccessVariable::NAME_OFFSET + name.num_bytes();

        let Some(total) = header.total_size() else {
            return (Status::INVALID_PARAMETER, 0);
        };
        if total > request.len() {
            return (Status::INVALID_PARAMETER, 0);
        }
        let data = &request[data_offset..total];

        let status = self
            .store
            .set_variable(&header.guid, &name, header.attributes, data)
            .status();
        (status, 0)
    }

    fn get_next_variable_name(&self, request: &[u8], response: &mut [u8]) -> (Status, usize) {
        let Some(header) = NextVariableName::parse(request) else {
            return (Status::INVALID_PARAMETER, 0);
        };

        // The name buffer is `name_size` bytes of which only the portion up
        // to the NUL terminator is the cursor name.
        let buffer_size = usize::try_from(header.name_size).unwrap_or(usize::MAX);
        let available = request.len() - NextVariableName::NAME_OFFSET;
        let in_buf = &request[NextVariableName::NAME_OFFSET..][..buffer_size.min(available)];
        let Some(name) = parse_name_in_buffer(in_buf) else {
            return (Status::INVALID_PARAMETER, 0);
        };

        if response.len() < NextVariableName::NAME_OFFSET {
            return (Status::BAD_BUFFER_SIZE, 0);
        }
        let capacity = buffer_size.min(response.len() - NextVariableName::NAME_OFFSET);

        let mut reply = header;
        match self
            .store
            .get_next_variable_name(&header.guid, &name, capacity)
        {
            Ok((guid, next_name)) => {
                reply.guid = guid;
                reply.name_size = next_name.num_bytes() as u64;
                reply.emit(response);
                next_name.emit(&mut response[NextVariableName::NAME_OFFSET..]);
                (
                    Status::SUCCESS,
                    NextVariableName::NAME_OFFSET + next_name.num_bytes(),
                )
            }
            Err(e) => match *e.data() {
                Some(required) => {
                    reply.name_size = required as u64;
                    reply.emit(response);
                    (e.status(), NextVariableName::NAME_OFFSET)
                }
                None => (e.status(), 0),
            },
        }
    }

    fn query_variable_info(&self, request: &[u8], response: &mut [u8]) -> (Status, usize) {
        let Some(query) = QueryVariableInfo::parse(request) else {
            return (Status::INVALID_PARAMETER, 0);
        };
        if response.len() < QueryVariableInfo::ENCODED_SIZE {
            return (Status::BAD_BUFFER_SIZE, 0);
        }

        match self.store.query_variable_info(query.attributes) {
            Ok(info) => {
                info.emit(response);
                (Status::SUCCESS, QueryVariableInfo::ENCODED_SIZE)
            }
            Err(e) => (e.status(), 0),
        }
    }

    fn set_var_check_property(&mut self, request: &[u8]) -> (Status, usize) {
        let Some((header, name)) = parse_check_property_header(request) else {
            return (Status::INVALID_PARAMETER, 0);
        };

        let status = self
            .store
            .set_var_check_property(&header.guid, &name, header.property)
            .status();
        (status, 0)
    }

    fn get_var_check_property(&self, request: &[u8], response: &mut [u8]) -> (Status, usize) {
        let Some((header, name)) = parse_check_property_header(request) else {
            return (Status::INVALID_PARAMETER, 0);
        };
        let total = CheckVariableProperty::NAME_OFFSET + name.num_bytes();
        if response.len() < total {
            return (Status::BAD_BUFFER_SIZE, 0);
        }

        match self.store.get_var_check_property(&header.guid, &name) {
            Ok(property) => {
                let mut reply = header;
                reply.property = property;
                reply.emit(response);
                name.emit(&mut response[CheckVariableProperty::NAME_OFFSET..total]);
                (Status::SUCCESS, total)
            }
            Err(e) => (e.status(), 0),
        }
    }

    fn get_payload_size(&self, response: &mut [u8]) -> (Status, usize) {
        if response.len() < PayloadSize::ENCODED_SIZE {
            return (Status::BAD_BUFFER_SIZE, 0);
        }
        PayloadSize {
            size: self.max_payload_size as u64,
        }
        .emit(response);
        (Status::SUCCESS, PayloadSize::ENCODED_SIZE)
    }
}

/// Parses the access-variable header and its strictly terminated name from
/// a request. Returns `None` for any size inconsistency.
fn parse_access_header(request: &[u8]) -> Option<(AccessVariable, VariableName)> {
    let header = AccessVariable::parse(request)?;
    let name_end = header.data_offset()?;
    if name_end > request.len() {
        return None;
    }
    let name =
        VariableName::from_bytes_with_nul(&request[AccessVariable::NAME_OFFSET..name_end]).ok()?;
    Some((header, name))
}

/// Parses the check-property header and its strictly terminated name.
fn parse_check_property_header(request: &[u8]) -> Option<(CheckVariableProperty, VariableName)> {
    let header = CheckVariableProperty::parse(request)?;
    let total = header.total_size()?;
    if total > request.len() {
        return None;
    }
    let name =
        VariableName::from_bytes_with_nul(&request[CheckVariableProperty::NAME_OFFSET..total])
            .ok()?;
    Some((header, name))
}

/// Extracts the NUL-terminated name at the start of an enumeration name
/// buffer; bytes after the terminator are buffer capacity, not name.
fn parse_name_in_buffer(buf: &[u8]) -> Option<VariableName> {
    let mut units_end = None;
    for (i, pair) in buf.chunks_exact(2).enumerate() {
        if u16::from_le_bytes([pair[0], pair[1]]) == 0 {
            units_end = Some(i + 1);
            break;
        }
    }
    let units_end = units_end?;
    VariableName::from_bytes_with_nul(&buf[..units_end * 2]).ok()
}
