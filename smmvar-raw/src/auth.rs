// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated-variable descriptors.
//!
//! A SetVariable request with the time-based authenticated attribute carries
//! an `EFI_VARIABLE_AUTHENTICATION_2` descriptor at the start of its data:
//! a timestamp, a `WIN_CERTIFICATE_UEFI_GUID` wrapper holding a PKCS#7
//! `SignedData` blob, and then the actual variable payload.

use crate::time::Time;
use uguid::{guid, Guid};

/// Revision of the WIN_CERTIFICATE structure this service accepts.
pub const WIN_CERT_REVISION: u16 = 0x0200;

/// `wCertificateType` value identifying a GUID-typed certificate wrapper.
pub const WIN_CERT_TYPE_EFI_GUID: u16 = 0x0EF1;

/// Certificate-type GUID identifying PKCS#7 `SignedData` contents.
pub const EFI_CERT_TYPE_PKCS7_GUID: Guid = guid!("4aafd29d-68df-49ee-8aa9-347d375665a7");

/// Size of the WIN_CERTIFICATE header (`length:u32, revision:u16, type:u16`).
const WIN_CERT_HEADER_SIZE: usize = 8;

/// Size of the certificate wrapper up to the start of the certificate data.
const CERT_DATA_OFFSET: usize = WIN_CERT_HEADER_SIZE + 16;

/// A parsed `EFI_VARIABLE_AUTHENTICATION_2` descriptor.
///
/// Borrowed views into the request data; nothing is copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Authentication2<'a> {
    /// Timestamp signed together with the payload.
    pub timestamp: Time,
    /// The DER-encoded PKCS#7 `SignedData` blob.
    pub cert_data: &'a [u8],
    /// The variable payload that follows the descriptor.
    pub payload: &'a [u8],
}

impl<'a> Authentication2<'a> {
    /// Smallest possible descriptor: timestamp + certificate wrapper with an
    /// empty certificate blob.
    pub const MIN_SIZE: usize = Time::ENCODED_SIZE + CERT_DATA_OFFSET;

    /// Parses the descriptor from the start of a SetVariable data field.
    ///
    /// Returns `None` when the descriptor is truncated, when the certificate
    /// wrapper carries an unexpected revision, type, or type GUID, or when
    /// the embedded length field is inconsistent with the data size.
    #[must_use]
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::MIN_SIZE {
            return None;
        }

        let timestamp = Time::parse(data)?;
        let cert = &data[Time::ENCODED_SIZE..];

        let length = u32::from_le_bytes(cert[0..4].try_into().unwrap()) as usize;
        let revision = u16::from_le_bytes([cert[4], cert[5]]);
        let cert_type = u16::from_le_bytes([cert[6], cert[7]]);
        if revision != WIN_CERT_REVISION || cert_type != WIN_CERT_TYPE_EFI_GUID {
            return None;
        }

        let type_guid = Guid::from_bytes(cert[WIN_CERT_HEADER_SIZE..CERT_DATA_OFFSET].try_into().unwrap());
        if type_guid != EFI_CERT_TYPE_PKCS7_GUID {
            return None;
        }

        // The length field covers the whole wrapper, certificate data
        // included, and must stay inside the request data.
        if length < CERT_DATA_OFFSET || length > cert.len() {
            return None;
        }

        Some(Self {
            timestamp,
            cert_data: &cert[CERT_DATA_OFFSET..length],
            payload: &cert[length..],
        })
    }
}
