// SPDX-License-Identifier: MIT OR Apache-2.0

//! Verification of time-based authenticated variable writes.
//!
//! A write with `TIME_BASED_AUTHENTICATED_WRITE_ACCESS` carries an
//! `EFI_VARIABLE_AUTHENTICATION_2` descriptor: a timestamp and a PKCS#7
//! `SignedData` signature over the canonical serialization of the write.
//! This module strips the descriptor, recomputes the signed digest, checks
//! the signature through the injected [`CryptoOps`] capability, and enforces
//! the timestamp and principal-binding policies.
//!
//! The crypto primitives (hashing, PKCS#7 verification, fingerprint
//! extraction) stay behind the trait so the core works against any provider.

use crate::index::FINGERPRINT_SIZE;
use crate::name::VariableName;
use crate::{Error, Result};
use smmvar_raw::auth::Authentication2;
use smmvar_raw::time::Time;
use smmvar_raw::variable::VariableAttributes;
use smmvar_raw::{Guid, Status};

mod crypto;
pub use crypto::{CryptoError, CryptoOps, CryptoResult};

/// Authentication state recorded by a previous accepted write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriorAuth {
    /// Timestamp of the latest accepted write.
    pub timestamp: Time,
    /// Fingerprint bound to the variable; all zeros if not bound.
    pub fingerprint: [u8; FINGERPRINT_SIZE],
}

/// Outcome of a successful verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifiedWrite<'a> {
    /// The variable payload with the descriptor stripped.
    pub payload: &'a [u8],
    /// Timestamp to record for the variable.
    pub timestamp: Time,
    /// Fingerprint to record for the variable; all zeros when the write was
    /// verified against an external trust anchor.
    pub fingerprint: [u8; FINGERPRINT_SIZE],
}

/// Verifies an authenticated SetVariable payload.
///
/// `prior` carries the stored authentication state when the variable already
/// exists; `trust_anchor` selects between anchored verification and the
/// self-signed first-write policy.
pub fn verify_write<'a>(
    crypto: &dyn CryptoOps,
    trust_anchor: Option<&[u8]>,
    guid: &Guid,
    name: &VariableName,
    attributes: VariableAttributes,
    data: &'a [u8],
    prior: Option<&PriorAuth>,
) -> Result<VerifiedWrite<'a>> {
    let auth = Authentication2::parse(data)
        .ok_or_else(|| Error::from(Status::SECURITY_VIOLATION))?;

    if !auth.timestamp.is_valid_timestamp() || auth.cert_data.is_empty() {
        return Err(Error::from(Status::SECURITY_VIOLATION));
    }

    // A replayed or stale descriptor is rejected before any crypto runs.
    if let Some(prior) = prior {
        if auth.timestamp.ordinal() <= prior.timestamp.ordinal() {
            log::warn!("authenticated write for '{name}' with a non-advancing timestamp");
            return Err(Error::from(Status::SECURITY_VIOLATION));
        }
    }

    let digest = compute_digest(crypto, guid, name, attributes, &auth)?;

    crypto
        .verify_pkcs7(auth.cert_data, &digest, trust_anchor)
        .map_err(|_| Error::from(Status::SECURITY_VIOLATION))?;

    let fingerprint = if trust_anchor.is_some() {
        [0; FINGERPRINT_SIZE]
    } else {
        let fingerprint = crypto
            .pkcs7_fingerprint(auth.cert_data)
            .map_err(|e| Error::from(fingerprint_status(e)))?;

        if let Some(prior) = prior {
            if prior.fingerprint != [0; FINGERPRINT_SIZE] && prior.fingerprint != fingerprint {
                log::warn!("authenticated write for '{name}' signed by a different principal");
                return Err(Error::from(Status::SECURITY_VIOLATION));
            }
        }
        fingerprint
    };

    Ok(VerifiedWrite {
        payload: auth.payload,
        timestamp: auth.timestamp,
        fingerprint,
    })
}

/// The canonical serialization signed by the writer:
/// `name-without-NUL ∥ guid ∥ attributes ∥ timestamp ∥ payload`.
fn compute_digest(
    crypto: &dyn CryptoOps,
    guid: &Guid,
    name: &VariableName,
    attributes: VariableAttributes,
    auth: &Authentication2<'_>,
) -> Result<[u8; 32]> {
    let mut name_bytes = [0u8; crate::name::MAX_NAME_SIZE];
    name.emit(&mut name_bytes[..name.num_bytes()]);

    let guid_bytes = guid.to_bytes();
    let attr_bytes = attributes.bits().to_le_bytes();
    let mut time_bytes = [0u8; Time::ENCODED_SIZE];
    auth.timestamp.emit(&mut time_bytes);

    crypto
        .hash_sha256(&[
            &name_bytes[..name.num_bytes() - 2],
            &guid_bytes,
            &attr_bytes,
            &time_bytes,
            auth.payload,
        ])
        .map_err(|_| Error::from(Status::DEVICE_ERROR))
}

const fn fingerprint_status(e: CryptoError) -> Status {
    match e {
        CryptoError::ParseFailed => Status::COMPROMISED_DATA,
        CryptoError::VerificationFailed => Status::SECURITY_VIOLATION,
        CryptoError::ProviderFailure => Status::DEVICE_ERROR,
    }
}
