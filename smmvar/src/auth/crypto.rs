// SPDX-License-Identifier: MIT OR Apache-2.0

/// Errors surfaced by the crypto provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CryptoError {
    /// The signature did not verify against the selected certificate.
    VerificationFailed,
    /// The DER structure could not be parsed.
    ParseFailed,
    /// The provider failed internally.
    ProviderFailure,
}

/// Result alias for crypto operations.
pub type CryptoResult<T> = core::result::Result<T, CryptoError>;

/// The crypto capability injected into the authenticated-write verifier.
///
/// In a deployment this is backed by the platform crypto provider (e.g. a
/// PSA Crypto partition reached over RPC); the verifier itself never touches
/// key material or DER parsing.
pub trait CryptoOps {
    /// SHA-256 over the concatenation of `chunks`.
    fn hash_sha256(&self, chunks: &[&[u8]]) -> CryptoResult<[u8; 32]>;

    /// Verifies a PKCS#7 `SignedData` signature over `digest`.
    ///
    /// With `trust_anchor` given, the signature must chain to that
    /// certificate; without it the signing certificate embedded in the
    /// PKCS#7 structure itself is trusted (self-signed first-write policy —
    /// the caller is responsible for binding the principal via
    /// [`Self::pkcs7_fingerprint`]).
    fn verify_pkcs7(
        &self,
        signature: &[u8],
        digest: &[u8; 32],
        trust_anchor: Option<&[u8]>,
    ) -> CryptoResult<()>;

    /// Computes the fingerprint identifying the signing principal of a
    /// PKCS#7 `SignedData` structure.
    ///
    /// The fingerprint is the SHA-256 of the signer certificate's common
    /// name (the subject RDN with OID 2.5.4.3) concatenated with the TBS of
    /// the top-level certificate, which is the last one in the chain as
    /// parsed. Any ASN.1 parsing failure reports
    /// [`CryptoError::ParseFailed`].
    fn pkcs7_fingerprint(&self, signature: &[u8]) -> CryptoResult<[u8; 32]>;
}
