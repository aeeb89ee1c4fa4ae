use crate::{wire, Error};
use anytrust_cryptography::{Digest, Signature};
use bytes::Bytes;

/// Aggregate-signed attestation that a blob is retained until `timeout`.
///
/// Certificates are only produced by the [crate::aggregator::Aggregator] or decoded from their
/// wire encoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Certificate {
    keyset_hash: Digest,
    data_hash: Digest,
    timeout: u64,
    signers_mask: u64,
    signature: Signature,
}

impl Certificate {
    pub(crate) fn new(
        keyset_hash: Digest,
        data_hash: Digest,
        timeout: u64,
        signers_mask: u64,
        signature: Signature,
    ) -> Self {
        Self {
            keyset_hash,
            data_hash,
            timeout,
            signers_mask,
            signature,
        }
    }

    pub fn keyset_hash(&self) -> &Digest {
        &self.keyset_hash
    }

    pub fn data_hash(&self) -> &Digest {
        &self.data_hash
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn signers_mask(&self) -> u64 {
        self.signers_mask
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Indices of the members that contributed to the aggregate signature (ascending).
    pub fn signers(&self) -> impl Iterator<Item = u32> + '_ {
        (0..u64::BITS).filter(move |i| self.signers_mask & (1u64 << *i) != 0)
    }

    /// Number of members that contributed to the aggregate signature.
    pub fn signer_count(&self) -> u64 {
        self.signers_mask.count_ones() as u64
    }

    /// The bytes every member signed.
    pub fn signable(&self) -> [u8; wire::SIGNABLE_LENGTH] {
        wire::signable_fields(&self.data_hash, self.timeout)
    }

    pub fn encode(&self) -> Bytes {
        wire::encode_certificate(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        wire::decode_certificate(bytes)
    }
}

/// A single member's signature over the signable fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartialSignature {
    pub index: u32,
    pub signature: Signature,
}

impl PartialSignature {
    pub fn encode(&self) -> Bytes {
        wire::encode_partial_signature(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        wire::decode_partial_signature(bytes)
    }
}
