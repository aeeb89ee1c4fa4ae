//! Byte-exact encodings of certificates and partial signatures.
//!
//! # Certificate
//!
//! ```txt
//! +------+--------------+-----------+-------------+-----------------+---------------------+
//! | 0x80 | KeysetHash   | DataHash  | Timeout     | SignersMask     | AggregateSignature  |
//! | 1    | 32           | 32        | u64 (BE) 8  | u64 (BE) 8      | 48 (compressed G1)  |
//! +------+--------------+-----------+-------------+-----------------+---------------------+
//! ```
//!
//! The header flag marks the message as a data-availability certificate. Members sign exactly
//! `DataHash || Timeout` (see [signable_fields]).
//!
//! # Partial Signature
//!
//! ```txt
//! +------------------+---------------------+
//! | index u32 (BE) 4 | signature 48        |
//! +------------------+---------------------+
//! ```

use crate::{Certificate, Error, PartialSignature};
use anytrust_cryptography::{bls12381::SIGNATURE_LENGTH, Digest, Signature};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Header flag of an encoded [Certificate].
pub const HEADER_FLAG: u8 = 0x80;

/// Length of `DataHash || Timeout`.
pub const SIGNABLE_LENGTH: usize = Digest::SIZE + u64::BITS as usize / 8;

/// Length of an encoded [Certificate].
pub const CERTIFICATE_LENGTH: usize = 1 + Digest::SIZE + SIGNABLE_LENGTH + 8 + SIGNATURE_LENGTH;

/// Length of an encoded [PartialSignature].
pub const PARTIAL_SIGNATURE_LENGTH: usize = 4 + SIGNATURE_LENGTH;

/// The bytes every partial and aggregate signature is computed over.
pub fn signable_fields(data_hash: &Digest, timeout: u64) -> [u8; SIGNABLE_LENGTH] {
    let mut fields = [0u8; SIGNABLE_LENGTH];
    fields[..Digest::SIZE].copy_from_slice(data_hash);
    fields[Digest::SIZE..].copy_from_slice(&timeout.to_be_bytes());
    fields
}

pub fn encode_certificate(certificate: &Certificate) -> Bytes {
    let mut buf = BytesMut::with_capacity(CERTIFICATE_LENGTH);
    buf.put_u8(HEADER_FLAG);
    buf.put_slice(certificate.keyset_hash());
    buf.put_slice(certificate.data_hash());
    buf.put_u64(certificate.timeout());
    buf.put_u64(certificate.signers_mask());
    buf.put_slice(&certificate.signature().to_bytes());
    buf.freeze()
}

/// Decode a [Certificate], failing with [Error::MalformedCertificate] on any deviation from the
/// layout (including a signature that is not a valid G1 point).
pub fn decode_certificate(bytes: &[u8]) -> Result<Certificate, Error> {
    if bytes.len() < CERTIFICATE_LENGTH {
        return Err(Error::MalformedCertificate);
    }
    let mut buf = bytes;
    if buf.get_u8() != HEADER_FLAG {
        return Err(Error::MalformedCertificate);
    }
    if bytes.len() != CERTIFICATE_LENGTH {
        return Err(Error::MalformedCertificate);
    }
    let keyset_hash = read_digest(&mut buf)?;
    let data_hash = read_digest(&mut buf)?;
    let timeout = buf.get_u64();
    let signers_mask = buf.get_u64();
    let signature = Signature::from_bytes(buf).map_err(|_| Error::MalformedCertificate)?;
    Ok(Certificate::new(
        keyset_hash,
        data_hash,
        timeout,
        signers_mask,
        signature,
    ))
}

pub fn encode_partial_signature(partial: &PartialSignature) -> Bytes {
    let mut buf = BytesMut::with_capacity(PARTIAL_SIGNATURE_LENGTH);
    buf.put_u32(partial.index);
    buf.put_slice(&partial.signature.to_bytes());
    buf.freeze()
}

pub fn decode_partial_signature(bytes: &[u8]) -> Result<PartialSignature, Error> {
    if bytes.len() != PARTIAL_SIGNATURE_LENGTH {
        return Err(Error::MalformedPartialSignature);
    }
    let mut buf = bytes;
    let index = buf.get_u32();
    let signature = Signature::from_bytes(buf).map_err(|_| Error::MalformedPartialSignature)?;
    Ok(PartialSignature { index, signature })
}

fn read_digest(buf: &mut &[u8]) -> Result<Digest, Error> {
    let digest = Digest::try_from(&buf[..Digest::SIZE]).map_err(|_| Error::MalformedCertificate)?;
    buf.advance(Digest::SIZE);
    Ok(digest)
}
