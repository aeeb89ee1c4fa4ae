//! Decide which store requests a committee member accepts.
//!
//! A member can be opened to any requester ([Open]), closed to all of them ([Closed]), or limited
//! to requests signed by a known ed25519 key ([Requester]). Requester signatures cover
//! [NAMESPACE] followed by the signable fields (`DataHash || Timeout`), so a signature over one
//! blob or timeout can't be replayed for another.

use crate::wire::signable_fields;
use anytrust_cryptography::Digest;
use bytes::Bytes;
use ed25519_consensus::{Signature, SigningKey, VerificationKey};

/// Domain separator of requester signatures.
pub const NAMESPACE: &[u8] = b"_ANYTRUST_STORE";

/// Interface for gating store requests.
pub trait Origination: Clone + Send + Sync + 'static {
    /// Whether a store of the blob hashing to `data_hash` until `timeout` may proceed, given the
    /// requester's `signature`.
    fn authorize(&self, data_hash: &Digest, timeout: u64, signature: &[u8]) -> bool;
}

/// Accept every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct Open;

impl Origination for Open {
    fn authorize(&self, _: &Digest, _: u64, _: &[u8]) -> bool {
        true
    }
}

/// Reject every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct Closed;

impl Origination for Closed {
    fn authorize(&self, _: &Digest, _: u64, _: &[u8]) -> bool {
        false
    }
}

/// Accept requests signed by a single requester key.
#[derive(Clone, Debug)]
pub struct Requester {
    key: VerificationKey,
}

impl Requester {
    pub fn new(key: VerificationKey) -> Self {
        Self { key }
    }
}

impl Origination for Requester {
    fn authorize(&self, data_hash: &Digest, timeout: u64, signature: &[u8]) -> bool {
        let Ok(raw) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let signature = Signature::from(raw);
        self.key
            .verify(&signature, &payload(data_hash, timeout))
            .is_ok()
    }
}

/// Sign a store request as the requester.
pub fn sign(key: &SigningKey, data_hash: &Digest, timeout: u64) -> Bytes {
    let signature = key.sign(&payload(data_hash, timeout));
    Bytes::copy_from_slice(&signature.to_bytes())
}

fn payload(data_hash: &Digest, timeout: u64) -> Vec<u8> {
    let mut payload = NAMESPACE.to_vec();
    payload.extend_from_slice(&signable_fields(data_hash, timeout));
    payload
}
