//! Collect, aggregate, and verify data-availability certificates from a storage committee.
//!
//! A committee of independent storage nodes jointly attests, through one aggregate BLS signature,
//! that a blob stays retrievable until a stated deadline. Anyone holding only the compact
//! [Certificate] (and the registered [Keyset]) can check that at least `assumed_honest` members
//! vouched for retention.
//!
//! # Overview
//!
//! * [Member] stores blobs and signs `DataHash || Timeout` (it implements [Writer] and [Reader]).
//! * [aggregator::Aggregator] fans a blob out to every [Writer] in a committee, keeps the partial
//!   signatures that verify, and combines at least `assumed_honest` of them into a [Certificate].
//! * [verify] checks a [Certificate] against any [registry::KeysetLookup].
//!
//! # Status
//!
//! `anytrust-das` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

use anytrust_cryptography::Digest;
use bytes::Bytes;
use std::{
    future::Future,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

pub mod aggregator;
mod certificate;
pub use certificate::{Certificate, PartialSignature};
mod keyset;
pub use keyset::{Keyset, KeysetEntry, MAX_MEMBERS};
mod member;
pub use member::{Config as MemberConfig, Member};
#[cfg(test)]
pub mod mocks;
pub mod origination;
mod reader;
pub use reader::Retriever;
pub mod registry;
pub mod storage;
use storage::ExpirationPolicy;
mod verifier;
pub use verifier::verify;
pub mod wire;

/// Errors that can occur while producing or checking certificates.
///
/// Errors are [Clone] so that every submitter joined to the same round receives the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid threshold: {0} of {1}")]
    InvalidThreshold(u64, usize),
    #[error("too many members: {0}")]
    TooManyMembers(usize),
    #[error("duplicate member: {0}")]
    DuplicateMember(u32),
    #[error("malformed keyset")]
    MalformedKeyset,
    #[error("malformed certificate")]
    MalformedCertificate,
    #[error("malformed partial signature")]
    MalformedPartialSignature,
    #[error("unauthorized")]
    Unauthorized,
    #[error("expired: {0}")]
    Expired(u64),
    #[error("storage failure: {0}")]
    StorageFailure(String),
    #[error("insufficient signers: {0}/{1}")]
    InsufficientSigners(u64, u64),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("unknown keyset: {0}")]
    UnknownKeyset(Digest),
    #[error("not found")]
    NotFound,
    #[error("committee mismatch: {0} writers for {1} members")]
    CommitteeMismatch(usize, usize),
    #[error("canceled")]
    Canceled,
}

impl From<storage::Error> for Error {
    fn from(err: storage::Error) -> Self {
        Self::StorageFailure(err.to_string())
    }
}

/// Accepts a blob for retention and attests to it.
///
/// One implementation exists per transport. Dropping the returned future must not cancel a
/// write the member already started.
pub trait Writer: Clone + Send + Sync + 'static {
    /// Store `message` until `timeout` (seconds since the Unix epoch) and return a signature over
    /// `DataHash || Timeout`, tagged with the member's keyset index.
    ///
    /// `signature` is the requester's origination signature (empty if the requester has no key).
    fn store(
        &self,
        message: Bytes,
        timeout: u64,
        signature: Bytes,
    ) -> impl Future<Output = Result<PartialSignature, Error>> + Send;
}

/// Serves blobs by [Digest].
pub trait Reader: Clone + Send + Sync + 'static {
    /// Return the blob hashing to `data_hash`, or [Error::NotFound] if it is unknown or expired.
    fn retrieve(&self, data_hash: &Digest) -> impl Future<Output = Result<Bytes, Error>> + Send;

    /// Whether blobs are discarded once their timeout passes.
    fn expiration_policy(&self) -> ExpirationPolicy;
}

/// Seconds since the Unix epoch.
pub fn epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Whether a retention promise that ends at `timeout` has lapsed at `now`.
pub(crate) fn expired(timeout: u64, now: u64) -> bool {
    timeout < now
}
