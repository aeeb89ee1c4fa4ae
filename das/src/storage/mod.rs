//! Persist blobs until their retention timeout.
//!
//! Storage backends are external collaborators: a committee member only requires [Storage].
//! [Memory] keeps blobs in-process and [Disk] keeps one durable file per blob.

use anytrust_cryptography::Digest;
use bytes::Bytes;
use std::future::Future;
use thiserror::Error;

mod disk;
pub use disk::{Config as DiskConfig, Disk};
mod memory;
pub use memory::Memory;

/// Errors that can occur when interacting with [Storage].
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt blob: {0}")]
    Corrupt(Digest),
}

/// Whether a backend forgets blobs once their timeout passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpirationPolicy {
    KeepForever,
    DiscardAfterTimeout,
}

/// Interface for durable blob storage.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Persist `data` under `digest` until at least `timeout`.
    ///
    /// Storing a blob that already exists keeps it until the later of the two timeouts.
    fn put(
        &self,
        digest: Digest,
        data: Bytes,
        timeout: u64,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Fetch the blob stored under `digest`.
    ///
    /// Returns `None` if the blob is unknown or (under [ExpirationPolicy::DiscardAfterTimeout])
    /// its timeout has passed.
    fn get(&self, digest: &Digest) -> impl Future<Output = Result<Option<Bytes>, Error>> + Send;

    fn expiration_policy(&self) -> ExpirationPolicy;
}
