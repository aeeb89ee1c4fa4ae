use crate::{
    epoch, expired,
    origination::Origination,
    storage::{ExpirationPolicy, Storage},
    wire::signable_fields,
    Error, PartialSignature, Reader, Retriever, Writer,
};
use anytrust_cryptography::{hash, Digest, PrivateKey, PublicKey};
use bytes::Bytes;
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};
use tracing::{debug, warn};

/// Configuration for a [Member].
pub struct Config<S: Storage, O: Origination> {
    /// Position of this member in the keyset.
    pub index: u32,

    /// Key used to sign stored blobs.
    pub private: PrivateKey,

    pub storage: S,

    /// Policy for accepting store requests.
    pub origination: O,
}

/// A committee member that stores blobs and attests to their retention.
#[derive(Clone)]
pub struct Member<S: Storage, O: Origination> {
    index: u32,
    private: Arc<PrivateKey>,
    storage: S,
    origination: O,
    reader: Retriever<S>,
}

impl<S: Storage, O: Origination> Member<S, O> {
    pub fn new(cfg: Config<S, O>) -> Self {
        Self {
            index: cfg.index,
            private: Arc::new(cfg.private),
            reader: Retriever::new(cfg.storage.clone()),
            storage: cfg.storage,
            origination: cfg.origination,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn public_key(&self) -> PublicKey {
        self.private.public_key()
    }
}

impl<S: Storage, O: Origination> Writer for Member<S, O> {
    async fn store(
        &self,
        message: Bytes,
        timeout: u64,
        signature: Bytes,
    ) -> Result<PartialSignature, Error> {
        let data_hash = hash(&message);
        if !self.origination.authorize(&data_hash, timeout, &signature) {
            debug!(index = self.index, ?data_hash, "unauthorized store request");
            return Err(Error::Unauthorized);
        }
        if expired(timeout, epoch()) {
            debug!(index = self.index, ?data_hash, timeout, "store request already expired");
            return Err(Error::Expired(timeout));
        }

        // Persist on a separate task so that dropping this request never interrupts the write
        let storage = self.storage.clone();
        let write = tokio::spawn(async move { storage.put(data_hash, message, timeout).await });
        match write.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(index = self.index, ?data_hash, ?err, "failed to store blob");
                return Err(err.into());
            }
            Err(err) => {
                warn!(index = self.index, ?data_hash, ?err, "store task failed");
                return Err(Error::StorageFailure(err.to_string()));
            }
        }

        let signature = self.private.sign(&signable_fields(&data_hash, timeout));
        debug!(index = self.index, ?data_hash, timeout, "stored blob");
        Ok(PartialSignature {
            index: self.index,
            signature,
        })
    }
}

impl<S: Storage, O: Origination> Reader for Member<S, O> {
    async fn retrieve(&self, data_hash: &Digest) -> Result<Bytes, Error> {
        self.reader.retrieve(data_hash).await
    }

    fn expiration_policy(&self) -> ExpirationPolicy {
        self.reader.expiration_policy()
    }
}

impl<S: Storage, O: Origination> Display for Member<S, O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Member(index={}, public={})", self.index, self.public_key())
    }
}
