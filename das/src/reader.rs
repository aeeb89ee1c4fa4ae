use crate::{
    storage::{ExpirationPolicy, Storage},
    Error, Reader,
};
use anytrust_cryptography::{hash, Digest};
use bytes::Bytes;
use tracing::warn;

/// [Reader] backed by a [Storage] collaborator.
///
/// Blobs are checked against their digest before they are returned.
#[derive(Clone)]
pub struct Retriever<S: Storage> {
    storage: S,
}

impl<S: Storage> Retriever<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Reader for Retriever<S> {
    async fn retrieve(&self, data_hash: &Digest) -> Result<Bytes, Error> {
        let Some(data) = self.storage.get(data_hash).await? else {
            return Err(Error::NotFound);
        };
        if hash(&data) != *data_hash {
            warn!(?data_hash, "stored blob does not match digest");
            return Err(Error::StorageFailure(format!(
                "integrity check failed: {}",
                data_hash
            )));
        }
        Ok(data)
    }

    fn expiration_policy(&self) -> ExpirationPolicy {
        self.storage.expiration_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{epoch, storage::Memory};

    #[tokio::test]
    async fn test_retrieve() {
        let storage = Memory::default();
        let reader = Retriever::new(storage.clone());
        assert_eq!(
            reader.expiration_policy(),
            ExpirationPolicy::DiscardAfterTimeout
        );

        let data = Bytes::from_static(b"hello world");
        let digest = hash(&data);
        assert_eq!(reader.retrieve(&digest).await, Err(Error::NotFound));

        storage.put(digest, data.clone(), epoch() + 60).await.unwrap();
        assert_eq!(reader.retrieve(&digest).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_retrieve_expired() {
        let storage = Memory::default();
        let reader = Retriever::new(storage.clone());
        let data = Bytes::from_static(b"hello world");
        let digest = hash(&data);
        storage.put(digest, data, epoch() - 60).await.unwrap();
        assert_eq!(reader.retrieve(&digest).await, Err(Error::NotFound));
    }

    #[tokio::test]
    async fn test_retrieve_mismatch() {
        let storage = Memory::default();
        let reader = Retriever::new(storage.clone());
        let digest = hash(b"expected");
        storage
            .put(digest, Bytes::from_static(b"actual"), epoch() + 60)
            .await
            .unwrap();
        assert!(matches!(
            reader.retrieve(&digest).await,
            Err(Error::StorageFailure(_))
        ));
    }
}
