use super::{Error, ExpirationPolicy, Storage};
use crate::{epoch, expired};
use anytrust_cryptography::Digest;
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// In-memory [Storage].
///
/// Under [ExpirationPolicy::DiscardAfterTimeout], expired blobs are dropped on the next `put`.
/// Under [ExpirationPolicy::KeepForever], blobs are only dropped by [Memory::prune].
#[derive(Clone)]
pub struct Memory {
    blobs: Arc<Mutex<HashMap<Digest, (u64, Bytes)>>>,
    policy: ExpirationPolicy,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(ExpirationPolicy::DiscardAfterTimeout)
    }
}

impl Memory {
    pub fn new(policy: ExpirationPolicy) -> Self {
        Self {
            blobs: Arc::new(Mutex::new(HashMap::new())),
            policy,
        }
    }

    /// Drop every blob whose timeout passed before `now` (regardless of policy), returning how
    /// many were dropped.
    pub fn prune(&self, now: u64) -> usize {
        let mut blobs = self.blobs.lock().unwrap();
        let before = blobs.len();
        blobs.retain(|_, (timeout, _)| !expired(*timeout, now));
        before - blobs.len()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for Memory {
    async fn put(&self, digest: Digest, data: Bytes, timeout: u64) -> Result<(), Error> {
        let mut blobs = self.blobs.lock().unwrap();
        if self.policy == ExpirationPolicy::DiscardAfterTimeout {
            let now = epoch();
            blobs.retain(|_, (timeout, _)| !expired(*timeout, now));
        }
        let entry = blobs.entry(digest).or_insert((timeout, data));
        entry.0 = entry.0.max(timeout);
        Ok(())
    }

    async fn get(&self, digest: &Digest) -> Result<Option<Bytes>, Error> {
        let blobs = self.blobs.lock().unwrap();
        let Some((timeout, data)) = blobs.get(digest) else {
            return Ok(None);
        };
        if self.policy == ExpirationPolicy::DiscardAfterTimeout && expired(*timeout, epoch()) {
            return Ok(None);
        }
        Ok(Some(data.clone()))
    }

    fn expiration_policy(&self) -> ExpirationPolicy {
        self.policy
    }
}
