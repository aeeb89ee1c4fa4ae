//! Resolve a `KeysetHash` to the registered [Keyset].
//!
//! On-chain registration is external to this crate: whatever tracks registrations exposes them
//! through [KeysetLookup]. [Registry] is an in-memory implementation.

use crate::Keyset;
use anytrust_cryptography::Digest;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use tracing::debug;

/// Interface for resolving registered keysets.
pub trait KeysetLookup: Send + Sync {
    /// Return the keyset registered under `hash`, if any.
    fn keyset(&self, hash: &Digest) -> Option<Arc<Keyset>>;
}

impl KeysetLookup for Arc<Keyset> {
    fn keyset(&self, hash: &Digest) -> Option<Arc<Keyset>> {
        (self.hash() == *hash).then(|| self.clone())
    }
}

/// In-memory keyset registry.
#[derive(Clone, Default)]
pub struct Registry {
    keysets: Arc<RwLock<HashMap<Digest, Arc<Keyset>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `keyset`, returning its hash.
    pub fn register(&self, keyset: Keyset) -> Digest {
        let hash = keyset.hash();
        let previous = self
            .keysets
            .write()
            .unwrap()
            .insert(hash, Arc::new(keyset));
        if previous.is_none() {
            debug!(?hash, "registered keyset");
        }
        hash
    }

    /// Stop accepting certificates that refer to `hash`.
    pub fn revoke(&self, hash: &Digest) -> bool {
        let removed = self.keysets.write().unwrap().remove(hash).is_some();
        if removed {
            debug!(?hash, "revoked keyset");
        }
        removed
    }
}

impl KeysetLookup for Registry {
    fn keyset(&self, hash: &Digest) -> Option<Arc<Keyset>> {
        self.keysets.read().unwrap().get(hash).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anytrust_cryptography::PrivateKey;

    fn keyset(seeds: std::ops::Range<u64>, assumed_honest: u64) -> Keyset {
        let publics = seeds
            .map(|seed| PrivateKey::from_seed(seed).public_key())
            .collect();
        Keyset::new(publics, assumed_honest).unwrap()
    }

    #[test]
    fn test_register_and_revoke() {
        let registry = Registry::new();
        let first = keyset(0..3, 2);
        let second = keyset(3..6, 2);

        let first_hash = registry.register(first.clone());
        let second_hash = registry.register(second);
        assert_eq!(first_hash, first.hash());
        assert_ne!(first_hash, second_hash);
        assert_eq!(registry.keyset(&first_hash).as_deref(), Some(&first));

        // Clones share state
        let clone = registry.clone();
        assert!(clone.revoke(&first_hash));
        assert!(registry.keyset(&first_hash).is_none());
        assert!(!registry.revoke(&first_hash));
        assert!(registry.keyset(&second_hash).is_some());
    }

    #[test]
    fn test_single_keyset_lookup() {
        let keyset = Arc::new(keyset(0..3, 1));
        assert!(keyset.keyset(&keyset.hash()).is_some());
        assert!(keyset.keyset(&Digest::default()).is_none());
    }
}
