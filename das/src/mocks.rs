//! Committee members with scripted behavior.

use crate::{
    aggregator::Committee, wire::signable_fields, Error, Keyset, PartialSignature, Writer,
};
use anytrust_cryptography::{hash, PrivateKey};
use bytes::Bytes;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// How a [Member] responds to store requests.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Sign immediately.
    Honest,
    /// Sign after a delay.
    Delay(Duration),
    /// Never respond.
    Unresponsive,
    /// Respond with a signature over the wrong bytes.
    Corrupt,
    /// Respond with a valid signature, claiming another member's index.
    Impersonate(u32),
    /// Fail to store.
    Fail,
}

/// Decrements a counter when dropped.
struct Pending(Arc<AtomicUsize>);

impl Drop for Pending {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A [Writer] that behaves according to a [Behavior].
#[derive(Clone)]
pub struct Member {
    index: u32,
    private: Arc<PrivateKey>,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
    pending: Arc<AtomicUsize>,
}

impl Member {
    pub fn new(index: u32, private: PrivateKey, behavior: Behavior) -> Self {
        Self {
            index,
            private: Arc::new(private),
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of store requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of store requests that are still running (neither answered nor dropped).
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Writer for Member {
    async fn store(
        &self,
        message: Bytes,
        timeout: u64,
        _: Bytes,
    ) -> Result<PartialSignature, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pending.fetch_add(1, Ordering::SeqCst);
        let _pending = Pending(self.pending.clone());
        let signable = signable_fields(&hash(&message), timeout);
        let index = match self.behavior {
            Behavior::Honest => self.index,
            Behavior::Delay(duration) => {
                tokio::time::sleep(duration).await;
                self.index
            }
            Behavior::Unresponsive => futures::future::pending().await,
            Behavior::Corrupt => {
                return Ok(PartialSignature {
                    index: self.index,
                    signature: self.private.sign(b"corrupt"),
                })
            }
            Behavior::Impersonate(index) => index,
            Behavior::Fail => return Err(Error::StorageFailure("mock failure".into())),
        };
        Ok(PartialSignature {
            index,
            signature: self.private.sign(&signable),
        })
    }
}

/// Build a committee where member `i` (seeded with `i`) follows `behaviors[i]`.
pub fn committee(behaviors: Vec<Behavior>, assumed_honest: u64) -> (Committee<Member>, Vec<Member>) {
    let members: Vec<_> = behaviors
        .into_iter()
        .enumerate()
        .map(|(i, behavior)| Member::new(i as u32, PrivateKey::from_seed(i as u64), behavior))
        .collect();
    let publics = members.iter().map(|m| m.private.public_key()).collect();
    let keyset = Keyset::new(publics, assumed_honest).unwrap();
    let committee = Committee::new(keyset, members.clone()).unwrap();
    (committee, members)
}
