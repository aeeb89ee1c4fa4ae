use super::Config;
use crate::{
    origination, wire::signable_fields, Certificate, Error, Keyset, PartialSignature, Writer,
};
use anytrust_cryptography::{bls12381::aggregate_signatures, hash, Digest, Signature};
use bytes::Bytes;
use futures::{
    channel::{mpsc, oneshot},
    StreamExt,
};
use prometheus_client::{
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};
use std::{
    collections::{BTreeMap, HashMap},
    fmt::{Display, Formatter},
    sync::{Arc, Mutex, RwLock},
};
use tokio::{
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

/// A [Keyset] and one [Writer] per member, in keyset order.
pub struct Committee<W: Writer> {
    keyset: Arc<Keyset>,
    writers: Vec<W>,
}

impl<W: Writer> Committee<W> {
    pub fn new(keyset: Keyset, writers: Vec<W>) -> Result<Self, Error> {
        if writers.len() != keyset.len() {
            return Err(Error::CommitteeMismatch(writers.len(), keyset.len()));
        }
        Ok(Self {
            keyset: Arc::new(keyset),
            writers,
        })
    }

    pub fn keyset(&self) -> &Arc<Keyset> {
        &self.keyset
    }

    pub fn writers(&self) -> &[W] {
        &self.writers
    }
}

/// Identity of a round: submissions of the same blob with the same timeout share one.
type Request = (Digest, u64);

/// Submitters waiting on the result of a running round.
type Waiters = Vec<oneshot::Sender<Result<Certificate, Error>>>;

#[derive(Clone, Default)]
struct Metrics {
    submissions: Counter,
    certificates: Counter,
    insufficient: Counter,
    rejected_partials: Counter,
    unresponsive: Counter,
    joined: Counter,
    inflight: Gauge,
}

/// Disperses blobs to a committee and combines the returned partial signatures into a
/// [Certificate].
#[derive(Clone)]
pub struct Aggregator<W: Writer> {
    cfg: Config,
    committee: Arc<RwLock<Arc<Committee<W>>>>,
    inflight: Arc<Mutex<HashMap<Request, Waiters>>>,
    metrics: Metrics,
}

/// Clears a round from the in-flight set when dropped (even if the leader is canceled).
struct Round {
    inflight: Arc<Mutex<HashMap<Request, Waiters>>>,
    request: Request,
    gauge: Gauge,
}

impl Round {
    /// Hand the result of the round to every joined submitter.
    fn finish(self, result: &Result<Certificate, Error>) {
        let waiters = self
            .inflight
            .lock()
            .unwrap()
            .remove(&self.request)
            .unwrap_or_default();
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

impl Drop for Round {
    fn drop(&mut self) {
        // Dropping any remaining waiters cancels them
        self.inflight.lock().unwrap().remove(&self.request);
        self.gauge.dec();
    }
}

/// Store requests still running for a round, aborted when dropped.
///
/// Dropping the round (even if the submitter is canceled) stops waiting on the rest of the
/// committee.
struct Dispatches(Vec<JoinHandle<()>>);

impl Drop for Dispatches {
    fn drop(&mut self) {
        for dispatch in &self.0 {
            dispatch.abort();
        }
    }
}

impl<W: Writer> Aggregator<W> {
    pub fn new(cfg: Config, committee: Committee<W>) -> Self {
        Self {
            cfg,
            committee: Arc::new(RwLock::new(Arc::new(committee))),
            inflight: Arc::new(Mutex::new(HashMap::new())),
            metrics: Metrics::default(),
        }
    }

    /// Register metrics with the provided registry.
    pub fn register(&self, registry: &mut Registry) {
        let metrics = &self.metrics;
        registry.register("submissions", "submitted blobs", metrics.submissions.clone());
        registry.register("certificates", "produced certificates", metrics.certificates.clone());
        registry.register(
            "insufficient",
            "rounds that collected too few signatures",
            metrics.insufficient.clone(),
        );
        registry.register(
            "rejected_partials",
            "partial signatures that failed validation",
            metrics.rejected_partials.clone(),
        );
        registry.register(
            "unresponsive",
            "members that failed or did not respond in time",
            metrics.unresponsive.clone(),
        );
        registry.register(
            "joined",
            "submissions that joined a running round",
            metrics.joined.clone(),
        );
        registry.register("inflight", "running rounds", metrics.inflight.clone());
    }

    /// Keyset of the current committee.
    pub fn keyset(&self) -> Arc<Keyset> {
        self.committee.read().unwrap().keyset.clone()
    }

    /// Replace the committee used by future submissions.
    ///
    /// Running rounds finish with the committee they started with.
    pub fn rotate(&self, committee: Committee<W>) {
        let keyset = committee.keyset.hash();
        *self.committee.write().unwrap() = Arc::new(committee);
        info!(?keyset, "rotated committee");
    }

    /// Disperse `message` to the committee and return a [Certificate] attesting that at least
    /// `assumed_honest` members retain it until `timeout`.
    ///
    /// Concurrent submissions of the same `message` and `timeout` share a single round.
    pub async fn submit(&self, message: Bytes, timeout: u64) -> Result<Certificate, Error> {
        self.metrics.submissions.inc();
        let data_hash = hash(&message);
        let request = (data_hash, timeout);

        // Join a running round for the same request (if any)
        let joined = {
            let mut inflight = self.inflight.lock().unwrap();
            match inflight.get_mut(&request) {
                Some(waiters) => {
                    let (sender, receiver) = oneshot::channel();
                    waiters.push(sender);
                    Some(receiver)
                }
                None => {
                    inflight.insert(request, Vec::new());
                    None
                }
            }
        };
        if let Some(receiver) = joined {
            self.metrics.joined.inc();
            debug!(?data_hash, timeout, "joined running round");
            return receiver.await.unwrap_or(Err(Error::Canceled));
        }

        // Lead the round
        self.metrics.inflight.inc();
        let round = Round {
            inflight: self.inflight.clone(),
            request,
            gauge: self.metrics.inflight.clone(),
        };
        let committee = self.committee.read().unwrap().clone();
        let result = self.collect(&committee, message, data_hash, timeout).await;
        round.finish(&result);
        result
    }

    async fn collect(
        &self,
        committee: &Committee<W>,
        message: Bytes,
        data_hash: Digest,
        timeout: u64,
    ) -> Result<Certificate, Error> {
        let keyset = &committee.keyset;
        let threshold = keyset.assumed_honest();
        let signable = signable_fields(&data_hash, timeout);
        let deadline = Instant::now() + self.cfg.timeout;
        let signature = self
            .cfg
            .requester
            .as_ref()
            .map(|key| origination::sign(key, &data_hash, timeout))
            .unwrap_or_default();

        // Dispatch to every member
        let (sender, mut receiver) = mpsc::unbounded::<(u32, Result<PartialSignature, Error>)>();
        let mut dispatches = Dispatches(Vec::with_capacity(committee.writers.len()));
        for (index, writer) in committee.writers.iter().enumerate() {
            let index = index as u32;
            let writer = writer.clone();
            let message = message.clone();
            let signature = signature.clone();
            let sender = sender.clone();
            dispatches.0.push(tokio::spawn(async move {
                let result = writer.store(message, timeout, signature).await;
                let _ = sender.unbounded_send((index, result));
            }));
        }
        drop(sender);

        // Collect partial signatures until the outcome is known
        let mut accepted: BTreeMap<u32, Signature> = BTreeMap::new();
        let mut outstanding = committee.writers.len() as u64;
        let sleep = sleep_until(deadline);
        tokio::pin!(sleep);
        while outstanding > 0 {
            let count = accepted.len() as u64;
            if self.cfg.stop_at_threshold && count >= threshold {
                debug!(?data_hash, count, outstanding, "reached threshold");
                break;
            }
            if count + outstanding < threshold {
                debug!(?data_hash, count, outstanding, "threshold unreachable");
                break;
            }
            tokio::select! {
                _ = &mut sleep => {
                    warn!(?data_hash, count, outstanding, "deadline elapsed");
                    self.metrics.unresponsive.inc_by(outstanding);
                    break;
                },
                response = receiver.next() => {
                    let Some((index, result)) = response else {
                        break;
                    };
                    outstanding -= 1;

                    // Error handling
                    let partial = match result {
                        Ok(partial) => partial,
                        Err(err) => {
                            debug!(?data_hash, index, ?err, "member failed to store");
                            self.metrics.unresponsive.inc();
                            continue;
                        }
                    };
                    let Some(public) = keyset.public(partial.index) else {
                        warn!(?data_hash, index, claimed = partial.index, "partial signature from unknown member");
                        self.metrics.rejected_partials.inc();
                        continue;
                    };
                    if partial.index != index {
                        warn!(?data_hash, index, claimed = partial.index, "partial signature for wrong index");
                        self.metrics.rejected_partials.inc();
                        continue;
                    }
                    if let Err(err) = public.verify(&signable, &partial.signature) {
                        warn!(?data_hash, index, ?err, "invalid partial signature");
                        self.metrics.rejected_partials.inc();
                        continue;
                    }
                    debug!(?data_hash, index, "accepted partial signature");
                    accepted.insert(index, partial.signature);
                },
            }
        }

        // Stop waiting on the rest of the committee (members finish any write they started)
        drop(dispatches);

        // Combine in index order
        let signers = accepted.len() as u64;
        if signers < threshold {
            warn!(?data_hash, signers, threshold, "insufficient signers");
            self.metrics.insufficient.inc();
            return Err(Error::InsufficientSigners(signers, threshold));
        }
        let mask = accepted.keys().fold(0u64, |mask, index| mask | (1u64 << *index));
        let signature = aggregate_signatures(accepted.values());
        let certificate = Certificate::new(keyset.hash(), data_hash, timeout, mask, signature);
        self.metrics.certificates.inc();
        info!(?data_hash, timeout, signers, mask, keyset = ?keyset.hash(), "produced certificate");
        Ok(certificate)
    }
}

impl<W: Writer> Display for Aggregator<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let keyset = self.keyset();
        write!(
            f,
            "Aggregator(keyset={}, members={}, assumed_honest={})",
            keyset.hash(),
            keyset.len(),
            keyset.assumed_honest()
        )
    }
}
