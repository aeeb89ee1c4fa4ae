//! Disperse blobs to a committee and aggregate their attestations into a [crate::Certificate].
//!
//! # Design
//!
//! Each submission snapshots the current [Committee] and dispatches the blob to every member on
//! its own task. Responses are checked as they arrive: a response from the wrong index or with a
//! signature that does not verify against the member's key is discarded. Collection stops once
//! every member has responded, the deadline elapses, enough members failed that the threshold can
//! no longer be reached, or (if [Config::stop_at_threshold] is set) the threshold is reached.
//!
//! If at least `assumed_honest` partial signatures were accepted, they are aggregated (in index
//! order) into a certificate whose signers mask is exactly the accepted set. Otherwise, the
//! submission fails with [crate::Error::InsufficientSigners] and nothing is retained.
//!
//! Only one round runs at a time for the same blob and timeout: concurrent submissions join the
//! running round and receive its result.

use ed25519_consensus::SigningKey;
use std::time::Duration;

mod engine;
pub use engine::{Aggregator, Committee};

/// Configuration for an [Aggregator].
#[derive(Clone)]
pub struct Config {
    /// How long to wait for members to respond.
    pub timeout: Duration,

    /// Stop collecting as soon as `assumed_honest` partial signatures are accepted (instead of
    /// waiting for every member).
    pub stop_at_threshold: bool,

    /// Key used to sign store requests (if members only accept a known requester).
    pub requester: Option<SigningKey>,
}
