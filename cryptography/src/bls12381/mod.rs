//! Signatures and aggregate signatures over the BLS12-381 curve.
//!
//! Committee members sign with [PrivateKey], publish a [PublicKey] together with a proof of
//! possession, and an aggregator folds many [Signature]s over the same message into one.
//!
//! # Features
//!
//! This crate has the following features:
//!
//! - `portable`: Enables `portable` feature on `blst` (<https://github.com/supranational/blst?tab=readme-ov-file#platform-and-language-compatibility>).

pub mod primitives;
mod scheme;
pub use scheme::{
    aggregate_signatures, aggregate_verify, PrivateKey, PublicKey, Signature,
    PRIVATE_KEY_LENGTH, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH,
};
