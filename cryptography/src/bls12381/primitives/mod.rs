//! Operations over the BLS12-381 curve.
//!
//! # Acknowledgements
//!
//! _The following crates were used as a reference when implementing this crate. If code is very similar
//! to the reference, it is accompanied by a comment and link._
//!
//! * <https://github.com/filecoin-project/blstrs> + <https://github.com/MystenLabs/fastcrypto>: Implementing operations over
//!   the BLS12-381 curve with <https://github.com/supranational/blst>.
//!
//! # Example
//!
//! ```rust
//! use anytrust_cryptography::bls12381::primitives::ops::{
//!     aggregate_signatures, aggregate_verify, keypair, sign_message, verify_message,
//! };
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let message = b"hello world";
//!
//! // Every member signs the same message
//! let keys: Vec<_> = (0..3).map(|_| keypair(&mut rng)).collect();
//! let signatures: Vec<_> = keys.iter().map(|(private, _)| sign_message(private, message)).collect();
//! for ((_, public), signature) in keys.iter().zip(&signatures) {
//!     verify_message(public, message, signature).expect("signature should be valid");
//! }
//!
//! // Combine and verify against the signers' public keys
//! let aggregate = aggregate_signatures(&signatures);
//! aggregate_verify(keys.iter().map(|(_, public)| public), message, &aggregate)
//!     .expect("aggregate should be valid");
//! ```

pub mod group;
pub mod ops;

use thiserror::Error;

/// Errors that can occur when working with BLS12-381 primitives.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid signature")]
    InvalidSignature,
}
