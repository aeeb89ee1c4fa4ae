//! Typed BLS12-381 keys and signatures.
//!
//! This implementation uses the `blst` crate for BLS12-381 operations. This
//! crate implements serialization according to the "ZCash BLS12-381" specification
//! (<https://github.com/supranational/blst/tree/master?tab=readme-ov-file#serialization-format>) and
//! hashes messages according to RFC 9380.
//!
//! # Example
//! ```rust
//! use anytrust_cryptography::bls12381::PrivateKey;
//! use rand::rngs::OsRng;
//!
//! // Generate a new private key
//! let signer = PrivateKey::from_rng(&mut OsRng);
//!
//! // Sign a message
//! let msg = b"hello, world!";
//! let signature = signer.sign(msg);
//!
//! // Verify the signature
//! assert!(signer.public_key().verify(msg, &signature).is_ok());
//! ```

use super::primitives::{
    group::{self, Element},
    ops,
};
use crate::Error;
use rand::{CryptoRng, Rng, SeedableRng};
use std::fmt::{Debug, Display, Formatter};
use zeroize::Zeroize;

/// Length of an encoded [PrivateKey].
pub const PRIVATE_KEY_LENGTH: usize = group::SCALAR_LENGTH;

/// Length of an encoded [PublicKey].
pub const PUBLIC_KEY_LENGTH: usize = group::G2_LENGTH;

/// Length of an encoded [Signature].
pub const SIGNATURE_LENGTH: usize = group::G1_LENGTH;

/// A BLS12-381 private key, zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey {
    private: group::Private,
    public: group::Public,
}

impl PrivateKey {
    /// Create a fresh [PrivateKey] using the supplied RNG.
    pub fn from_rng<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        let (private, public) = ops::keypair(rng);
        Self { private, public }
    }

    /// Create a [PrivateKey] from a seed.
    ///
    /// # Warning
    ///
    /// This function is insecure and should only be used for examples
    /// and testing.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        Self::from_rng(&mut rng)
    }

    /// Decode a big-endian scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let private = group::Private::from_bytes(bytes).ok_or(Error::InvalidPrivateKey)?;
        if private == group::Private::zero() {
            return Err(Error::InvalidPrivateKey);
        }
        let public = ops::compute_public(&private);
        Ok(Self { private, public })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.private.to_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.public)
    }

    /// Sign a message.
    ///
    /// The message should not be hashed prior to calling this function.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(ops::sign_message(&self.private, message))
    }

    /// Prove control of the private key behind [PrivateKey::public_key].
    pub fn proof_of_possession(&self) -> Signature {
        Signature(ops::sign_proof_of_possession(&self.private))
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.private == other.private
    }
}

impl Eq for PrivateKey {}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey({})", self.public_key())
    }
}

/// A BLS12-381 public key (compressed G2 point).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(group::Public);

impl PublicKey {
    /// Decode a compressed public key, rejecting the identity and points outside of G2.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        group::Public::from_bytes(bytes)
            .map(Self)
            .ok_or(Error::InvalidPublicKey)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Verify a signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), Error> {
        ops::verify_message(&self.0, message, &signature.0).map_err(|_| Error::InvalidSignature)
    }

    /// Verify a proof of possession for this key.
    pub fn verify_proof_of_possession(&self, proof: &Signature) -> Result<(), Error> {
        ops::verify_proof_of_possession(&self.0, &proof.0).map_err(|_| Error::InvalidSignature)
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// A BLS12-381 signature (compressed G1 point).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(group::Signature);

impl Signature {
    /// Decode a compressed signature, rejecting the identity and points outside of G1.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        group::Signature::from_bytes(bytes)
            .map(Self)
            .ok_or(Error::InvalidSignature)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// Combine signatures over the same message into one.
pub fn aggregate_signatures<'a, I>(signatures: I) -> Signature
where
    I: IntoIterator<Item = &'a Signature>,
{
    Signature(ops::aggregate_signatures(
        signatures.into_iter().map(|s| &s.0),
    ))
}

/// Verify an aggregate signature over `message` against the public keys of exactly its signers.
///
/// # Warning
///
/// Callers must only pass keys whose proof of possession was checked, and each key only once.
pub fn aggregate_verify<'a, I>(public_keys: I, message: &[u8], signature: &Signature) -> Result<(), Error>
where
    I: IntoIterator<Item = &'a PublicKey>,
{
    ops::aggregate_verify(public_keys.into_iter().map(|p| &p.0), message, &signature.0)
        .map_err(|_| Error::InvalidSignature)
}
