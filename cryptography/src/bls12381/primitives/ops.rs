//! Signing, verification, and aggregation over BLS12-381.
//!
//! All signers of an aggregate sign the same message, so an aggregate signature can be
//! checked against the sum of the signers' public keys with a single pairing product.

use super::{
    group::{Element, Private, Public, Scalar, Signature, DST, G1_MESSAGE, G1_PROOF_OF_POSSESSION},
    Error,
};
use blst::{Pairing as blst_pairing, BLS12_381_NEG_G2};
use rand::{CryptoRng, RngCore};

/// Returns a new keypair derived from the provided randomness.
pub fn keypair<R: RngCore + CryptoRng>(rng: &mut R) -> (Private, Public) {
    let private = Scalar::rand(rng);
    let public = compute_public(&private);
    (private, public)
}

/// Computes the public key from the private key.
pub fn compute_public(private: &Private) -> Public {
    let mut public = Public::generator();
    public.mul(private);
    public
}

/// Hashes the provided message with the domain separation tag (DST) to the curve.
pub fn hash_message(dst: DST, message: &[u8]) -> Signature {
    Signature::hash_to_curve(dst, message)
}

/// Signs the provided message with the private key under the given DST.
pub fn sign(private: &Private, dst: DST, message: &[u8]) -> Signature {
    let mut s = hash_message(dst, message);
    s.mul(private);
    s
}

/// Verifies that `e(pk,hm)` is equal to `e(G2::generator(),sig)` using a single product check with
/// a negated G2 generator (`e(pk,hm) * e(-G2::generator(),sig) == 1`).
pub fn verify(public: &Public, dst: DST, message: &[u8], signature: &Signature) -> Result<(), Error> {
    let hm = hash_message(dst, message);

    // We only handle pre-hashed messages, so we leave the DST of the context empty.
    let mut pairing = blst_pairing::new(false, &[]);

    // Aggregate `e(-G2::generator(), sig)`
    let q = signature.as_blst_p1_affine();
    unsafe {
        pairing.raw_aggregate(&BLS12_381_NEG_G2, &q);
    }

    // Aggregate `e(pk,hm)`
    let p = public.as_blst_p2_affine();
    let q = hm.as_blst_p1_affine();
    pairing.raw_aggregate(&p, &q);

    pairing.commit();
    if !pairing.finalverify(None) {
        return Err(Error::InvalidSignature);
    }
    Ok(())
}

/// Signs a message.
///
/// # Determinism
///
/// Signatures produced by this function are deterministic, so re-signing the same message
/// always yields the same signature.
pub fn sign_message(private: &Private, message: &[u8]) -> Signature {
    sign(private, G1_MESSAGE, message)
}

/// Verifies a signature over a message.
pub fn verify_message(public: &Public, message: &[u8], signature: &Signature) -> Result<(), Error> {
    verify(public, G1_MESSAGE, message, signature)
}

/// Generates a proof that the holder of `private` controls the corresponding public key.
pub fn sign_proof_of_possession(private: &Private) -> Signature {
    let public = compute_public(private);
    sign(private, G1_PROOF_OF_POSSESSION, &public.to_bytes())
}

/// Verifies a proof of possession for the provided public key.
pub fn verify_proof_of_possession(public: &Public, signature: &Signature) -> Result<(), Error> {
    verify(public, G1_PROOF_OF_POSSESSION, &public.to_bytes(), signature)
}

/// Combines multiple public keys into an aggregate public key.
///
/// # Warning
///
/// This function assumes a group check was already performed on all `public_keys`, that each
/// public key is unique, and that a proof of possession was checked for each of them.
pub fn aggregate_public_keys<'a, I>(public_keys: I) -> Public
where
    I: IntoIterator<Item = &'a Public>,
{
    let mut p = Public::zero();
    for pk in public_keys {
        p.add(pk);
    }
    p
}

/// Combines multiple signatures into an aggregate signature.
///
/// Addition is commutative, so the result does not depend on iteration order.
pub fn aggregate_signatures<'a, I>(signatures: I) -> Signature
where
    I: IntoIterator<Item = &'a Signature>,
{
    let mut s = Signature::zero();
    for sig in signatures {
        s.add(sig);
    }
    s
}

/// Verifies an aggregate signature over a single message from multiple public keys.
///
/// # Warning
///
/// Providing duplicate public keys is not safe.
pub fn aggregate_verify<'a, I>(
    public_keys: I,
    message: &[u8],
    signature: &Signature,
) -> Result<(), Error>
where
    I: IntoIterator<Item = &'a Public>,
{
    let public = aggregate_public_keys(public_keys);
    if public == Public::zero() {
        return Err(Error::InvalidSignature);
    }
    verify_message(&public, message, signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_sign_verify() {
        let mut rng = StdRng::seed_from_u64(0);
        let (private, public) = keypair(&mut rng);
        let signature = sign_message(&private, b"hello");
        verify_message(&public, b"hello", &signature).unwrap();
        assert!(matches!(
            verify_message(&public, b"world", &signature),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(1);
        let (private, _) = keypair(&mut rng);
        assert_eq!(sign_message(&private, b"msg"), sign_message(&private, b"msg"));
    }

    #[test]
    fn test_proof_of_possession() {
        let mut rng = StdRng::seed_from_u64(2);
        let (private, public) = keypair(&mut rng);
        let proof = sign_proof_of_possession(&private);
        verify_proof_of_possession(&public, &proof).unwrap();

        // A message signature is not a proof (different DST)
        let signature = sign_message(&private, &public.to_bytes());
        assert!(verify_proof_of_possession(&public, &signature).is_err());

        // A proof for one key does not transfer to another
        let (_, other) = keypair(&mut rng);
        assert!(verify_proof_of_possession(&other, &proof).is_err());
    }

    #[test]
    fn test_aggregate_verify() {
        let mut rng = StdRng::seed_from_u64(3);
        let keys: Vec<_> = (0..4).map(|_| keypair(&mut rng)).collect();
        let message = b"retain until tomorrow";
        let signatures: Vec<_> = keys
            .iter()
            .map(|(private, _)| sign_message(private, message))
            .collect();
        let aggregate = aggregate_signatures(&signatures);
        aggregate_verify(keys.iter().map(|(_, public)| public), message, &aggregate).unwrap();

        // Missing signer
        assert!(aggregate_verify(
            keys.iter().skip(1).map(|(_, public)| public),
            message,
            &aggregate
        )
        .is_err());

        // No signers
        assert!(aggregate_verify(std::iter::empty(), message, &aggregate).is_err());
    }

    #[test]
    fn test_aggregate_order_independent() {
        let mut rng = StdRng::seed_from_u64(4);
        let signatures: Vec<_> = (0..5)
            .map(|_| {
                let (private, _) = keypair(&mut rng);
                sign_message(&private, b"order")
            })
            .collect();
        let forward = aggregate_signatures(&signatures);
        let backward = aggregate_signatures(signatures.iter().rev());
        assert_eq!(forward, backward);
        assert_eq!(forward.to_bytes(), backward.to_bytes());
    }
}
