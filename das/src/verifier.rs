use crate::{registry::KeysetLookup, Certificate, Error};
use anytrust_cryptography::bls12381::aggregate_verify;
use tracing::debug;

/// Check that `certificate` carries a valid aggregate signature from at least `assumed_honest`
/// members of the keyset it refers to.
///
/// Checks run in order: the keyset must be registered, every signer bit must refer to a member,
/// enough members must have signed, and the aggregate signature must verify against the public
/// keys of exactly the signers.
pub fn verify(certificate: &Certificate, lookup: &impl KeysetLookup) -> Result<(), Error> {
    let keyset_hash = certificate.keyset_hash();
    let keyset = lookup
        .keyset(keyset_hash)
        .ok_or(Error::UnknownKeyset(*keyset_hash))?;

    // Every signer must exist in the keyset
    let mask = certificate.signers_mask();
    if keyset.len() < u64::BITS as usize && mask >> keyset.len() != 0 {
        debug!(?keyset_hash, mask, members = keyset.len(), "signer outside of keyset");
        return Err(Error::MalformedCertificate);
    }

    // Enough members must have signed
    let signers = certificate.signer_count();
    if signers < keyset.assumed_honest() {
        return Err(Error::InsufficientSigners(signers, keyset.assumed_honest()));
    }

    // The aggregate must come from exactly the signers
    let publics = certificate
        .signers()
        .filter_map(|index| keyset.public(index));
    aggregate_verify(publics, &certificate.signable(), certificate.signature())
        .map_err(|_| Error::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{registry::Registry, wire::signable_fields, Keyset};
    use anytrust_cryptography::{
        bls12381::aggregate_signatures, hash, PrivateKey, Signature,
    };
    use std::sync::Arc;

    const TIMEOUT: u64 = 1_700_000_000;

    fn committee(seeds: std::ops::Range<u64>, assumed_honest: u64) -> (Vec<PrivateKey>, Keyset) {
        let privates: Vec<_> = seeds.map(PrivateKey::from_seed).collect();
        let publics = privates.iter().map(|p| p.public_key()).collect();
        (privates, Keyset::new(publics, assumed_honest).unwrap())
    }

    /// Build a certificate signed by `signers` (indices into `privates`).
    fn certify(privates: &[PrivateKey], keyset: &Keyset, signers: &[u32]) -> Certificate {
        let data_hash = hash(b"blob");
        let signable = signable_fields(&data_hash, TIMEOUT);
        let signatures: Vec<Signature> = signers
            .iter()
            .map(|&i| privates[i as usize].sign(&signable))
            .collect();
        let mask = signers.iter().fold(0u64, |mask, &i| mask | (1u64 << i));
        Certificate::new(
            keyset.hash(),
            data_hash,
            TIMEOUT,
            mask,
            aggregate_signatures(&signatures),
        )
    }

    #[test]
    fn test_verify() {
        let (privates, keyset) = committee(0..4, 2);
        let keyset = Arc::new(keyset);
        verify(&certify(&privates, &keyset, &[0, 2]), &keyset).unwrap();
        verify(&certify(&privates, &keyset, &[0, 1, 2, 3]), &keyset).unwrap();
    }

    #[test]
    fn test_unknown_keyset() {
        let (privates, keyset) = committee(0..3, 2);
        let certificate = certify(&privates, &keyset, &[0, 1]);
        let registry = Registry::new();
        assert_eq!(
            verify(&certificate, &registry),
            Err(Error::UnknownKeyset(keyset.hash()))
        );

        // Revoked keysets are unknown
        let hash = registry.register(keyset);
        verify(&certificate, &registry).unwrap();
        registry.revoke(&hash);
        assert_eq!(
            verify(&certificate, &registry),
            Err(Error::UnknownKeyset(hash))
        );
    }

    #[test]
    fn test_signer_outside_keyset() {
        let (privates, keyset) = committee(0..4, 2);
        let (_, smaller) = committee(0..3, 2);
        // Signed by member 3, which doesn't exist in a 3-member keyset claiming the same hash
        let certificate = certify(&privates, &keyset, &[0, 3]);
        let certificate = Certificate::new(
            smaller.hash(),
            *certificate.data_hash(),
            certificate.timeout(),
            certificate.signers_mask(),
            *certificate.signature(),
        );
        assert_eq!(
            verify(&certificate, &Arc::new(smaller)),
            Err(Error::MalformedCertificate)
        );
    }

    #[test]
    fn test_insufficient_signers_with_valid_signature() {
        let (privates, keyset) = committee(0..4, 3);
        let keyset = Arc::new(keyset);
        let certificate = certify(&privates, &keyset, &[1, 2]);

        // The aggregate itself is valid for its signers
        let publics = [keyset.public(1).unwrap(), keyset.public(2).unwrap()];
        aggregate_verify(publics, &certificate.signable(), certificate.signature()).unwrap();
        assert_eq!(
            verify(&certificate, &keyset),
            Err(Error::InsufficientSigners(2, 3))
        );
    }

    #[test]
    fn test_wrong_keyset() {
        // K1 and K2 have the same size and threshold but different keys
        let (privates, first) = committee(0..3, 2);
        let (_, second) = committee(3..6, 2);
        let certificate = certify(&privates, &first, &[0, 1]);

        // A lookup that (incorrectly) resolves the hash to K2
        struct Substitute(Arc<Keyset>);
        impl KeysetLookup for Substitute {
            fn keyset(&self, _: &anytrust_cryptography::Digest) -> Option<Arc<Keyset>> {
                Some(self.0.clone())
            }
        }
        assert_eq!(
            verify(&certificate, &Substitute(Arc::new(second))),
            Err(Error::InvalidSignature)
        );
        verify(&certificate, &Substitute(Arc::new(first))).unwrap();
    }

    #[test]
    fn test_mask_mismatch() {
        let (privates, keyset) = committee(0..3, 2);
        let keyset = Arc::new(keyset);
        let certificate = certify(&privates, &keyset, &[0, 1]);

        // Claim a different signer set for the same aggregate
        let certificate = Certificate::new(
            keyset.hash(),
            *certificate.data_hash(),
            certificate.timeout(),
            0b110,
            *certificate.signature(),
        );
        assert_eq!(verify(&certificate, &keyset), Err(Error::InvalidSignature));
    }

    #[test]
    fn test_tampered_timeout() {
        let (privates, keyset) = committee(0..3, 2);
        let keyset = Arc::new(keyset);
        let certificate = certify(&privates, &keyset, &[0, 1, 2]);
        let certificate = Certificate::new(
            keyset.hash(),
            *certificate.data_hash(),
            certificate.timeout() + 1,
            certificate.signers_mask(),
            *certificate.signature(),
        );
        assert_eq!(verify(&certificate, &keyset), Err(Error::InvalidSignature));
    }
}
