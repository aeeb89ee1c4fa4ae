//! Registered committee public keys and the honesty threshold.
//!
//! # Format
//!
//! A [Keyset] is identified by the SHA-256 hash of its canonical serialization (the bytes posted
//! on-chain when the keyset is registered):
//!
//! ```txt
//! +------------------+---------------+----------------------+---------------+-----+
//! | assumed_honest   | member count  | key length (member 0)| key (member 0)| ... |
//! | u64 (big-endian) | u64 (BE)      | u16 (BE) = 96        | 96 bytes      |     |
//! +------------------+---------------+----------------------+---------------+-----+
//! ```

use crate::Error;
use anytrust_cryptography::{bls12381::PUBLIC_KEY_LENGTH, hash, Digest, PublicKey};
use bytes::{Buf, BufMut};
use std::collections::HashSet;

/// Maximum number of members in a [Keyset] (one bit each in the signers mask).
pub const MAX_MEMBERS: usize = u64::BITS as usize;

/// A committee member's position and public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeysetEntry {
    pub index: u32,
    pub public: PublicKey,
}

/// An immutable, ordered set of committee public keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyset {
    entries: Vec<KeysetEntry>,
    assumed_honest: u64,
    hash: Digest,
}

impl Keyset {
    /// Create a keyset in which `publics[i]` is assigned index `i`.
    ///
    /// At least one and at most all members must be assumed honest, no more than [MAX_MEMBERS]
    /// may be provided, and each public key may only appear once.
    pub fn new(publics: Vec<PublicKey>, assumed_honest: u64) -> Result<Self, Error> {
        let len = publics.len();
        if len > MAX_MEMBERS {
            return Err(Error::TooManyMembers(len));
        }
        if assumed_honest == 0 || assumed_honest > len as u64 {
            return Err(Error::InvalidThreshold(assumed_honest, len));
        }
        let mut seen = HashSet::with_capacity(len);
        let mut entries = Vec::with_capacity(len);
        for (index, public) in publics.into_iter().enumerate() {
            let index = index as u32;
            if !seen.insert(public) {
                return Err(Error::DuplicateMember(index));
            }
            entries.push(KeysetEntry { index, public });
        }

        let mut keyset = Self {
            entries,
            assumed_honest,
            hash: Digest::default(),
        };
        keyset.hash = hash(&keyset.serialize());
        Ok(keyset)
    }

    pub fn entries(&self) -> &[KeysetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn assumed_honest(&self) -> u64 {
        self.assumed_honest
    }

    /// The `KeysetHash` certificates refer to.
    pub fn hash(&self) -> Digest {
        self.hash
    }

    /// Public key of the member at `index`, if any.
    pub fn public(&self, index: u32) -> Option<&PublicKey> {
        self.entries.get(index as usize).map(|entry| &entry.public)
    }

    /// Canonical serialization.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(8 + 8 + self.entries.len() * (2 + PUBLIC_KEY_LENGTH));
        buf.put_u64(self.assumed_honest);
        buf.put_u64(self.entries.len() as u64);
        for entry in &self.entries {
            buf.put_u16(PUBLIC_KEY_LENGTH as u16);
            buf.put_slice(&entry.public.to_bytes());
        }
        buf
    }

    /// Parse a canonical serialization and re-check the keyset invariants.
    pub fn deserialize(mut buf: &[u8]) -> Result<Self, Error> {
        if buf.remaining() < 16 {
            return Err(Error::MalformedKeyset);
        }
        let assumed_honest = buf.get_u64();
        let count = buf.get_u64();
        if count > MAX_MEMBERS as u64 {
            return Err(Error::TooManyMembers(count as usize));
        }

        let mut publics = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if buf.remaining() < 2 {
                return Err(Error::MalformedKeyset);
            }
            let len = buf.get_u16() as usize;
            if len != PUBLIC_KEY_LENGTH || buf.remaining() < len {
                return Err(Error::MalformedKeyset);
            }
            let public =
                PublicKey::from_bytes(&buf[..len]).map_err(|_| Error::MalformedKeyset)?;
            buf.advance(len);
            publics.push(public);
        }
        if buf.has_remaining() {
            return Err(Error::MalformedKeyset);
        }
        Self::new(publics, assumed_honest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anytrust_cryptography::PrivateKey;
    use test_case::test_case;

    fn publics(n: u64) -> Vec<PublicKey> {
        (0..n)
            .map(|seed| PrivateKey::from_seed(seed).public_key())
            .collect()
    }

    #[test_case(3, 0 => Err(Error::InvalidThreshold(0, 3)); "zero threshold")]
    #[test_case(3, 1 => Ok(()); "single honest")]
    #[test_case(3, 3 => Ok(()); "all honest")]
    #[test_case(3, 4 => Err(Error::InvalidThreshold(4, 3)); "threshold above size")]
    #[test_case(0, 0 => Err(Error::InvalidThreshold(0, 0)); "empty")]
    #[test_case(0, 1 => Err(Error::InvalidThreshold(1, 0)); "empty with threshold")]
    fn test_threshold_bounds(members: u64, assumed_honest: u64) -> Result<(), Error> {
        Keyset::new(publics(members), assumed_honest).map(|_| ())
    }

    #[test]
    fn test_indices_follow_order() {
        let keys = publics(4);
        let keyset = Keyset::new(keys.clone(), 2).unwrap();
        assert_eq!(keyset.len(), 4);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(keyset.entries()[i].index, i as u32);
            assert_eq!(keyset.public(i as u32), Some(key));
        }
        assert_eq!(keyset.public(4), None);
    }

    #[test]
    fn test_too_many_members() {
        let result = Keyset::new(publics(MAX_MEMBERS as u64 + 1), 1);
        assert_eq!(result, Err(Error::TooManyMembers(MAX_MEMBERS + 1)));
        assert!(Keyset::new(publics(MAX_MEMBERS as u64), 1).is_ok());
    }

    #[test]
    fn test_duplicate_member() {
        let mut keys = publics(3);
        keys.push(keys[1]);
        assert_eq!(Keyset::new(keys, 2), Err(Error::DuplicateMember(3)));
    }

    #[test]
    fn test_hash_binds_contents() {
        let keys = publics(3);
        let keyset = Keyset::new(keys.clone(), 2).unwrap();
        assert_eq!(keyset.hash(), hash(&keyset.serialize()));

        // Same keys, different threshold
        let other = Keyset::new(keys.clone(), 1).unwrap();
        assert_ne!(keyset.hash(), other.hash());

        // Same keys, different order
        let mut reversed = keys;
        reversed.reverse();
        let other = Keyset::new(reversed, 2).unwrap();
        assert_ne!(keyset.hash(), other.hash());
    }

    #[test]
    fn test_serialization() {
        let keyset = Keyset::new(publics(3), 2).unwrap();
        let bytes = keyset.serialize();
        assert_eq!(bytes.len(), 16 + 3 * (2 + PUBLIC_KEY_LENGTH));
        assert_eq!(&bytes[..8], &2u64.to_be_bytes());
        assert_eq!(&bytes[8..16], &3u64.to_be_bytes());
        assert_eq!(&bytes[16..18], &(PUBLIC_KEY_LENGTH as u16).to_be_bytes());

        let decoded = Keyset::deserialize(&bytes).unwrap();
        assert_eq!(decoded, keyset);
        assert_eq!(decoded.hash(), keyset.hash());
    }

    #[test]
    fn test_deserialize_rejects_malformed() {
        let bytes = Keyset::new(publics(2), 1).unwrap().serialize();

        // Truncated
        assert_eq!(
            Keyset::deserialize(&bytes[..bytes.len() - 1]),
            Err(Error::MalformedKeyset)
        );
        assert_eq!(Keyset::deserialize(&bytes[..10]), Err(Error::MalformedKeyset));

        // Trailing bytes
        let mut extended = bytes.clone();
        extended.push(0);
        assert_eq!(Keyset::deserialize(&extended), Err(Error::MalformedKeyset));

        // Wrong key length
        let mut wrong = bytes.clone();
        wrong[17] = 95;
        assert_eq!(Keyset::deserialize(&wrong), Err(Error::MalformedKeyset));

        // Invalid threshold is caught after parsing
        let mut threshold = bytes;
        threshold[7] = 3;
        assert_eq!(
            Keyset::deserialize(&threshold),
            Err(Error::InvalidThreshold(3, 2))
        );
    }
}
