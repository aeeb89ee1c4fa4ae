//! Group operations over BLS12-381.
//!
//! Public keys are elements of [G2] and signatures are elements of [G1] (the "min-sig"
//! variant), so the signature carried by every certificate is 48 bytes.
//!
//! # Warning
//!
//! Points received from untrusted sources must be checked to belong to the correct subgroup
//! to prevent small subgroup attacks. [Element::from_bytes] performs this check (and rejects
//! the point at infinity), so always decode through it.

use blst::{
    blst_bendian_from_scalar, blst_fr, blst_fr_from_scalar, blst_hash_to_g1, blst_keygen,
    blst_p1, blst_p1_add_or_double, blst_p1_affine, blst_p1_compress, blst_p1_from_affine,
    blst_p1_in_g1, blst_p1_is_inf, blst_p1_mult, blst_p1_to_affine, blst_p1_uncompress, blst_p2,
    blst_p2_add_or_double, blst_p2_affine, blst_p2_compress, blst_p2_from_affine, blst_p2_in_g2,
    blst_p2_is_inf, blst_p2_mult, blst_p2_to_affine, blst_p2_uncompress, blst_scalar,
    blst_scalar_fr_check, blst_scalar_from_bendian, blst_scalar_from_fr, BLS12_381_G1,
    BLS12_381_G2, BLST_ERROR,
};
use rand::{CryptoRng, RngCore};
use std::{
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    ptr,
};
use zeroize::Zeroize;

/// Domain separation tag used when hashing to the curve.
pub type DST = &'static [u8];

/// Domain separation tag for signing messages (proof-of-possession ciphersuite).
pub const G1_MESSAGE: DST = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_POP_";

/// Domain separation tag for proofs of possession.
pub const G1_PROOF_OF_POSSESSION: DST = b"BLS_POP_BLS12381G1_XMD:SHA-256_SSWU_RO_POP_";

/// Length of an encoded [Scalar].
pub const SCALAR_LENGTH: usize = 32;

/// Length of a compressed [G1] point.
pub const G1_LENGTH: usize = 48;

/// Length of a compressed [G2] point.
pub const G2_LENGTH: usize = 96;

/// A point on one of the curve's prime-order subgroups.
pub trait Element: Copy + Eq + Send + Sync + Sized {
    /// The point at infinity.
    fn zero() -> Self;

    /// The fixed generator of the subgroup.
    fn generator() -> Self;

    fn add(&mut self, rhs: &Self);

    /// Multiplies self by `rhs` in-place.
    fn mul(&mut self, rhs: &Scalar);

    /// Compressed encoding.
    fn to_bytes(&self) -> Vec<u8>;

    /// Decodes a compressed point, rejecting infinity and points outside the subgroup.
    fn from_bytes(bytes: &[u8]) -> Option<Self>;
}

/// An element of the scalar field (a private key).
#[derive(Clone, Copy, Eq, PartialEq)]
#[repr(transparent)]
pub struct Scalar(blst_fr);

/// Compressed G1 point.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct G1(blst_p1);

/// Compressed G2 point.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct G2(blst_p2);

pub type Private = Scalar;
pub type Public = G2;
pub type Signature = G1;

impl Scalar {
    /// Derives a non-zero scalar from fresh key material (IKM) drawn from `rng`.
    pub fn rand<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut ikm = [0u8; 64];
        loop {
            rng.fill_bytes(&mut ikm);
            let mut fr = blst_fr::default();
            unsafe {
                let mut sc = blst_scalar::default();
                blst_keygen(&mut sc, ikm.as_ptr(), ikm.len(), ptr::null(), 0);
                blst_fr_from_scalar(&mut fr, &sc);
            }
            let scalar = Self(fr);
            if scalar != Self::zero() {
                ikm.zeroize();
                return scalar;
            }
        }
    }

    pub fn zero() -> Self {
        Self(blst_fr::default())
    }

    /// Big-endian encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = [0u8; SCALAR_LENGTH];
        unsafe {
            let mut sc = blst_scalar::default();
            blst_scalar_from_fr(&mut sc, &self.0);
            blst_bendian_from_scalar(out.as_mut_ptr(), &sc);
        }
        out.to_vec()
    }

    /// Decodes a big-endian scalar, rejecting values outside the field.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SCALAR_LENGTH {
            return None;
        }
        let mut fr = blst_fr::default();
        unsafe {
            let mut sc = blst_scalar::default();
            blst_scalar_from_bendian(&mut sc, bytes.as_ptr());
            if !blst_scalar_fr_check(&sc) {
                return None;
            }
            blst_fr_from_scalar(&mut fr, &sc);
        }
        Some(Self(fr))
    }

    /// Little-endian scalar and its bit length, as expected by the blst multiplication routines.
    fn as_multiplier(&self) -> (blst_scalar, usize) {
        let mut sc = blst_scalar::default();
        unsafe { blst_scalar_from_fr(&mut sc, &self.0) };
        let bits = match sc.b.iter().rposition(|byte| *byte != 0) {
            Some(top) => top * 8 + (8 - sc.b[top].leading_zeros() as usize),
            None => 0,
        };
        (sc, bits)
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0.l.zeroize();
    }
}

/// Implements [Element] and the byte-based comparison traits for a blst projective point.
///
/// Projective coordinates are not unique, so equality and hashing go through the compressed
/// encoding.
macro_rules! impl_element {
    (
        $point:ident, $raw:ty, $affine:ty, $length:expr, $generator:expr,
        $from_affine:ident, $to_affine:ident, $add:ident, $mult:ident,
        $compress:ident, $uncompress:ident, $is_inf:ident, $in_group:ident
    ) => {
        impl $point {
            fn affine(&self) -> $affine {
                let mut affine = <$affine>::default();
                unsafe { $to_affine(&mut affine, &self.0) };
                affine
            }
        }

        impl Element for $point {
            fn zero() -> Self {
                Self(<$raw>::default())
            }

            fn generator() -> Self {
                let mut raw = <$raw>::default();
                unsafe { $from_affine(&mut raw, &$generator) };
                Self(raw)
            }

            fn add(&mut self, rhs: &Self) {
                unsafe { $add(&mut self.0, &self.0, &rhs.0) };
            }

            fn mul(&mut self, rhs: &Scalar) {
                let (sc, bits) = rhs.as_multiplier();
                unsafe { $mult(&mut self.0, &self.0, sc.b.as_ptr(), bits) };
            }

            fn to_bytes(&self) -> Vec<u8> {
                let mut out = [0u8; $length];
                unsafe { $compress(out.as_mut_ptr(), &self.0) };
                out.to_vec()
            }

            fn from_bytes(bytes: &[u8]) -> Option<Self> {
                if bytes.len() != $length {
                    return None;
                }
                let mut affine = <$affine>::default();
                let mut raw = <$raw>::default();
                unsafe {
                    if $uncompress(&mut affine, bytes.as_ptr()) != BLST_ERROR::BLST_SUCCESS {
                        return None;
                    }
                    $from_affine(&mut raw, &affine);
                    if $is_inf(&raw) || !$in_group(&raw) {
                        return None;
                    }
                }
                Some(Self(raw))
            }
        }

        impl PartialEq for $point {
            fn eq(&self, other: &Self) -> bool {
                self.to_bytes() == other.to_bytes()
            }
        }

        impl Eq for $point {}

        impl Hash for $point {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.to_bytes().hash(state);
            }
        }

        impl Debug for $point {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.to_bytes()))
            }
        }
    };
}

impl_element!(
    G1,
    blst_p1,
    blst_p1_affine,
    G1_LENGTH,
    BLS12_381_G1,
    blst_p1_from_affine,
    blst_p1_to_affine,
    blst_p1_add_or_double,
    blst_p1_mult,
    blst_p1_compress,
    blst_p1_uncompress,
    blst_p1_is_inf,
    blst_p1_in_g1
);

impl_element!(
    G2,
    blst_p2,
    blst_p2_affine,
    G2_LENGTH,
    BLS12_381_G2,
    blst_p2_from_affine,
    blst_p2_to_affine,
    blst_p2_add_or_double,
    blst_p2_mult,
    blst_p2_compress,
    blst_p2_uncompress,
    blst_p2_is_inf,
    blst_p2_in_g2
);

impl G1 {
    /// Hashes `message` onto G1 under `dst`.
    pub fn hash_to_curve(dst: DST, message: &[u8]) -> Self {
        let mut raw = blst_p1::default();
        unsafe {
            blst_hash_to_g1(
                &mut raw,
                message.as_ptr(),
                message.len(),
                dst.as_ptr(),
                dst.len(),
                ptr::null(),
                0,
            );
        }
        Self(raw)
    }

    pub(crate) fn as_blst_p1_affine(&self) -> blst_p1_affine {
        self.affine()
    }
}

impl G2 {
    pub(crate) fn as_blst_p2_affine(&self) -> blst_p2_affine {
        self.affine()
    }
}
