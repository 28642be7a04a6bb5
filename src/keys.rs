// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// PrivateKey/PublicKey, wrapping `secp256k1` opaquely the same way the
// teacher lineage's `pubkeys.rs` wraps `secp256k1::PublicKey`, applied
// symmetrically to the private side with the zeroization the spec's design
// notes (§3, §9) demand: this crate's target runtime, unlike the source's
// GC'd one, can and must wipe key memory on drop.

use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{PublicKey as SecpPublicKey, SecretKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve::{AffinePoint, Scalar};
use crate::Error;

/// Owns a secp256k1 scalar `1 <= d <= n-1`. The backing bytes are
/// zero-wiped on drop; `Debug` never prints the scalar.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    d: [u8; 32],
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").field("d", &"<redacted>").finish()
    }
}

impl PrivateKey {
    /// Generates a fresh key from the system CSPRNG. The only source of
    /// nondeterminism the core introduces (§5).
    pub fn generate() -> Self {
        loop {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            if let Ok(key) = Self::from_bytes(bytes) {
                return key;
            }
        }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, Error> {
        Scalar::from_bytes(bytes)?;
        Ok(PrivateKey { d: bytes })
    }

    pub fn to_bytes(&self) -> [u8; 32] { self.d }

    pub fn scalar(&self) -> Scalar { Scalar::from_bytes(self.d).expect("invariant maintained") }

    pub fn to_public(&self) -> PublicKey {
        let secret = SecretKey::from_slice(&self.d).expect("invariant maintained");
        let pk = SecpPublicKey::from_secret_key(secp256k1::SECP256K1, &secret);
        PublicKey::from_secp(&pk)
    }

    /// `self + k mod n`; used by BRC-42 child-key derivation. Returns
    /// `OutOfRangeScalar` if the sum reduces to zero.
    pub fn add_scalar(&self, k: &[u8; 32]) -> Result<Self, Error> {
        let n = crate::curve::group_order();
        use num_bigint::BigUint;
        let sum = (BigUint::from_bytes_be(&self.d) + BigUint::from_bytes_be(k)) % &n;
        let mut out = [0u8; 32];
        let be = sum.to_bytes_be();
        out[32 - be.len()..].copy_from_slice(&be);
        PrivateKey::from_bytes(out)
    }
}

/// Owns a non-infinity curve point plus its canonical compressed encoding.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PublicKey {
    point: AffinePoint,
    compressed: [u8; 33],
}

impl PublicKey {
    fn from_secp(pk: &SecpPublicKey) -> Self {
        let compressed = pk.serialize();
        let raw = pk.serialize_uncompressed();
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&raw[1..33]);
        y.copy_from_slice(&raw[33..65]);
        PublicKey { point: AffinePoint::Point { x, y }, compressed }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let pk = SecpPublicKey::from_slice(bytes).map_err(|_| Error::NotOnCurve)?;
        Ok(Self::from_secp(&pk))
    }

    pub fn to_compressed(&self) -> [u8; 33] { self.compressed }

    pub fn to_uncompressed(&self) -> [u8; 65] {
        self.point.to_uncompressed().expect("non-infinity invariant")
    }

    pub fn point(&self) -> &AffinePoint { &self.point }

    /// `shared_secret(priv, pub) = compressed(priv * pub)` (§4.E).
    pub fn multiply(&self, scalar: &Scalar) -> Result<PublicKey, Error> {
        let product = AffinePoint::scalar_mul(scalar, &self.point)?;
        let AffinePoint::Point { x, y } = product else {
            return Err(Error::NotOnCurve);
        };
        let compressed = {
            let mut out = [0u8; 33];
            out[0] = if y[31] & 1 == 0 { 0x02 } else { 0x03 };
            out[1..].copy_from_slice(&x);
            out
        };
        Ok(PublicKey { point: AffinePoint::Point { x, y }, compressed })
    }

    pub fn add(&self, other: &PublicKey) -> Result<PublicKey, Error> {
        let sum = AffinePoint::point_add(&self.point, &other.point)?;
        let AffinePoint::Point { x, y } = sum else {
            return Err(Error::NotOnCurve);
        };
        let compressed = {
            let mut out = [0u8; 33];
            out[0] = if y[31] & 1 == 0 { 0x02 } else { 0x03 };
            out[1..].copy_from_slice(&x);
            out
        };
        Ok(PublicKey { point: AffinePoint::Point { x, y }, compressed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_key_debug_elides_scalar() {
        let key = PrivateKey::from_bytes({
            let mut b = [0u8; 32];
            b[31] = 5;
            b
        })
        .unwrap();
        let dbg = format!("{key:?}");
        assert!(!dbg.contains('5'));
        assert!(dbg.contains("redacted"));
    }

    #[test]
    fn generate_produces_valid_key() {
        let key = PrivateKey::generate();
        let _pub = key.to_public();
    }

    #[test]
    fn public_key_round_trips_through_compressed_bytes() {
        let key = PrivateKey::from_bytes({
            let mut b = [0u8; 32];
            b[31] = 42;
            b
        })
        .unwrap();
        let pubkey = key.to_public();
        let roundtrip = PublicKey::from_bytes(&pubkey.to_compressed()).unwrap();
        assert_eq!(pubkey, roundtrip);
    }
}
