// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Field and curve arithmetic, grounded in the teacher lineage's own
// precedent (`pubkeys.rs`) of wrapping `secp256k1::PublicKey` opaquely
// rather than reimplementing point math: the spec permits substituting a
// constant-time library implementation as long as the public API matches
// bit-for-bit, and libsecp256k1's bindings are exactly that.

use num_bigint::BigUint;
use num_traits::Zero;
use secp256k1::PublicKey;

use crate::Error;

/// The secp256k1 field modulus `p = 2^256 - 2^32 - 977`.
pub fn field_prime() -> BigUint {
    (BigUint::from(1u8) << 256) - (BigUint::from(1u8) << 32) - BigUint::from(977u32)
}

/// The secp256k1 group order `n`.
pub fn group_order() -> BigUint {
    BigUint::parse_bytes(
        b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
        16,
    )
    .expect("static constant")
}

/// A 256-bit scalar reduced modulo the group order, stored as 32-byte
/// big-endian octets. Leading zero bytes are preserved in persisted form.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Scalar(pub [u8; 32]);

impl Scalar {
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, Error> {
        let n = group_order();
        let v = BigUint::from_bytes_be(&bytes);
        if v.is_zero() || v >= n {
            return Err(Error::OutOfRangeScalar);
        }
        Ok(Scalar(bytes))
    }

    /// Reduces an arbitrary big-endian integer modulo `n`, without
    /// rejecting zero (used internally before the final range check a
    /// caller performs, e.g. BRC-42 child key arithmetic).
    pub fn reduce(bytes: &[u8]) -> [u8; 32] {
        let n = group_order();
        let v = BigUint::from_bytes_be(bytes) % n;
        let mut out = [0u8; 32];
        let be = v.to_bytes_be();
        out[32 - be.len()..].copy_from_slice(&be);
        out
    }

    pub fn to_bytes(&self) -> [u8; 32] { self.0 }

    pub fn to_biguint(&self) -> BigUint { BigUint::from_bytes_be(&self.0) }
}

/// Either the point at infinity, or an affine `(x, y)` pair satisfying
/// `y^2 = x^3 + 7 (mod p)`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum AffinePoint {
    Infinity,
    Point { x: [u8; 32], y: [u8; 32] },
}

impl AffinePoint {
    pub fn is_on_curve(&self) -> bool {
        match self {
            AffinePoint::Infinity => true,
            AffinePoint::Point { x, y } => {
                let p = field_prime();
                let x = BigUint::from_bytes_be(x);
                let y = BigUint::from_bytes_be(y);
                let lhs = (&y * &y) % &p;
                let rhs = (x.modpow(&BigUint::from(3u8), &p) + BigUint::from(7u8)) % &p;
                lhs == rhs
            }
        }
    }

    /// `scalar_mul(0, P) = O`; `scalar_mul(k, O) = O`; negative scalars are
    /// not representable (`Scalar` is always reduced mod n beforehand).
    pub fn scalar_mul(k: &Scalar, p: &AffinePoint) -> Result<AffinePoint, Error> {
        let AffinePoint::Point { x, y } = p else {
            return Ok(AffinePoint::Infinity);
        };
        if k.to_biguint().is_zero() {
            return Ok(AffinePoint::Infinity);
        }
        let pk = PublicKey::from_slice(&compress(x, y)?)
            .map_err(|_| Error::NotOnCurve)?
            .mul_tweak(secp256k1::SECP256K1, &secp256k1::Scalar::from_be_bytes(k.0).unwrap())
            .map_err(|_| Error::OutOfRangeScalar)?;
        Ok(from_secp_pubkey(&pk))
    }

    pub fn point_add(p: &AffinePoint, q: &AffinePoint) -> Result<AffinePoint, Error> {
        match (p, q) {
            (AffinePoint::Infinity, other) | (other, AffinePoint::Infinity) => Ok(other.clone()),
            (AffinePoint::Point { x: x1, y: y1 }, AffinePoint::Point { x: x2, y: y2 }) => {
                if x1 == x2 && y1 != y2 {
                    // P + (-P) = O
                    return Ok(AffinePoint::Infinity);
                }
                if x1 == x2 && y1 == y2 {
                    return AffinePoint::point_double(p);
                }
                let pk1 = PublicKey::from_slice(&compress(x1, y1)?).map_err(|_| Error::NotOnCurve)?;
                let pk2 = PublicKey::from_slice(&compress(x2, y2)?).map_err(|_| Error::NotOnCurve)?;
                let sum = pk1.combine(&pk2).map_err(|_| Error::NotOnCurve)?;
                Ok(from_secp_pubkey(&sum))
            }
        }
    }

    pub fn point_double(p: &AffinePoint) -> Result<AffinePoint, Error> {
        let AffinePoint::Point { x, y } = p else {
            return Ok(AffinePoint::Infinity);
        };
        let two = Scalar::from_bytes({
            let mut b = [0u8; 32];
            b[31] = 2;
            b
        })
        .expect("2 is in range");
        AffinePoint::scalar_mul(&two, &AffinePoint::Point { x: *x, y: *y })
    }

    /// Recovers `y` from a compressed-point prefix and `x`, or an error if
    /// `x` does not correspond to a curve point.
    pub fn decompress(prefix: u8, x: [u8; 32]) -> Result<AffinePoint, Error> {
        if prefix != 0x02 && prefix != 0x03 {
            return Err(Error::InvalidEncoding(crate::error::EncodingError::Der));
        }
        let mut encoded = [0u8; 33];
        encoded[0] = prefix;
        encoded[1..].copy_from_slice(&x);
        let pk = PublicKey::from_slice(&encoded).map_err(|_| Error::NotOnCurve)?;
        Ok(from_secp_pubkey(&pk))
    }

    pub fn to_compressed(&self) -> Result<[u8; 33], Error> {
        match self {
            AffinePoint::Infinity => Err(Error::NotOnCurve),
            AffinePoint::Point { x, y } => compress(x, y),
        }
    }

    pub fn to_uncompressed(&self) -> Result<[u8; 65], Error> {
        match self {
            AffinePoint::Infinity => Err(Error::NotOnCurve),
            AffinePoint::Point { x, y } => {
                let mut out = [0u8; 65];
                out[0] = 0x04;
                out[1..33].copy_from_slice(x);
                out[33..].copy_from_slice(y);
                Ok(out)
            }
        }
    }
}

fn compress(x: &[u8; 32], y: &[u8; 32]) -> Result<[u8; 33], Error> {
    let mut out = [0u8; 33];
    out[0] = if y[31] & 1 == 0 { 0x02 } else { 0x03 };
    out[1..].copy_from_slice(x);
    Ok(out)
}

fn from_secp_pubkey(pk: &PublicKey) -> AffinePoint {
    let raw = pk.serialize_uncompressed();
    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    x.copy_from_slice(&raw[1..33]);
    y.copy_from_slice(&raw[33..65]);
    AffinePoint::Point { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> AffinePoint {
        let one = Scalar::from_bytes({
            let mut b = [0u8; 32];
            b[31] = 1;
            b
        })
        .unwrap();
        let g = PublicKey::from_secret_key(
            secp256k1::SECP256K1,
            &secp256k1::SecretKey::from_slice(&one.0).unwrap(),
        );
        from_secp_pubkey(&g)
    }

    #[test]
    fn generator_is_on_curve() { assert!(generator().is_on_curve()); }

    #[test]
    fn scalar_mul_by_zero_is_infinity() {
        let zero = [0u8; 32];
        // Scalar::from_bytes rejects 0, so build scalar_mul's zero path via
        // a manually constructed invalid scalar is not possible; instead
        // confirm the identity on the O input side.
        let k = Scalar::from_bytes({
            let mut b = [0u8; 32];
            b[31] = 1;
            b
        })
        .unwrap();
        assert_eq!(AffinePoint::scalar_mul(&k, &AffinePoint::Infinity).unwrap(), AffinePoint::Infinity);
        let _ = zero;
    }

    #[test]
    fn point_add_with_negation_is_infinity() {
        let g = generator();
        let AffinePoint::Point { x, y } = &g else { unreachable!() };
        let p = field_prime();
        let neg_y = (&p - BigUint::from_bytes_be(y)) % &p;
        let mut neg_y_bytes = [0u8; 32];
        let be = neg_y.to_bytes_be();
        neg_y_bytes[32 - be.len()..].copy_from_slice(&be);
        let neg_g = AffinePoint::Point { x: *x, y: neg_y_bytes };
        assert!(neg_g.is_on_curve());
        assert_eq!(AffinePoint::point_add(&g, &neg_g).unwrap(), AffinePoint::Infinity);
    }

    #[test]
    fn decompress_round_trips_generator() {
        let g = generator();
        let compressed = g.to_compressed().unwrap();
        let decompressed = AffinePoint::decompress(compressed[0], compressed[1..].try_into().unwrap()).unwrap();
        assert_eq!(g, decompressed);
    }

    #[test]
    fn decompress_rejects_non_curve_point() {
        let bogus_x = [0x42u8; 32];
        assert!(AffinePoint::decompress(0x02, bogus_x).is_err());
    }
}
