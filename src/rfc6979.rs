// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// RFC 6979 deterministic nonce generation, implemented in-core (per the
// design note in §9: the source this spec was distilled from delegates
// nonce generation to the host crypto library; here it is a property of
// this library itself, not the platform it runs on).

use hmac::{Hmac, Mac};
use num_bigint::BigUint;
use sha2::Sha256;

use crate::curve::group_order;

type HmacSha256 = Hmac<Sha256>;

/// Deterministically derives a nonce `k in [1, n-1]` from a 32-byte private
/// key `x` and a 32-byte message hash `h`, per RFC 6979 section 3.2 using
/// HMAC-SHA256 as the PRF.
pub fn generate_k(x: &[u8; 32], h: &[u8; 32]) -> [u8; 32] {
    let n = group_order();
    let bits2octets = bits2octets(h, &n);

    let mut v = [0x01u8; 32];
    let mut k = [0x00u8; 32];

    k = hmac(&k, &[&v[..], &[0x00], &x[..], &bits2octets[..]]);
    v = hmac(&k, &[&v[..]]);

    k = hmac(&k, &[&v[..], &[0x01], &x[..], &bits2octets[..]]);
    v = hmac(&k, &[&v[..]]);

    loop {
        v = hmac(&k, &[&v[..]]);
        let t = BigUint::from_bytes_be(&v);
        if t >= BigUint::from(1u8) && t < n {
            let mut out = [0u8; 32];
            out.copy_from_slice(&v);
            return out;
        }
        k = hmac(&k, &[&v[..], &[0x00]]);
        v = hmac(&k, &[&v[..]]);
    }
}

fn hmac(key: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    for part in parts {
        mac.update(part);
    }
    let out = mac.finalize().into_bytes();
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&out);
    buf
}

/// RFC 6979's `bits2octets`: reduce the message hash modulo `n`, re-encoded
/// as 32 big-endian bytes.
fn bits2octets(h: &[u8; 32], n: &BigUint) -> [u8; 32] {
    let v = BigUint::from_bytes_be(h) % n;
    let mut out = [0u8; 32];
    let be = v.to_bytes_be();
    out[32 - be.len()..].copy_from_slice(&be);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_k_is_deterministic() {
        let x = [0x01u8; 32];
        let h = crate::hash::sha256(b"abc");
        assert_eq!(generate_k(&x, &h), generate_k(&x, &h));
    }

    #[test]
    fn generate_k_varies_with_input() {
        let x1 = [0x01u8; 32];
        let x2 = [0x02u8; 32];
        let h = crate::hash::sha256(b"abc");
        assert_ne!(generate_k(&x1, &h), generate_k(&x2, &h));
    }

    #[test]
    fn generate_k_in_range() {
        let x = [0x7fu8; 32];
        let h = crate::hash::sha256(b"message");
        let k = generate_k(&x, &h);
        let n = group_order();
        let kv = BigUint::from_bytes_be(&k);
        assert!(kv >= BigUint::from(1u8) && kv < n);
    }
}
