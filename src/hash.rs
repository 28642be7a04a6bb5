// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Plain `sha2`/`ripemd` digest calls replacing the teacher lineage's
// `commit_verify::{DigestExt, Sha256, Ripemd160}` engine wrappers, which
// belong to a client-side-validation commitment scheme this crate doesn't
// carry.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// `SHA256(x)`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// `SHA256(SHA256(x))`, Bitcoin's double hash used for txids and Merkle
/// nodes.
pub fn sha256d(data: &[u8]) -> [u8; 32] { sha256(&sha256(data)) }

/// `RIPEMD160(SHA256(x))`, the public-key-hash / script-hash primitive.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = sha256(data);
    let mut hasher = Ripemd160::new();
    hasher.update(sha);
    hasher.finalize().into()
}

/// Constant-time byte equality for secret/checksum comparisons (base58
/// checksums, HMAC and GCM tags, recipient-identity checks). The lengths
/// must already match; a length mismatch fails without leaking timing
/// information about *how much* matched, but the fixed early-return on
/// length observed in careless implementations is exactly what this
/// primitive exists to avoid for the fixed-length comparisons it's used for.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
