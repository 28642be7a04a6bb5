// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Base58check, WIF, and P2PKH address encoding. No counterpart exists in
// the teacher lineage (LNP/BP addresses are out of its scope entirely); the
// byte layouts here are taken directly from §4.D/§6.

use crate::error::EncodingError;
use crate::hash::{ct_eq, hash160, sha256d};
use crate::keys::PublicKey;
use crate::Error;

const ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Which BSV network a version byte belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Network {
    Main,
    Test,
}

impl Network {
    pub fn p2pkh_version(self) -> u8 {
        match self {
            Network::Main => 0x00,
            Network::Test => 0x6F,
        }
    }

    pub fn wif_version(self) -> u8 {
        match self {
            Network::Main => 0x80,
            Network::Test => 0xEF,
        }
    }
}

pub fn base58_encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|&&b| b == 0).count();
    let mut digits: Vec<u8> = vec![0];
    for &byte in data {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }
    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat('1').take(zeros));
    out.extend(digits.iter().rev().map(|&d| ALPHABET[d as usize] as char));
    out
}

pub fn base58_decode(s: &str) -> Result<Vec<u8>, Error> {
    let zeros = s.chars().take_while(|&c| c == '1').count();
    let mut bytes: Vec<u8> = vec![0];
    for c in s.chars() {
        let digit = ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .ok_or(Error::InvalidEncoding(EncodingError::Base58Alphabet))? as u32;
        let mut carry = digit;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xFF) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xFF) as u8);
            carry >>= 8;
        }
    }
    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}

/// `base58check(payload) = base58(payload || SHA256D(payload)[0..4])`.
pub fn base58check_encode(payload: &[u8]) -> String {
    let checksum = sha256d(payload);
    let mut full = Vec::with_capacity(payload.len() + 4);
    full.extend_from_slice(payload);
    full.extend_from_slice(&checksum[..4]);
    base58_encode(&full)
}

/// Decodes and verifies the 4-byte checksum in constant time before
/// returning the payload (§4.D, §9).
pub fn base58check_decode(s: &str) -> Result<Vec<u8>, Error> {
    let data = base58_decode(s)?;
    if data.len() < 4 {
        return Err(Error::InvalidEncoding(EncodingError::Base58Checksum));
    }
    let (payload, checksum) = data.split_at(data.len() - 4);
    let expected = sha256d(payload);
    if !ct_eq(checksum, &expected[..4]) {
        return Err(Error::InvalidEncoding(EncodingError::Base58Checksum));
    }
    Ok(payload.to_vec())
}

/// `version_byte || hash160(compressed_pubkey)`, base58check-encoded.
pub fn p2pkh_address(pubkey: &PublicKey, network: Network) -> String {
    let pkh = hash160(&pubkey.to_compressed());
    let mut payload = Vec::with_capacity(21);
    payload.push(network.p2pkh_version());
    payload.extend_from_slice(&pkh);
    base58check_encode(&payload)
}

pub fn decode_address(address: &str) -> Result<(u8, [u8; 20]), Error> {
    let payload = base58check_decode(address)?;
    if payload.len() != 21 {
        return Err(Error::InvalidEncoding(EncodingError::Base58Checksum));
    }
    let mut pkh = [0u8; 20];
    pkh.copy_from_slice(&payload[1..]);
    Ok((payload[0], pkh))
}

/// `version_byte || privkey_32 || 0x01(if compressed)`, base58check-encoded.
pub fn wif_encode(privkey: &[u8; 32], compressed: bool, network: Network) -> String {
    let mut payload = Vec::with_capacity(34);
    payload.push(network.wif_version());
    payload.extend_from_slice(privkey);
    if compressed {
        payload.push(0x01);
    }
    base58check_encode(&payload)
}

pub fn wif_decode(wif: &str) -> Result<([u8; 32], bool, u8), Error> {
    let payload = base58check_decode(wif)?;
    if payload.len() != 33 && payload.len() != 34 {
        return Err(Error::InvalidEncoding(EncodingError::Base58Checksum));
    }
    let compressed = payload.len() == 34;
    let mut privkey = [0u8; 32];
    privkey.copy_from_slice(&payload[1..33]);
    Ok((privkey, compressed, payload[0]))
}
