// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// BRC-78 encrypted message envelopes. No teacher precedent; grounded
// directly in §4.K. Per the §11 Open Question resolution, the legacy
// `K' = S_x` fallback decrypt path is deliberately not implemented.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::brc42::{derive_child_private, derive_child_public, invoice_number};
use crate::hash::{ct_eq, sha256};
use crate::keys::{PrivateKey, PublicKey};
use crate::Error;

const VERSION: [u8; 4] = [0x42, 0x42, 0x10, 0x33];
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

fn message_invoice(key_id: &[u8; 32]) -> Result<String, Error> {
    invoice_number("message encryption", &crate::util::base64_encode(key_id), 2)
}

fn symmetric_key(shared_secret_compressed: &[u8; 33]) -> [u8; 32] {
    // K = SHA256(S_x): the x-coordinate only, i.e. bytes [1..33] of the
    // compressed point encoding.
    sha256(&shared_secret_compressed[1..])
}

/// Encrypts `plaintext` from `sender` to `recipient`.
pub fn encrypt(sender: &PrivateKey, recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    let mut key_id = [0u8; 32];
    OsRng.fill_bytes(&mut key_id);
    let invoice = message_invoice(&key_id)?;

    let sp = derive_child_private(sender, recipient, &invoice)?;
    let rp_pub = derive_child_public(recipient, sender, &invoice)?;
    let shared = rp_pub.multiply(&sp.scalar())?.to_compressed();
    let key_bytes = symmetric_key(&shared);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad: &[] })
        .map_err(|_| Error::VerificationFailure)?;

    let mut out = Vec::with_capacity(4 + 33 + 33 + 32 + IV_LEN + ciphertext.len());
    out.extend_from_slice(&VERSION);
    out.extend_from_slice(&sender.to_public().to_compressed());
    out.extend_from_slice(&recipient.to_compressed());
    out.extend_from_slice(&key_id);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts an envelope produced by [`encrypt`]. `recipient` must match the
/// identity the envelope was addressed to (checked in constant time).
pub fn decrypt(recipient: &PrivateKey, envelope: &[u8]) -> Result<Vec<u8>, Error> {
    if envelope.len() < 4 + 33 + 33 + 32 + IV_LEN + TAG_LEN {
        return Err(Error::TruncatedInput);
    }
    if envelope[..4] != VERSION {
        return Err(Error::InvalidParameter("unrecognized BRC-78 version tag"));
    }
    let sender_pub = PublicKey::from_bytes(&envelope[4..37])?;
    let envelope_recipient = &envelope[37..70];
    let recipient_pub = recipient.to_public().to_compressed();
    if !ct_eq(envelope_recipient, &recipient_pub) {
        return Err(Error::VerificationFailure);
    }

    let mut key_id = [0u8; 32];
    key_id.copy_from_slice(&envelope[70..102]);
    let iv = &envelope[102..102 + IV_LEN];
    let ciphertext = &envelope[102 + IV_LEN..];

    // Symmetric with encrypt()'s `shared = rp_pub * sp`: here the recipient
    // plays the "self" role, so `rp_priv = derive_child_private(recipient,
    // sender_pub, invoice)` and the other side's child public key is
    // `derive_child_public(sender_pub, recipient, invoice)`.
    let invoice = message_invoice(&key_id)?;
    let rp_priv = derive_child_private(recipient, &sender_pub, &invoice)?;
    let sender_child_pub = derive_child_public(&sender_pub, recipient, &invoice)?;
    let shared = sender_child_pub.multiply(&rp_priv.scalar())?.to_compressed();
    let key_bytes = symmetric_key(&shared);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    cipher
        .decrypt(Nonce::from_slice(iv), Payload { msg: ciphertext, aad: &[] })
        .map_err(|_| Error::VerificationFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> PrivateKey {
        let mut b = [0u8; 32];
        b[31] = byte;
        PrivateKey::from_bytes(b).unwrap()
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let sender = key(1);
        let recipient = key(2);
        let plaintext = b"the quick brown fox";
        let envelope = encrypt(&sender, &recipient.to_public(), plaintext).unwrap();
        let decrypted = decrypt(&recipient, &envelope).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_rejects_wrong_recipient() {
        let sender = key(3);
        let recipient = key(4);
        let impostor = key(5);
        let envelope = encrypt(&sender, &recipient.to_public(), b"secret").unwrap();
        assert!(decrypt(&impostor, &envelope).is_err());
    }

    #[test]
    fn decrypt_rejects_tampered_ciphertext() {
        let sender = key(6);
        let recipient = key(7);
        let mut envelope = encrypt(&sender, &recipient.to_public(), b"secret payload").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0xFF;
        assert!(decrypt(&recipient, &envelope).is_err());
    }

    #[test]
    fn each_encryption_uses_a_fresh_iv() {
        let sender = key(8);
        let recipient = key(9);
        let e1 = encrypt(&sender, &recipient.to_public(), b"same plaintext").unwrap();
        let e2 = encrypt(&sender, &recipient.to_public(), b"same plaintext").unwrap();
        assert_ne!(e1, e2);
    }
}
