// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// BRC-77 signed message envelopes, built on the BRC-42 invoice derivation
// in `brc42.rs`. No teacher precedent; grounded directly in §4.J.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::brc42::{derive_child_private, derive_child_public, invoice_number};
use crate::ecdsa;
use crate::hash::sha256;
use crate::keys::{PrivateKey, PublicKey};
use crate::Error;

const VERSION: [u8; 4] = [0x42, 0x42, 0x33, 0x01];

fn anyone_privkey() -> PrivateKey {
    let mut b = [0u8; 32];
    b[31] = 1;
    PrivateKey::from_bytes(b).expect("1 is a valid scalar")
}

fn message_invoice(key_id: &[u8; 32]) -> Result<String, Error> {
    invoice_number("message signing", &crate::util::base64_encode(key_id), 2)
}

/// Signs `message` for a specific `verifier`, or for anyone if `None`.
pub fn sign(signer: &PrivateKey, verifier: Option<&PublicKey>, message: &[u8]) -> Result<Vec<u8>, Error> {
    let mut key_id = [0u8; 32];
    OsRng.fill_bytes(&mut key_id);
    let invoice = message_invoice(&key_id)?;

    let counterparty_pub = match verifier {
        Some(pk) => pk.clone(),
        None => anyone_privkey().to_public(),
    };
    let child = derive_child_private(signer, &counterparty_pub, &invoice)?;
    let hash = sha256(message);
    let der = ecdsa::sign(&child.to_bytes(), &hash)?;

    let mut out = Vec::with_capacity(4 + 33 + 33 + 32 + der.len());
    out.extend_from_slice(&VERSION);
    out.extend_from_slice(&signer.to_public().to_compressed());
    match verifier {
        Some(pk) => out.extend_from_slice(&pk.to_compressed()),
        None => out.push(0x00),
    }
    out.extend_from_slice(&key_id);
    out.extend_from_slice(&der);
    Ok(out)
}

/// Verifies that `envelope` carries a valid signature over `message`. The
/// message itself is never embedded in the envelope, so the verifier must
/// supply it alongside the envelope bytes.
pub fn verify_message(recipient: Option<&PrivateKey>, envelope: &[u8], message: &[u8]) -> Result<bool, Error> {
    if envelope.len() < 4 + 33 + 1 + 32 {
        return Err(Error::TruncatedInput);
    }
    if envelope[..4] != VERSION {
        return Err(Error::InvalidParameter("unrecognized BRC-77 version tag"));
    }
    let sender_pub = PublicKey::from_bytes(&envelope[4..37])?;

    let (verifier_len, recipient_priv): (usize, PrivateKey) = if envelope[37] == 0x00 {
        (1, anyone_privkey())
    } else {
        let recipient = recipient.ok_or(Error::InvalidParameter("recipient key required"))?;
        (33, recipient.clone())
    };
    let key_id_start = 37 + verifier_len;
    if envelope.len() < key_id_start + 32 {
        return Err(Error::TruncatedInput);
    }
    let mut key_id = [0u8; 32];
    key_id.copy_from_slice(&envelope[key_id_start..key_id_start + 32]);
    let der = &envelope[key_id_start + 32..];

    let invoice = message_invoice(&key_id)?;
    let verify_key = derive_child_public(&sender_pub, &recipient_priv, &invoice)?;
    ecdsa::verify(verify_key.point(), &sha256(message), der)
}
