// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// End-to-end scenarios exercising the public API together, rather than one
// module in isolation.

use bsv_sdk::{
    brc42, brc78, hash, sighash, ConsensusDecode, Error, MerklePath, PathElement, PrivateKey, Transaction,
    SIGHASH_ALL, SIGHASH_FORKID,
};

fn from_hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

fn to_hex(bytes: &[u8]) -> String { bytes.iter().map(|b| format!("{b:02x}")).collect() }

fn key(byte: u8) -> PrivateKey {
    let mut b = [0u8; 32];
    b[31] = byte;
    PrivateKey::from_bytes(b).unwrap()
}

#[test]
fn scenario_a_genesis_coinbase_parses_and_hashes() {
    let raw = from_hex(
        "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff4d04ffff001d0104\
         455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f\
         6e64206261696c6f757420666f722062616e6b73ffffffff0100f2052a01000000434104678afdb0fe5548271967f1a67130\
         b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5f\
         ac00000000",
    );

    let tx = Transaction::consensus_deserialize(&raw).unwrap();
    assert_eq!(tx.version, 1);
    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(tx.outputs.len(), 1);
    assert_eq!(tx.outputs[0].value, 5_000_000_000);
    assert_eq!(tx.lock_time, 0);
    assert!(tx.is_coinbase());
    assert_eq!(format!("{}", tx.txid()), "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b");
}

#[test]
fn scenario_b_sign_is_deterministic() {
    let mut privkey = [0u8; 32];
    privkey[31] = 1;
    let msg_hash = hash::sha256(b"abc");
    let sig1 = bsv_sdk::ecdsa::sign(&privkey, &msg_hash).unwrap();
    let sig2 = bsv_sdk::ecdsa::sign(&privkey, &msg_hash).unwrap();
    assert_eq!(sig1, sig2);
}

#[test]
fn scenario_c_brc42_cross_derivation_vector() {
    let root = key(42);
    let counterparty = key(69);
    let invoice = brc42::invoice_number("testprotocol", "12345", 0).unwrap();

    let child = brc42::derive_child_private(&root, &counterparty.to_public(), &invoice).unwrap();
    let hex = to_hex(&child.to_bytes());
    assert_eq!(hex, "2d1e9ba3b3574dcd5f05b88e38a243f68bce31b95286d379bfd90fa8b7f1c383");
}

#[test]
fn scenario_d_brc78_round_trip_and_tamper_detection() {
    let sender = PrivateKey::generate();
    let recipient = PrivateKey::generate();
    let plaintext = b"Hello, BSV!";

    let envelope = brc78::encrypt(&sender, &recipient.to_public(), plaintext).unwrap();
    let decrypted = brc78::decrypt(&recipient, &envelope).unwrap();
    assert_eq!(decrypted, plaintext);

    let mut tampered = envelope.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0xFF;
    assert!(matches!(brc78::decrypt(&recipient, &tampered), Err(Error::VerificationFailure)));
}

#[test]
fn scenario_e_bump_rejects_cve_2012_2459() {
    // Three leaves: working hash at offset 1, its sibling at offset 0
    // falsely marked as a duplicate (the classic "duplicate on the left"
    // forgery CVE-2012-2459 describes).
    let path = MerklePath {
        block_height: 1,
        levels: vec![
            vec![PathElement { offset: 0, duplicate: true, is_txid: false, hash: None }],
            vec![PathElement { offset: 0, duplicate: false, is_txid: false, hash: Some([0; 32]) }],
        ],
    };
    let err = path.compute_root([0x42; 32], 1).unwrap_err();
    assert!(matches!(err, Error::BumpMalformed(_)));
}

#[test]
fn scenario_f_sighash_enforces_forkid() {
    let tx = Transaction {
        version: 1,
        inputs: vec![bsv_sdk::TxIn {
            previous_output: bsv_sdk::Outpoint { txid: bsv_sdk::Txid([0x11; 32]), vout: 0 },
            unlocking_script: vec![],
            sequence: 0xFFFFFFFF,
            source_output: None,
        }],
        outputs: vec![bsv_sdk::TxOut { value: 1000, locking_script: vec![0xAA; 25] }],
        lock_time: 0,
    };

    let without_forkid = sighash::sighash(&tx, 0, &[], 5000, SIGHASH_ALL);
    assert!(matches!(without_forkid, Err(Error::MissingForkid)));

    let with_forkid = sighash::sighash(&tx, 0, &[], 5000, SIGHASH_ALL | SIGHASH_FORKID).unwrap();
    assert_eq!(with_forkid.len(), 32);
}
