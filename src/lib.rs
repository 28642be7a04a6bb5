// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0

//! Elliptic-curve key material, transaction construction and signing,
//! BRC-42/43 key derivation, BRC-77/78 peer-to-peer messaging, and
//! BRC-74/BEEF Merkle-proof verification for Bitcoin SV.
//!
//! The crate is a pure, synchronous library: no I/O, no background
//! threads, no process-wide mutable state beyond the system CSPRNG used
//! for key generation and fresh message IDs.

// Coding conventions
#![deny(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    unused_mut,
    unused_imports,
    dead_code
)]

#[macro_use]
extern crate amplify;

pub mod beef;
pub mod brc42;
pub mod brc77;
pub mod brc78;
pub mod bump;
pub mod coding;
pub mod curve;
pub mod ecdsa;
pub mod encodings;
mod error;
pub mod hash;
pub mod hd;
pub mod keys;
pub mod lineage;
pub mod opcodes;
pub mod rfc6979;
pub mod script;
pub mod sighash;
pub mod templates;
pub mod tx;
pub mod util;

pub use beef::{Beef, BeefTx};
pub use bump::{MerklePath, PathElement};
pub use coding::{ByteStr, ConsensusDecode, ConsensusEncode, VarInt};
pub use curve::{AffinePoint, Scalar};
pub use ecdsa::Signature;
pub use encodings::{
    base58_decode, base58_encode, base58check_decode, base58check_encode, decode_address, p2pkh_address,
    wif_decode, wif_encode, Network,
};
pub use error::{EncodingError, Error};
pub use hd::{ExtendedKey, HARDENED_OFFSET};
pub use keys::{PrivateKey, PublicKey};
pub use lineage::{Hop, TokenIdentity, TokenLineage};
pub use script::{classify, push_data, read_push, ScriptType};
pub use sighash::{SighashCache, SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_FORKID, SIGHASH_NONE, SIGHASH_SINGLE};
pub use templates::{split_tx_around_output, SigningTemplate};
pub use tx::{Outpoint, Transaction, TxIn, TxOut, Txid};
