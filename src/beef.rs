// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// BEEF (BRC-64/95/96) container parsing and the incremental build/merge
// surface. The method names and responsibilities (`find_txid`,
// `merge_bump`, `merge_raw_tx`, `merge_beef`, ...) are carried over
// unchanged from the retrieval pack's reference `Beef` sketch (§4.M); here
// they are fully implemented rather than stubbed.

use std::collections::BTreeMap;
use std::io::Cursor;

use crate::bump::MerklePath;
use crate::coding::{ConsensusDecode, ConsensusEncode, VarInt};
use crate::tx::{Transaction, Txid};
use crate::Error;

pub const VERSION_V1: u32 = 0xEFBE0100;
pub const VERSION_V2: u32 = 0xEFBE0200;
pub const VERSION_ATOMIC: u32 = 0x01010101;

/// What a BEEF container knows about one transaction.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum BeefTx {
    /// A raw transaction with no associated Merkle proof yet.
    RawTx(Transaction),
    /// A raw transaction together with the index of its confirming BUMP.
    RawTxAndBump(Transaction, usize),
    /// A bare txid reference with no transaction bytes.
    TxidOnly,
}

impl BeefTx {
    /// Ranks `RawTxAndBump > RawTx > TxidOnly`, used by [`Beef::merge_beef`]
    /// to prefer the more informative side when both contain the same txid.
    fn informativeness(&self) -> u8 {
        match self {
            BeefTx::RawTxAndBump(..) => 2,
            BeefTx::RawTx(_) => 1,
            BeefTx::TxidOnly => 0,
        }
    }
}

/// A parsed or in-progress BEEF container: a set of BUMPs plus a map of
/// known transactions, optionally wrapped as an `Atomic` BEEF naming one
/// subject txid.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Beef {
    pub version: u32,
    pub atomic_subject: Option<Txid>,
    pub bumps: Vec<MerklePath>,
    pub transactions: BTreeMap<Txid, BeefTx>,
}

impl Beef {
    pub fn new(version: u32) -> Self {
        Beef { version, atomic_subject: None, bumps: Vec::new(), transactions: BTreeMap::new() }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Cursor::new(bytes);
        let version = u32::consensus_decode(&mut cursor)?;

        let (atomic_subject, inner_version) = if version == VERSION_ATOMIC {
            let subject = Txid::consensus_decode(&mut cursor)?;
            let inner = u32::consensus_decode(&mut cursor)?;
            (Some(subject), inner)
        } else {
            (None, version)
        };

        match inner_version {
            VERSION_V1 => Self::parse_v1_body(&mut cursor, atomic_subject),
            VERSION_V2 => Self::parse_v2_body(&mut cursor, atomic_subject),
            other => Err(Error::InvalidEncoding(crate::error::EncodingError::BeefVersion(other))),
        }
    }

    fn parse_v1_body(cursor: &mut Cursor<&[u8]>, atomic_subject: Option<Txid>) -> Result<Self, Error> {
        let n_bumps = VarInt::consensus_decode(cursor)?.to_usize();
        let mut bumps = Vec::with_capacity(n_bumps);
        for _ in 0..n_bumps {
            bumps.push(MerklePath::consensus_decode(cursor)?);
        }

        let n_txs = VarInt::consensus_decode(cursor)?.to_usize();
        let mut transactions = BTreeMap::new();
        for _ in 0..n_txs {
            let raw = Transaction::consensus_decode(cursor)?;
            let txid = raw.txid();
            let has_bump = u8::consensus_decode(cursor)?;
            let entry = if has_bump == 0x01 {
                let idx = VarInt::consensus_decode(cursor)?.to_usize();
                BeefTx::RawTxAndBump(raw, idx)
            } else {
                BeefTx::RawTx(raw)
            };
            transactions.insert(txid, entry);
        }

        Ok(Beef { version: VERSION_V1, atomic_subject, bumps, transactions })
    }

    fn parse_v2_body(cursor: &mut Cursor<&[u8]>, atomic_subject: Option<Txid>) -> Result<Self, Error> {
        let n_bumps = VarInt::consensus_decode(cursor)?.to_usize();
        let mut bumps = Vec::with_capacity(n_bumps);
        for _ in 0..n_bumps {
            bumps.push(MerklePath::consensus_decode(cursor)?);
        }

        let n_txs = VarInt::consensus_decode(cursor)?.to_usize();
        let mut transactions = BTreeMap::new();
        for _ in 0..n_txs {
            let format = u8::consensus_decode(cursor)?;
            match format {
                0 => {
                    let raw = Transaction::consensus_decode(cursor)?;
                    transactions.insert(raw.txid(), BeefTx::RawTx(raw));
                }
                1 => {
                    let raw = Transaction::consensus_decode(cursor)?;
                    let idx = VarInt::consensus_decode(cursor)?.to_usize();
                    transactions.insert(raw.txid(), BeefTx::RawTxAndBump(raw, idx));
                }
                2 => {
                    let txid = Txid::consensus_decode(cursor)?;
                    transactions.insert(txid, BeefTx::TxidOnly);
                }
                _ => return Err(Error::InvalidParameter("unrecognized BEEF v2 tx format byte")),
            }
        }

        Ok(Beef { version: VERSION_V2, atomic_subject, bumps, transactions })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(subject) = self.atomic_subject {
            VERSION_ATOMIC.consensus_encode(&mut out).expect("in-memory write");
            subject.consensus_encode(&mut out).expect("in-memory write");
        }
        self.version.consensus_encode(&mut out).expect("in-memory write");
        self.bumps.consensus_encode(&mut out).expect("in-memory write");

        match self.version {
            VERSION_V2 => {
                VarInt::with(self.transactions.len()).consensus_encode(&mut out).expect("in-memory write");
                for (txid, entry) in &self.transactions {
                    encode_v2_tx(*txid, entry, &mut out);
                }
            }
            _ => {
                // V1 has no wire shape for a bare txid reference; any such
                // entries are dropped rather than corrupting the count,
                // since a V1 consumer has no way to represent them either.
                let encodable: Vec<_> =
                    self.transactions.values().filter(|e| !matches!(e, BeefTx::TxidOnly)).collect();
                VarInt::with(encodable.len()).consensus_encode(&mut out).expect("in-memory write");
                for entry in encodable {
                    encode_v1_tx(entry, &mut out);
                }
            }
        }
        out
    }

    pub fn find_txid(&self, txid: &Txid) -> Option<&BeefTx> { self.transactions.get(txid) }

    pub fn find_bump(&self, index: usize) -> Option<&MerklePath> { self.bumps.get(index) }

    /// Appends `bump` unless an existing BUMP already covers the same
    /// level-0 leaf set.
    pub fn merge_bump(&mut self, bump: MerklePath) -> usize {
        let incoming_leaves: Vec<_> = bump.levels.first().map(|l| l.iter().map(|e| e.offset).collect()).unwrap_or_default();
        for (i, existing) in self.bumps.iter().enumerate() {
            let existing_leaves: Vec<_> =
                existing.levels.first().map(|l| l.iter().map(|e| e.offset).collect()).unwrap_or_default();
            if existing_leaves == incoming_leaves {
                return i;
            }
        }
        self.bumps.push(bump);
        self.bumps.len() - 1
    }

    /// Parses `raw`, computes its txid, and inserts a `RawTx` entry unless
    /// that txid is already known.
    pub fn merge_raw_tx(&mut self, raw: &[u8]) -> Result<Txid, Error> {
        let tx = Transaction::consensus_deserialize(raw)?;
        let txid = tx.txid();
        self.transactions.entry(txid).or_insert(BeefTx::RawTx(tx));
        Ok(txid)
    }

    pub fn merge_txid_only(&mut self, txid: Txid) {
        self.transactions.entry(txid).or_insert(BeefTx::TxidOnly);
    }

    /// Downgrades a known tx entry to a bare txid reference.
    pub fn make_txid_only(&mut self, txid: &Txid) {
        if let Some(entry) = self.transactions.get_mut(txid) {
            *entry = BeefTx::TxidOnly;
        }
    }

    /// Unions `other` into `self`: BUMPs are merged via [`Self::merge_bump`]
    /// and transaction entries keep the more informative side when both
    /// know the same txid.
    pub fn merge_beef(&mut self, other: Beef) {
        let mut bump_remap = BTreeMap::new();
        for (old_idx, bump) in other.bumps.into_iter().enumerate() {
            bump_remap.insert(old_idx, self.merge_bump(bump));
        }
        for (txid, entry) in other.transactions {
            let remapped = match entry {
                BeefTx::RawTxAndBump(tx, idx) => {
                    BeefTx::RawTxAndBump(tx, *bump_remap.get(&idx).unwrap_or(&idx))
                }
                other => other,
            };
            match self.transactions.get(&txid) {
                Some(existing) if existing.informativeness() >= remapped.informativeness() => {}
                _ => {
                    self.transactions.insert(txid, remapped);
                }
            }
        }
    }
}

fn encode_v1_tx(entry: &BeefTx, out: &mut Vec<u8>) {
    match entry {
        BeefTx::RawTx(tx) => {
            tx.consensus_encode(out).expect("in-memory write");
            0x00u8.consensus_encode(out).expect("in-memory write");
        }
        BeefTx::RawTxAndBump(tx, idx) => {
            tx.consensus_encode(out).expect("in-memory write");
            0x01u8.consensus_encode(out).expect("in-memory write");
            VarInt::with(*idx).consensus_encode(out).expect("in-memory write");
        }
        BeefTx::TxidOnly => {
            // V1 has no txid-only wire shape; callers that need this must
            // use a V2 container.
        }
    }
}

fn encode_v2_tx(txid: Txid, entry: &BeefTx, out: &mut Vec<u8>) {
    match entry {
        BeefTx::RawTx(tx) => {
            0u8.consensus_encode(out).expect("in-memory write");
            tx.consensus_encode(out).expect("in-memory write");
        }
        BeefTx::RawTxAndBump(tx, idx) => {
            1u8.consensus_encode(out).expect("in-memory write");
            tx.consensus_encode(out).expect("in-memory write");
            VarInt::with(*idx).consensus_encode(out).expect("in-memory write");
        }
        BeefTx::TxidOnly => {
            2u8.consensus_encode(out).expect("in-memory write");
            txid.consensus_encode(out).expect("in-memory write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{Outpoint, TxIn, TxOut};

    fn sample_tx(seed: u8) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxIn {
                previous_output: Outpoint { txid: Txid([seed; 32]), vout: 0 },
                unlocking_script: vec![],
                sequence: 0xFFFFFFFF,
                source_output: None,
            }],
            outputs: vec![TxOut { value: 1000, locking_script: vec![0xAA; 25] }],
            lock_time: 0,
        }
    }

    #[test]
    fn v1_round_trips_through_bytes() {
        let mut beef = Beef::new(VERSION_V1);
        let tx = sample_tx(1);
        beef.transactions.insert(tx.txid(), BeefTx::RawTx(tx));
        let bytes = beef.to_bytes();
        let decoded = Beef::parse(&bytes).unwrap();
        assert_eq!(decoded.transactions.len(), 1);
    }

    #[test]
    fn merge_raw_tx_is_idempotent() {
        let mut beef = Beef::new(VERSION_V1);
        let tx = sample_tx(2);
        let raw = tx.consensus_serialize();
        let txid1 = beef.merge_raw_tx(&raw).unwrap();
        let txid2 = beef.merge_raw_tx(&raw).unwrap();
        assert_eq!(txid1, txid2);
        assert_eq!(beef.transactions.len(), 1);
    }

    #[test]
    fn make_txid_only_downgrades_entry() {
        let mut beef = Beef::new(VERSION_V1);
        let tx = sample_tx(3);
        let txid = tx.txid();
        beef.transactions.insert(txid, BeefTx::RawTx(tx));
        beef.make_txid_only(&txid);
        assert_eq!(beef.find_txid(&txid), Some(&BeefTx::TxidOnly));
    }

    #[test]
    fn merge_beef_prefers_more_informative_entry() {
        let mut a = Beef::new(VERSION_V1);
        let tx = sample_tx(4);
        let txid = tx.txid();
        a.transactions.insert(txid, BeefTx::RawTx(tx.clone()));

        let mut b = Beef::new(VERSION_V1);
        b.transactions.insert(txid, BeefTx::TxidOnly);

        a.merge_beef(b);
        assert!(matches!(a.find_txid(&txid), Some(BeefTx::RawTx(_))));
    }

    #[test]
    fn atomic_wraps_a_subject_txid() {
        let mut beef = Beef::new(VERSION_V1);
        let tx = sample_tx(5);
        let subject = tx.txid();
        beef.atomic_subject = Some(subject);
        beef.transactions.insert(subject, BeefTx::RawTx(tx));
        let bytes = beef.to_bytes();
        assert_eq!(&bytes[..4], &VERSION_ATOMIC.to_le_bytes());
        let decoded = Beef::parse(&bytes).unwrap();
        assert_eq!(decoded.atomic_subject, Some(subject));
    }

    #[test]
    fn rejects_unrecognized_version() {
        let mut bytes = vec![];
        0x12345678u32.consensus_encode(&mut bytes).unwrap();
        assert!(Beef::parse(&bytes).is_err());
    }
}
