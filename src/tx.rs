// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Transaction, input and output types, rewritten against this crate's own
// `ConsensusEncode`/`ConsensusDecode` traits in `coding.rs`. Kept the
// teacher lineage's `Txid`/`Outpoint` naming and reversed-hex `Display`
// convention; dropped witness fields entirely since BSV never adopted
// segwit (§4.G).

use std::fmt;
use std::io::{Read, Write};

use crate::coding::{ByteStr, ConsensusDecode, ConsensusEncode};
use crate::hash::sha256d;
use crate::Error;

/// A transaction identifier: `SHA256D` of the serialized transaction,
/// stored internally in the same byte order it's hashed in. `Display`
/// renders it reversed, matching the hex convention used by block
/// explorers and RPC.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash, Default)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    pub const fn coinbase() -> Self { Txid([0u8; 32]) }

    pub fn is_coinbase(&self) -> bool { self.0 == [0u8; 32] }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().rev() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Txid({self})") }
}

impl ConsensusEncode for Txid {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        self.0.consensus_encode(writer)
    }
}

impl ConsensusDecode for Txid {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        Ok(Txid(<[u8; 32]>::consensus_decode(reader)?))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Outpoint {
    pub txid: Txid,
    pub vout: u32,
}

impl Outpoint {
    pub const fn coinbase() -> Self { Outpoint { txid: Txid::coinbase(), vout: 0xFFFFFFFF } }
}

impl ConsensusEncode for Outpoint {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        let mut counter = self.txid.consensus_encode(writer)?;
        counter += self.vout.consensus_encode(writer)?;
        Ok(counter)
    }
}

impl ConsensusDecode for Outpoint {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        Ok(Outpoint { txid: Txid::consensus_decode(reader)?, vout: u32::consensus_decode(reader)? })
    }
}

/// `source_output` is signing-time metadata only — the source output's
/// value and locking script, needed to build the sighash preimage and the
/// unlocking script a `SigningTemplate` emits (§3, §4.I). It is never
/// part of the consensus wire encoding.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TxIn {
    pub previous_output: Outpoint,
    pub unlocking_script: Vec<u8>,
    pub sequence: u32,
    pub source_output: Option<TxOut>,
}

impl ConsensusEncode for TxIn {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        let mut counter = self.previous_output.consensus_encode(writer)?;
        counter += ByteStr::from(self.unlocking_script.clone()).consensus_encode(writer)?;
        counter += self.sequence.consensus_encode(writer)?;
        Ok(counter)
    }
}

impl ConsensusDecode for TxIn {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        Ok(TxIn {
            previous_output: Outpoint::consensus_decode(reader)?,
            unlocking_script: ByteStr::consensus_decode(reader)?.into_vec(),
            sequence: u32::consensus_decode(reader)?,
            source_output: None,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TxOut {
    pub value: u64,
    pub locking_script: Vec<u8>,
}

impl ConsensusEncode for TxOut {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        let mut counter = self.value.consensus_encode(writer)?;
        counter += ByteStr::from(self.locking_script.clone()).consensus_encode(writer)?;
        Ok(counter)
    }
}

impl ConsensusDecode for TxOut {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        Ok(TxOut {
            value: u64::consensus_decode(reader)?,
            locking_script: ByteStr::consensus_decode(reader)?.into_vec(),
        })
    }
}

/// A pre-segwit BSV transaction: no marker byte, no witness stack.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// A single input whose outpoint is all-zeros/0xFFFFFFFF (§4.G).
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output == Outpoint::coinbase()
    }

    pub fn txid(&self) -> Txid { Txid(sha256d(&self.consensus_serialize())) }
}

impl ConsensusEncode for Transaction {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        let mut counter = self.version.consensus_encode(writer)?;
        counter += self.inputs.consensus_encode(writer)?;
        counter += self.outputs.consensus_encode(writer)?;
        counter += self.lock_time.consensus_encode(writer)?;
        Ok(counter)
    }
}

impl ConsensusDecode for Transaction {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        Ok(Transaction {
            version: u32::consensus_decode(reader)?,
            inputs: Vec::consensus_decode(reader)?,
            outputs: Vec::consensus_decode(reader)?,
            lock_time: u32::consensus_decode(reader)?,
        })
    }
}
