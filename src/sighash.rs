// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// BIP-143-style sighash with the mandatory post-fork FORKID bit, grounded in
// the teacher lineage's `SighashCache`/`CommonCache` lazy-fill pattern
// (`sigcache.rs`), stripped of its segwit/taproot branches since BSV only
// ever had the one preimage shape (§4.H).

use crate::coding::{ByteStr, ConsensusEncode};
use crate::hash::sha256d;
use crate::tx::Transaction;
use crate::Error;

pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;
pub const SIGHASH_FORKID: u8 = 0x40;

fn base_type(sighash_type: u8) -> u8 { sighash_type & 0x1F }

fn is_anyone_can_pay(sighash_type: u8) -> bool { sighash_type & SIGHASH_ANYONECANPAY != 0 }

/// The three inner hashes shared across every input of a transaction that
/// uses `SIGHASH_ALL`-shaped preimages; filled lazily and reused, mirroring
/// the teacher lineage's `CommonCache`.
#[derive(Clone, Debug, Default)]
struct CommonCache {
    prevouts: Option<[u8; 32]>,
    sequences: Option<[u8; 32]>,
    outputs: Option<[u8; 32]>,
}

/// Caches the per-transaction hashes needed to sign any number of its
/// inputs without recomputing `hashPrevouts`/`hashSequence`/`hashOutputs`
/// for each one.
#[derive(Debug)]
pub struct SighashCache<'a> {
    tx: &'a Transaction,
    cache: CommonCache,
}

impl<'a> SighashCache<'a> {
    pub fn new(tx: &'a Transaction) -> Self { SighashCache { tx, cache: CommonCache::default() } }

    fn hash_prevouts(&mut self) -> [u8; 32] {
        *self.cache.prevouts.get_or_insert_with(|| {
            let mut buf = Vec::with_capacity(self.tx.inputs.len() * 36);
            for input in &self.tx.inputs {
                input.previous_output.consensus_encode(&mut buf).expect("in-memory write");
            }
            sha256d(&buf)
        })
    }

    fn hash_sequence(&mut self) -> [u8; 32] {
        *self.cache.sequences.get_or_insert_with(|| {
            let mut buf = Vec::with_capacity(self.tx.inputs.len() * 4);
            for input in &self.tx.inputs {
                input.sequence.consensus_encode(&mut buf).expect("in-memory write");
            }
            sha256d(&buf)
        })
    }

    fn hash_outputs(&mut self) -> [u8; 32] {
        *self.cache.outputs.get_or_insert_with(|| {
            let mut buf = Vec::new();
            for output in &self.tx.outputs {
                output.consensus_encode(&mut buf).expect("in-memory write");
            }
            sha256d(&buf)
        })
    }

    /// Computes the sighash for signing input `input_index` whose source
    /// output carries `value` and is unlocked by `script_code` (§4.H).
    /// Rejects any `sighash_type` missing the mandatory FORKID bit.
    pub fn sighash(
        &mut self,
        input_index: usize,
        script_code: &[u8],
        value: u64,
        sighash_type: u8,
    ) -> Result<[u8; 32], Error> {
        if sighash_type & SIGHASH_FORKID == 0 {
            return Err(Error::MissingForkid);
        }
        let input = self.tx.inputs.get(input_index).ok_or(Error::IndexOutOfRange)?;
        let base = base_type(sighash_type);
        let anyone_can_pay = is_anyone_can_pay(sighash_type);

        let zero = [0u8; 32];
        let hash_prevouts = if anyone_can_pay { zero } else { self.hash_prevouts() };
        let hash_sequence =
            if anyone_can_pay || base == SIGHASH_NONE || base == SIGHASH_SINGLE { zero } else { self.hash_sequence() };

        let hash_outputs = if base == SIGHASH_SINGLE {
            match self.tx.outputs.get(input_index) {
                Some(output) => {
                    let mut buf = Vec::new();
                    output.consensus_encode(&mut buf).expect("in-memory write");
                    sha256d(&buf)
                }
                None => zero,
            }
        } else if base == SIGHASH_NONE {
            zero
        } else {
            self.hash_outputs()
        };

        let mut preimage = Vec::new();
        self.tx.version.consensus_encode(&mut preimage)?;
        preimage.extend_from_slice(&hash_prevouts);
        preimage.extend_from_slice(&hash_sequence);
        input.previous_output.consensus_encode(&mut preimage)?;
        ByteStr::from(script_code.to_vec()).consensus_encode(&mut preimage)?;
        value.consensus_encode(&mut preimage)?;
        input.sequence.consensus_encode(&mut preimage)?;
        preimage.extend_from_slice(&hash_outputs);
        self.tx.lock_time.consensus_encode(&mut preimage)?;
        (sighash_type as u32).consensus_encode(&mut preimage)?;

        Ok(sha256d(&preimage))
    }
}

/// One-shot convenience wrapper over [`SighashCache`] for callers signing a
/// single input.
pub fn sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    sighash_type: u8,
) -> Result<[u8; 32], Error> {
    SighashCache::new(tx).sighash(input_index, script_code, value, sighash_type)
}
