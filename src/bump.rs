// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// BRC-74 Merkle path (BUMP) parsing, serialization and root reconstruction,
// with the CVE-2012-2459 duplicate-pair rejection made structural rather
// than incidental. No teacher precedent; grounded directly in §3/§4.L.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::coding::{ConsensusDecode, ConsensusEncode, VarInt};
use crate::hash::sha256d;
use crate::Error;

const FLAG_DUPLICATE: u8 = 0b01;
const FLAG_TXID: u8 = 0b10;

/// One entry of a BUMP level: either a sibling hash, or a flag marking it as
/// a duplicate of its neighbor (no hash stored), optionally also marking
/// the transaction under proof.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PathElement {
    pub offset: u64,
    pub duplicate: bool,
    pub is_txid: bool,
    pub hash: Option<[u8; 32]>,
}

impl ConsensusEncode for PathElement {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        let mut counter = VarInt::new(self.offset).consensus_encode(writer)?;
        let mut flags = 0u8;
        if self.duplicate {
            flags |= FLAG_DUPLICATE;
        }
        if self.is_txid {
            flags |= FLAG_TXID;
        }
        counter += flags.consensus_encode(writer)?;
        if let Some(hash) = self.hash {
            counter += hash.consensus_encode(writer)?;
        }
        Ok(counter)
    }
}

impl ConsensusDecode for PathElement {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        let offset = VarInt::consensus_decode(reader)?.into_u64();
        let flags = u8::consensus_decode(reader)?;
        let duplicate = flags & FLAG_DUPLICATE != 0;
        let is_txid = flags & FLAG_TXID != 0;
        let hash = if duplicate { None } else { Some(<[u8; 32]>::consensus_decode(reader)?) };
        Ok(PathElement { offset, duplicate, is_txid, hash })
    }
}

/// A BRC-74 BUMP: the block height it was computed against, plus one level
/// of sibling elements per tree height, sorted by offset within each level.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MerklePath {
    pub block_height: u64,
    pub levels: Vec<Vec<PathElement>>,
}

impl ConsensusEncode for MerklePath {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        let mut counter = VarInt::new(self.block_height).consensus_encode(writer)?;
        counter += VarInt::with(self.levels.len()).consensus_encode(writer)?;
        for level in &self.levels {
            counter += level.consensus_encode(writer)?;
        }
        Ok(counter)
    }
}

impl ConsensusDecode for MerklePath {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        let block_height = VarInt::consensus_decode(reader)?.into_u64();
        let n_levels = VarInt::consensus_decode(reader)?.to_usize();
        let mut levels = Vec::with_capacity(n_levels);
        for _ in 0..n_levels {
            let mut level = Vec::<PathElement>::consensus_decode(reader)?;
            level.sort_by_key(|e| e.offset);
            levels.push(level);
        }
        Ok(MerklePath { block_height, levels })
    }
}

impl MerklePath {
    /// Resolves the hash of the node at `(height, offset)`, either directly
    /// from an explicit level entry or, if absent, by recursively deriving
    /// it from its two children one level below (§4.L: "if both children of
    /// this level's missing parent are derivable from level-below siblings,
    /// compute the parent recursively"). A duplicate-flagged entry resolves
    /// to `SHA256D(child || child)` of whichever single child is present.
    fn resolve(&self, height: usize, offset: u64) -> Result<[u8; 32], Error> {
        let level = self
            .levels
            .get(height)
            .ok_or_else(|| Error::BumpMalformed(format!("no level at height {height}")))?;

        if let Some(element) = level.iter().find(|e| e.offset == offset) {
            if let Some(hash) = element.hash {
                return Ok(hash);
            }
            if element.duplicate {
                // A duplicate entry stands for "equal to its pair"; resolve
                // the pair itself one level below and double it.
                let left = self.resolve(height - 1, offset * 2)?;
                return Ok(sha256d(&[left.as_slice(), left.as_slice()].concat()));
            }
            return Err(Error::BumpMalformed(format!(
                "non-duplicate entry at height {height}, offset {offset} has no hash"
            )));
        }

        if height == 0 {
            return Err(Error::BumpMalformed(format!("missing hash at height {height}, offset {offset}")));
        }

        let left_offset = offset * 2;
        let right_offset = left_offset + 1;
        let left = self.resolve(height - 1, left_offset);
        let right = self.resolve(height - 1, right_offset);
        match (left, right) {
            (Ok(left), Ok(right)) => Ok(sha256d(&[left.as_slice(), right.as_slice()].concat())),
            _ => Err(Error::BumpMalformed(format!("missing hash at height {height}, offset {offset}"))),
        }
    }

    /// Reconstructs the Merkle root for `txid` known to sit at `leaf_offset`
    /// on level 0 (§4.L). Rejects any duplicate marker on a sibling whose
    /// offset is less than the working hash's offset (CVE-2012-2459: only
    /// the right-most odd element of a level may be a duplicate). A sibling
    /// missing from its level is recursively derived from its two children
    /// one level below before the path is declared malformed.
    pub fn compute_root(&self, txid: [u8; 32], leaf_offset: u64) -> Result<[u8; 32], Error> {
        let mut working = txid;
        let mut offset = leaf_offset;

        for (height, level) in self.levels.iter().enumerate() {
            if height + 1 == self.levels.len() {
                break;
            }
            let by_offset: BTreeMap<u64, &PathElement> = level.iter().map(|e| (e.offset, e)).collect();
            let sibling_offset = offset ^ 1;

            working = match by_offset.get(&sibling_offset) {
                Some(sibling) if sibling.duplicate => {
                    if sibling_offset < offset {
                        return Err(Error::BumpMalformed(
                            "duplicate sibling at an offset left of the working hash (CVE-2012-2459)".into(),
                        ));
                    }
                    sha256d(&[working.as_slice(), working.as_slice()].concat())
                }
                Some(sibling) => {
                    let sibling_hash = sibling
                        .hash
                        .ok_or_else(|| Error::BumpMalformed("non-duplicate sibling has no hash".into()))?;
                    if sibling_offset % 2 == 0 {
                        sha256d(&[sibling_hash.as_slice(), working.as_slice()].concat())
                    } else {
                        sha256d(&[working.as_slice(), sibling_hash.as_slice()].concat())
                    }
                }
                None if height > 0 => {
                    let sibling_hash = self.resolve(height, sibling_offset)?;
                    if sibling_offset % 2 == 0 {
                        sha256d(&[sibling_hash.as_slice(), working.as_slice()].concat())
                    } else {
                        sha256d(&[working.as_slice(), sibling_hash.as_slice()].concat())
                    }
                }
                None => {
                    return Err(Error::BumpMalformed(format!(
                        "missing hash at height {height}, offset {sibling_offset}"
                    )))
                }
            };
            offset >>= 1;
        }

        Ok(working)
    }
}
