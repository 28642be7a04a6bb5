// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Token-lineage tracing across a chain of hops (§9 design note, §11 Open
// Question resolution). The source's validator follows only the first
// input of each hop, which is unsound for multi-input token splits; this
// target's `TokenLineage::validate` walks every input of every hop and
// requires the token identity (owner/redemption PKH, splittable flag)
// extracted by `script::classify` to agree across all of a hop's token
// inputs, rather than trusting input 0 alone. No teacher precedent (LNP/BP
// has unrelated client-side-validation "seals", not token provenance);
// grounded directly in §4.F's `ScriptType` and the resolution text in §9/§11.

use crate::script::{classify, ScriptType};
use crate::tx::Transaction;
use crate::Error;

/// The token-identifying fields a hop's inputs must agree on, extracted
/// from whichever token `ScriptType` variant the source script classifies
/// as. Non-token script types (P2PKH, OP_RETURN, Unknown) carry no
/// identity and are ignored by `TokenLineage::validate`.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum TokenIdentity {
    StasV2 { owner_pkh: [u8; 20], redemption_pkh: [u8; 20], splittable: bool },
    StasBtg { owner_pkh: [u8; 20] },
    Dstas { owner_pkh: [u8; 20] },
}

fn token_identity(locking_script: &[u8]) -> Option<TokenIdentity> {
    match classify(locking_script) {
        ScriptType::StasV2 { owner_pkh, redemption_pkh, splittable } => {
            Some(TokenIdentity::StasV2 { owner_pkh, redemption_pkh, splittable })
        }
        ScriptType::StasBtg { owner_pkh } => Some(TokenIdentity::StasBtg { owner_pkh }),
        ScriptType::Dstas { owner_pkh, .. } => Some(TokenIdentity::Dstas { owner_pkh }),
        ScriptType::P2pkh { .. } | ScriptType::OpReturn | ScriptType::Unknown => None,
    }
}

/// One step of a token's spend history: the transaction plus the locking
/// script of whichever source output each input spends, aligned by index.
/// `Transaction`/`TxIn` carry no source-output metadata on the wire (§3),
/// so the caller supplies it out-of-band, mirroring `templates::SourceOutput`.
pub struct Hop<'a> {
    pub tx: &'a Transaction,
    pub source_locking_scripts: Vec<Option<&'a [u8]>>,
}

/// Validates token provenance across a chain of hops.
pub struct TokenLineage;

impl TokenLineage {
    /// Walks every input of every hop. Within a hop, every input whose
    /// source script classifies as a token type must agree on its
    /// `TokenIdentity` with every other token input of that same hop
    /// (the multi-input-split case the source's input-0-only check missed).
    /// Across hops, the resolved identity of hop `i+1` must match the
    /// identity carried by hop `i`'s matching output.
    pub fn validate(hops: &[Hop]) -> Result<(), Error> {
        let mut previous_identity: Option<TokenIdentity> = None;
        for hop in hops {
            if hop.source_locking_scripts.len() != hop.tx.inputs.len() {
                return Err(Error::InvalidParameter("source script list does not match input count"));
            }
            let mut hop_identity: Option<TokenIdentity> = None;
            for source in hop.source_locking_scripts.iter().flatten() {
                let Some(identity) = token_identity(source) else { continue };
                match hop_identity {
                    None => hop_identity = Some(identity),
                    Some(existing) if existing == identity => {}
                    Some(_) => {
                        return Err(Error::InvalidParameter(
                            "hop's token inputs disagree on token identity",
                        ))
                    }
                }
            }

            if let (Some(expected), Some(actual)) = (previous_identity, hop_identity) {
                if expected != actual {
                    return Err(Error::InvalidParameter(
                        "hop's token identity does not match the previous hop",
                    ));
                }
            }

            if let Some(identity) = hop_identity {
                previous_identity = Some(identity);
            }
        }
        Ok(())
    }
}
