// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;

use amplify::IoError;

/// The single fallible-return error type shared across the whole crate.
///
/// Each variant corresponds to one of the distinct failure kinds the library
/// surfaces to callers; no operation in the public API panics on adversarial
/// input.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum Error {
    /// malformed DER, base58, varint, or BEEF container data.
    #[from]
    InvalidEncoding(EncodingError),

    /// scalar is zero or not reduced modulo the curve order.
    OutOfRangeScalar,

    /// parsed point does not satisfy the curve equation.
    NotOnCurve,

    /// sighash type byte is missing the mandatory FORKID bit (0x40).
    MissingForkid,

    /// signing template invoked on an input whose source output is unknown.
    MissingSourceOutput,

    /// input index, vout, or Merkle leaf offset is out of range.
    IndexOutOfRange,

    /// signature, HMAC, GCM tag, or checksum verification failed.
    VerificationFailure,

    /// Merkle path is self-contradictory or violates CVE-2012-2459.
    #[display("Merkle path malformed: {0}")]
    BumpMalformed(String),

    /// parser ran past the end of the input buffer.
    TruncatedInput,

    /// invoice number, key ID, or protocol string violates BRC-43.
    #[display("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// unexpected trailing bytes after a complete value.
    DataNotConsumed,

    /// hardened HD child derivation requested without the parent private key.
    MissingPrivateKey,

    #[from]
    #[display(inner)]
    Io(IoError),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self { Error::Io(e.into()) }
}

/// Errors specific to byte-level codecs (DER, base58, varint, BEEF framing).
#[derive(Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum EncodingError {
    /// DER signature encoding is malformed.
    Der,
    /// base58check payload failed its checksum.
    Base58Checksum,
    /// base58 string contains a character outside the alphabet.
    Base58Alphabet,
    /// BEEF container carries an unrecognized version tag.
    BeefVersion(u32),
    /// BEEF container references a BUMP index that does not exist.
    BeefBumpIndex(usize),
}
