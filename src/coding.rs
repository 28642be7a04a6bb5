// Bitcoin SV transaction and key-derivation library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Adapted from the Bitcoin protocol consensus library's wire-format codec
// layer (the `ConsensusEncode`/`ConsensusDecode` traits and `VarInt`), with
// BSV's historical quirks: the read path accepts non-minimally-encoded
// varints, and there are no segwit marker bytes or witness fields anywhere
// in the wire format.

use std::io::{self, Cursor, Read, Write};

use crate::Error;

/// A variable-length unsigned integer, Bitcoin's compact length-prefix
/// encoding.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct VarInt(pub u64);

impl VarInt {
    pub const fn new(u: u64) -> Self { VarInt(u) }

    pub fn with(u: impl Into<usize>) -> Self { VarInt(u.into() as u64) }

    /// Length in bytes this `VarInt` occupies once encoded.
    #[inline]
    pub const fn len(&self) -> usize {
        match self.0 {
            0..=0xFC => 1,
            0xFD..=0xFFFF => 3,
            0x10000..=0xFFFFFFFF => 5,
            _ => 9,
        }
    }

    pub const fn is_empty(&self) -> bool { false }

    pub const fn to_u64(&self) -> u64 { self.0 }
    pub const fn into_u64(self) -> u64 { self.0 }

    pub fn to_usize(&self) -> usize {
        usize::try_from(self.0).expect("transaction too large for a non-64-bit platform")
    }
    pub fn into_usize(self) -> usize { self.to_usize() }
}

impl<U: Into<u64> + Copy> PartialEq<U> for VarInt {
    fn eq(&self, other: &U) -> bool { self.0.eq(&(*other).into()) }
}

/// Types that can be written in Bitcoin's consensus binary layout.
pub trait ConsensusEncode {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error>;

    fn consensus_serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.consensus_encode(&mut buf)
            .expect("in-memory writing can't fail");
        buf
    }
}

/// Types that can be read back from Bitcoin's consensus binary layout.
pub trait ConsensusDecode
where Self: Sized
{
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error>;

    fn consensus_deserialize(bytes: impl AsRef<[u8]>) -> Result<Self, Error> {
        let mut cursor = Cursor::new(bytes.as_ref());
        let me = Self::consensus_decode(&mut cursor)?;
        if cursor.position() as usize != bytes.as_ref().len() {
            return Err(Error::DataNotConsumed);
        }
        Ok(me)
    }
}

impl ConsensusEncode for VarInt {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        match self.0 {
            0..=0xFC => {
                (self.0 as u8).consensus_encode(writer)?;
                Ok(1)
            }
            0xFD..=0xFFFF => {
                0xFDu8.consensus_encode(writer)?;
                (self.0 as u16).consensus_encode(writer)?;
                Ok(3)
            }
            0x10000..=0xFFFFFFFF => {
                0xFEu8.consensus_encode(writer)?;
                (self.0 as u32).consensus_encode(writer)?;
                Ok(5)
            }
            _ => {
                0xFFu8.consensus_encode(writer)?;
                self.0.consensus_encode(writer)?;
                Ok(9)
            }
        }
    }
}

impl ConsensusDecode for VarInt {
    // BSV's read path does not require minimal VarInt encoding: a node will
    // happily relay a transaction whose varints are over-long. Rejecting
    // them here would make this library stricter than the network it talks
    // to, so non-minimal forms are accepted rather than treated as
    // `TruncatedInput`/`InvalidEncoding`.
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        let n = u8::consensus_decode(reader)?;
        match n {
            0xFF => Ok(VarInt::new(u64::consensus_decode(reader)?)),
            0xFE => Ok(VarInt::new(u32::consensus_decode(reader)? as u64)),
            0xFD => Ok(VarInt::with(u16::consensus_decode(reader)?)),
            n => Ok(VarInt::with(n)),
        }
    }
}

impl<T: ConsensusEncode> ConsensusEncode for Vec<T> {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        let mut counter = VarInt::with(self.len()).consensus_encode(writer)?;
        for item in self {
            counter += item.consensus_encode(writer)?;
        }
        Ok(counter)
    }
}

impl<T: ConsensusDecode> ConsensusDecode for Vec<T> {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        let len = VarInt::consensus_decode(reader)?;
        let mut items = Vec::with_capacity(len.to_usize().min(1 << 20));
        for _ in 0..len.to_u64() {
            items.push(T::consensus_decode(reader)?);
        }
        Ok(items)
    }
}

/// A byte string prefixed by its `VarInt` length (scripts, raw tx blobs).
#[derive(Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct ByteStr(Vec<u8>);

impl ByteStr {
    pub fn len_var_int(&self) -> VarInt { VarInt(self.0.len() as u64) }
    pub fn into_vec(self) -> Vec<u8> { self.0 }
    pub fn as_slice(&self) -> &[u8] { &self.0 }
}

impl From<Vec<u8>> for ByteStr {
    fn from(value: Vec<u8>) -> Self { Self(value) }
}

impl AsRef<[u8]> for ByteStr {
    fn as_ref(&self) -> &[u8] { &self.0 }
}

impl ConsensusEncode for ByteStr {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        let mut counter = self.len_var_int().consensus_encode(writer)?;
        writer.write_all(&self.0)?;
        counter += self.0.len();
        Ok(counter)
    }
}

impl ConsensusDecode for ByteStr {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        let len = VarInt::consensus_decode(reader)?.to_usize();
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::TruncatedInput,
            _ => Error::from(e),
        })?;
        Ok(ByteStr(buf))
    }
}

impl ConsensusEncode for u8 {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        writer.write_all(&[*self])?;
        Ok(1)
    }
}

impl ConsensusDecode for u8 {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        let mut buf = [0u8; 1];
        read_exact(reader, &mut buf)?;
        Ok(buf[0])
    }
}

macro_rules! impl_int_codec {
    ($ty:ty, $len:expr) => {
        impl ConsensusEncode for $ty {
            fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
                writer.write_all(&self.to_le_bytes())?;
                Ok($len)
            }
        }

        impl ConsensusDecode for $ty {
            fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
                let mut buf = [0u8; $len];
                read_exact(reader, &mut buf)?;
                Ok(Self::from_le_bytes(buf))
            }
        }
    };
}

impl_int_codec!(u16, 2);
impl_int_codec!(u32, 4);
impl_int_codec!(i32, 4);
impl_int_codec!(u64, 8);

impl ConsensusDecode for [u8; 32] {
    fn consensus_decode(reader: &mut impl Read) -> Result<Self, Error> {
        let mut buf = [0u8; 32];
        read_exact(reader, &mut buf)?;
        Ok(buf)
    }
}

impl ConsensusEncode for [u8; 32] {
    fn consensus_encode(&self, writer: &mut impl Write) -> Result<usize, Error> {
        writer.write_all(self)?;
        Ok(32)
    }
}

fn read_exact(reader: &mut impl Read, buf: &mut [u8]) -> Result<(), Error> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::TruncatedInput,
        _ => Error::from(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize(t: &impl ConsensusEncode) -> Vec<u8> { t.consensus_serialize() }

    fn deserialize<T: ConsensusDecode>(d: impl AsRef<[u8]>) -> Result<T, Error> {
        T::consensus_deserialize(d)
    }

    #[test]
    fn serialize_int_test() {
        assert_eq!(serialize(&1u8), vec![1u8]);
        assert_eq!(serialize(&256u16), vec![0u8, 1]);
        assert_eq!(serialize(&500000u32), vec![32u8, 161, 7, 0]);
        assert_eq!(serialize(&-1i32), vec![255u8, 255, 255, 255]);
        assert_eq!(serialize(&723401728380766730u64), vec![
            10u8, 10, 10, 10, 10, 10, 10, 10
        ]);
    }

    #[test]
    fn serialize_varint_test() {
        assert_eq!(serialize(&VarInt(10)), vec![10u8]);
        assert_eq!(serialize(&VarInt(0xFC)), vec![0xFCu8]);
        assert_eq!(serialize(&VarInt(0xFD)), vec![0xFDu8, 0xFD, 0]);
        assert_eq!(serialize(&VarInt(0xFFF)), vec![0xFDu8, 0xFF, 0xF]);
        assert_eq!(serialize(&VarInt(0xF0F0F0F)), vec![0xFEu8, 0xF, 0xF, 0xF, 0xF]);

        assert_eq!(VarInt(0).len(), 1);
        assert_eq!(VarInt(0xFD).len(), 3);
        assert_eq!(VarInt(0x10000).len(), 5);
        assert_eq!(VarInt(u64::MAX).len(), 9);
    }

    #[test]
    fn deserialize_nonminimal_varint_is_accepted() {
        // BSV's read path accepts over-long varint encodings (unlike the
        // stricter consensus libraries this codec was adapted from).
        let overlong = [0xFDu8, 0x0A, 0x00];
        assert_eq!(deserialize::<VarInt>(&overlong).unwrap(), VarInt(10));
    }

    #[test]
    fn deserialize_int_test() {
        assert_eq!(deserialize::<u8>([58u8]).ok(), Some(58u8));
        assert_eq!(deserialize::<u16>([0x01u8, 0x02]).ok(), Some(0x0201u16));
        assert!(deserialize::<u16>([1u8]).is_err());
    }

    #[test]
    fn truncated_bytestr_errors() {
        let err = deserialize::<ByteStr>([0x05u8, 1, 2]).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput));
    }
}
