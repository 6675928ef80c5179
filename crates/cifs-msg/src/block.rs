//! The two generic carrier blocks every command is built from: a
//! word-counted parameter section and a byte-counted data section.
//! Concrete codecs interpret them through the typed `parse`/`build`
//! bridges.

use binrw::prelude::*;

use crate::error::{CodecError, Result};

/// Length-prefixed sequence of 16-bit words: a 1-byte word count, then
/// exactly that many little-endian words.
#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct ParameterBlock {
    #[bw(try_calc = words.len().try_into())]
    #[br(temp)]
    word_count: u8,
    #[br(count = word_count)]
    pub words: Vec<u16>,
}

impl ParameterBlock {
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Serialized byte length of the words, excluding the count prefix.
    pub fn byte_len(&self) -> usize {
        self.words.len() * 2
    }

    /// The words as their little-endian byte image.
    pub fn bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Interprets the words as the typed layout `T`, which must cover
    /// the block exactly. An empty block where `T` expects fields is a
    /// format error naming `field`.
    pub fn parse<T>(&self, field: &'static str) -> Result<T>
    where
        T: for<'a> BinRead<Args<'a> = ()>,
    {
        if self.words.is_empty() {
            return Err(CodecError::format(field, "word count is zero"));
        }
        let bytes = self.bytes();
        let mut cursor = std::io::Cursor::new(bytes.as_slice());
        let value = T::read_le(&mut cursor)?;
        if cursor.position() as usize != bytes.len() {
            return Err(CodecError::format(
                field,
                format!(
                    "layout covers {} of {} parameter bytes",
                    cursor.position(),
                    bytes.len()
                ),
            ));
        }
        Ok(value)
    }

    /// Lowers a typed layout into words. A layout whose serialized
    /// length is not word-aligned is a format error naming `field`.
    pub fn build<T>(value: &T, field: &'static str) -> Result<Self>
    where
        T: for<'a> BinWrite<Args<'a> = ()>,
    {
        let mut cursor = std::io::Cursor::new(Vec::new());
        value.write_le(&mut cursor)?;
        let bytes = cursor.into_inner();
        if bytes.len() % 2 != 0 {
            return Err(CodecError::format(
                field,
                format!("layout is {} bytes, not word-aligned", bytes.len()),
            ));
        }
        let words = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(Self { words })
    }
}

impl From<Vec<u16>> for ParameterBlock {
    fn from(words: Vec<u16>) -> Self {
        Self { words }
    }
}

/// Length-prefixed raw payload: a 2-byte byte count, then exactly that
/// many bytes, logically padding-then-payload.
#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct DataBlock {
    #[bw(try_calc = bytes.len().try_into())]
    #[br(temp)]
    byte_count: u16,
    #[br(count = byte_count)]
    pub bytes: Vec<u8>,
}

impl DataBlock {
    pub fn byte_count(&self) -> usize {
        self.bytes.len()
    }

    /// Splits the block into leading padding and a `payload_len`-byte
    /// payload, as read/write style commands lay their data out. A
    /// declared payload larger than the block is a format error naming
    /// `field`, never a silent truncation.
    pub fn split_padding(&self, payload_len: usize, field: &'static str) -> Result<(&[u8], &[u8])> {
        let total = self.bytes.len();
        if payload_len > total {
            return Err(CodecError::format(
                field,
                format!("declared payload of {payload_len} bytes exceeds byte count {total}"),
            ));
        }
        Ok(self.bytes.split_at(total - payload_len))
    }

    /// Composes a block from padding followed by payload.
    pub fn from_pad_payload(pad: &[u8], payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(pad.len() + payload.len());
        bytes.extend_from_slice(pad);
        bytes.extend_from_slice(payload);
        Self { bytes }
    }
}

impl From<Vec<u8>> for DataBlock {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}
