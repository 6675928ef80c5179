//! SMB_COM_READ_ANDX request and response.

use binrw::prelude::*;

use crate::block::{DataBlock, ParameterBlock};
use crate::error::{CodecError, Result};
use crate::header::{Direction, SmbCommand};
use crate::packet::CommandCodec;

/// Read request parameters, past the AndX link: 8 words.
#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct ReadAndxRequest {
    pub fid: u16,
    pub offset: u32,
    pub max_count: u16,
    pub min_count: u16,
    pub timeout: u32,
    pub remaining: u16,
}

impl CommandCodec for ReadAndxRequest {
    const COMMAND: SmbCommand = SmbCommand::ReadAndx;
    const DIRECTION: Direction = Direction::Request;
    const ANDX_CAPABLE: bool = true;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, _at: u64) -> Result<Self> {
        if data.byte_count() != 0 {
            return Err(CodecError::format(
                "ByteCount",
                "a read request carries no data bytes",
            ));
        }
        parameters.parse("SMB_Parameters")
    }

    fn to_blocks(&self, _at: u64) -> Result<(ParameterBlock, DataBlock)> {
        Ok((
            ParameterBlock::build(self, "SMB_Parameters")?,
            DataBlock::default(),
        ))
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
struct ReadAndxResponseParameters {
    available: u16,
    #[bw(calc = 0)]
    #[br(temp)]
    _data_compaction_mode: u16,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved1: u16,
    data_length: u16,
    data_offset: u16,
    #[bw(calc = [0; 5])]
    #[br(temp)]
    _reserved2: [u16; 5],
}

/// Read response: the data block is leading padding followed by
/// `DataLength` payload bytes; both survive a round trip verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadAndxResponse {
    pub available: u16,
    pub pad: Vec<u8>,
    pub data: Vec<u8>,
}

impl ReadAndxResponse {
    /// Parameter words on the wire, including the AndX link.
    const WORD_COUNT: usize = 12;
}

impl CommandCodec for ReadAndxResponse {
    const COMMAND: SmbCommand = SmbCommand::ReadAndx;
    const DIRECTION: Direction = Direction::Response;
    const ANDX_CAPABLE: bool = true;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, _at: u64) -> Result<Self> {
        let p: ReadAndxResponseParameters = parameters.parse("SMB_Parameters")?;
        let (pad, payload) = data.split_padding(p.data_length as usize, "DataLength")?;
        Ok(Self {
            available: p.available,
            pad: pad.to_vec(),
            data: payload.to_vec(),
        })
    }

    fn to_blocks(&self, at: u64) -> Result<(ParameterBlock, DataBlock)> {
        let data_length: u16 = self.data.len().try_into().map_err(|_| {
            CodecError::format("DataLength", "payload exceeds a 16-bit byte count")
        })?;
        let data_offset: u16 = (at + 1 + 2 * Self::WORD_COUNT as u64 + 2 + self.pad.len() as u64)
            .try_into()
            .map_err(|_| CodecError::format("DataOffset", "payload starts past 16-bit range"))?;
        let p = ReadAndxResponseParameters {
            available: self.available,
            data_length,
            data_offset,
        };
        Ok((
            ParameterBlock::build(&p, "SMB_Parameters")?,
            DataBlock::from_pad_payload(&self.pad, &self.data),
        ))
    }
}
