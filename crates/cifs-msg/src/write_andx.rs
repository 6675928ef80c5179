//! SMB_COM_WRITE_ANDX request and response.

use binrw::prelude::*;
use modular_bitfield::prelude::*;

use crate::block::{DataBlock, ParameterBlock};
use crate::error::{CodecError, Result};
use crate::header::{Direction, SmbCommand};
use crate::packet::CommandCodec;

#[bitfield]
#[derive(BinWrite, BinRead, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct WriteMode {
    pub write_through: bool,
    pub read_bytes_available: bool,
    pub raw_mode: bool,
    pub msg_start: bool,
    #[skip]
    __: B12,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
struct WriteAndxRequestParameters {
    fid: u16,
    offset: u32,
    timeout: u32,
    write_mode: WriteMode,
    remaining: u16,
    data_length_high: u16,
    data_length: u16,
    data_offset: u16,
}

/// Write request: padding then `DataLength` payload bytes in the data
/// block, mirroring the read response layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteAndxRequest {
    pub fid: u16,
    pub offset: u32,
    pub timeout: u32,
    pub write_mode: WriteMode,
    pub remaining: u16,
    pub pad: Vec<u8>,
    pub data: Vec<u8>,
}

impl WriteAndxRequest {
    /// Parameter words on the wire, including the AndX link.
    const WORD_COUNT: usize = 12;
}

impl CommandCodec for WriteAndxRequest {
    const COMMAND: SmbCommand = SmbCommand::WriteAndx;
    const DIRECTION: Direction = Direction::Request;
    const ANDX_CAPABLE: bool = true;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, _at: u64) -> Result<Self> {
        let p: WriteAndxRequestParameters = parameters.parse("SMB_Parameters")?;
        if p.data_length_high != 0 {
            return Err(CodecError::format(
                "DataLengthHigh",
                "large writes are not modeled; the field must be zero",
            ));
        }
        let (pad, payload) = data.split_padding(p.data_length as usize, "DataLength")?;
        Ok(Self {
            fid: p.fid,
            offset: p.offset,
            timeout: p.timeout,
            write_mode: p.write_mode,
            remaining: p.remaining,
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
        let p = WriteAndxRequestParameters {
            fid: self.fid,
            offset: self.offset,
            timeout: self.timeout,
            write_mode: self.write_mode,
            remaining: self.remaining,
            data_length_high: 0,
            data_length,
            data_offset,
        };
        Ok((
            ParameterBlock::build(&p, "SMB_Parameters")?,
            DataBlock::from_pad_payload(&self.pad, &self.data),
        ))
    }
}

#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct WriteAndxResponse {
    pub count: u16,
    pub available: u16,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved: u32,
}

impl CommandCodec for WriteAndxResponse {
    const COMMAND: SmbCommand = SmbCommand::WriteAndx;
    const DIRECTION: Direction = Direction::Response;
    const ANDX_CAPABLE: bool = true;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, _at: u64) -> Result<Self> {
        if data.byte_count() != 0 {
            return Err(CodecError::format(
                "ByteCount",
                "a write response carries no data bytes",
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_andx_request_round_trip() {
        let request = WriteAndxRequest {
            fid: 0x4001,
            offset: 0x1000,
            timeout: 0,
            write_mode: WriteMode::new().with_write_through(true),
            remaining: 0,
            pad: vec![0],
            data: vec![0xaa; 16],
        };
        let (parameters, data) = request.to_blocks(32).unwrap();
        assert_eq!(parameters.word_count(), 10);
        assert_eq!(data.byte_count(), 17);
        let decoded = WriteAndxRequest::from_blocks(&parameters, &data, 32).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_write_andx_request_rejects_high_length() {
        let request = WriteAndxRequest {
            data: vec![1, 2, 3],
            ..Default::default()
        };
        let (mut parameters, data) = request.to_blocks(32).unwrap();
        // DataLengthHigh is the word at index 7 of the 10-word layout.
        parameters.words[7] = 1;
        assert!(matches!(
            WriteAndxRequest::from_blocks(&parameters, &data, 32),
            Err(CodecError::Format {
                field: "DataLengthHigh",
                ..
            })
        ));
    }

    #[test]
    fn test_write_andx_response_round_trip() {
        let response = WriteAndxResponse {
            count: 16,
            available: 0xffff,
        };
        let (parameters, data) = response.to_blocks(32).unwrap();
        assert_eq!(parameters.word_count(), 4);
        let decoded = WriteAndxResponse::from_blocks(&parameters, &data, 32).unwrap();
        assert_eq!(decoded, response);
    }
}
