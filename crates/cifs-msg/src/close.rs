//! SMB_COM_CLOSE request and response.

use binrw::prelude::*;
use cifs_dtyp::file_time::Utime;

use crate::block::{DataBlock, ParameterBlock};
use crate::error::{CodecError, Result};
use crate::header::{Direction, SmbCommand};
use crate::packet::CommandCodec;

#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct CloseRequest {
    pub fid: u16,
    pub last_time_modified: Utime,
}

impl CommandCodec for CloseRequest {
    const COMMAND: SmbCommand = SmbCommand::Close;
    const DIRECTION: Direction = Direction::Request;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, _at: u64) -> Result<Self> {
        if data.byte_count() != 0 {
            return Err(CodecError::format(
                "ByteCount",
                "a close request carries no data bytes",
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

/// A close response is both blocks empty; decoding validates exactly
/// that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseResponse;

impl CommandCodec for CloseResponse {
    const COMMAND: SmbCommand = SmbCommand::Close;
    const DIRECTION: Direction = Direction::Response;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, _at: u64) -> Result<Self> {
        if parameters.word_count() != 0 {
            return Err(CodecError::format(
                "WordCount",
                "a close response carries no parameter words",
            ));
        }
        if data.byte_count() != 0 {
            return Err(CodecError::format(
                "ByteCount",
                "a close response carries no data bytes",
            ));
        }
        Ok(Self)
    }

    fn to_blocks(&self, _at: u64) -> Result<(ParameterBlock, DataBlock)> {
        Ok((ParameterBlock::default(), DataBlock::default()))
    }
}
