//! SMB_COM_NT_TRANSACT carriers: the 32-bit-wide transaction family.
//! Same fragment mechanics as SMB_COM_TRANSACTION, with the sub-command
//! carried in the Function word instead of setup[0] and no name string.

use binrw::prelude::*;

use crate::block::{DataBlock, ParameterBlock};
use crate::error::Result;
use crate::header::{Direction, SmbCommand, SmbHeader};
use crate::packet::{CommandCodec, SmbFrame};
use crate::transact::{lay_out_sections, plan_fragments, slice_section};

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
struct NtTransactRequestParameters {
    max_setup_count: u8,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved1: u16,
    total_parameter_count: u32,
    total_data_count: u32,
    max_parameter_count: u32,
    max_data_count: u32,
    parameter_count: u32,
    parameter_offset: u32,
    data_count: u32,
    data_offset: u32,
    #[bw(try_calc = setup.len().try_into())]
    #[br(temp)]
    setup_count: u8,
    function: u16,
    #[br(count = setup_count)]
    setup: Vec<u16>,
}

/// The primary NT request. Totals are protocol state; this frame's
/// counts and offsets are derived from `parameters`/`data` on encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NtTransactRequest {
    pub function: u16,
    pub max_parameter_count: u32,
    pub max_data_count: u32,
    pub max_setup_count: u8,
    pub setup: Vec<u16>,
    pub total_parameter_count: u32,
    pub total_data_count: u32,
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

impl NtTransactRequest {
    /// A single-fragment NT transaction whose totals cover the full
    /// payloads.
    pub fn new(function: u16, setup: Vec<u16>, parameters: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            function,
            total_parameter_count: parameters.len() as u32,
            total_data_count: data.len() as u32,
            parameters,
            data,
            setup,
            max_data_count: 0x0400,
            ..Default::default()
        }
    }

    /// Splits the transaction into a primary frame plus secondaries,
    /// parameter bytes first.
    pub fn into_frames(self, header: &SmbHeader, max_buffer_size: usize) -> Result<Vec<SmbFrame>> {
        let primary_overhead = SmbHeader::STRUCT_SIZE + 1 + 2 * (19 + self.setup.len()) + 2 + 6;
        let secondary_overhead = SmbHeader::STRUCT_SIZE + 1 + 2 * 18 + 2 + 6;
        let slices = plan_fragments(
            self.parameters.len(),
            self.data.len(),
            max_buffer_size.saturating_sub(primary_overhead),
            max_buffer_size.saturating_sub(secondary_overhead),
        )?;

        let mut frames = Vec::with_capacity(slices.len());
        for (i, slice) in slices.iter().enumerate() {
            if i == 0 {
                let primary = Self {
                    parameters: self.parameters[slice.parameters.clone()].to_vec(),
                    data: self.data[slice.data.clone()].to_vec(),
                    ..self.clone()
                };
                frames.push(SmbFrame::new(header.clone(), primary));
            } else {
                frames.push(SmbFrame::new(
                    header.clone(),
                    NtTransactSecondaryRequest {
                        total_parameter_count: self.total_parameter_count,
                        total_data_count: self.total_data_count,
                        parameter_displacement: slice.parameters.start as u32,
                        data_displacement: slice.data.start as u32,
                        parameters: self.parameters[slice.parameters.clone()].to_vec(),
                        data: self.data[slice.data.clone()].to_vec(),
                    },
                ));
            }
        }
        Ok(frames)
    }
}

impl CommandCodec for NtTransactRequest {
    const COMMAND: SmbCommand = SmbCommand::NtTransact;
    const DIRECTION: Direction = Direction::Request;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, at: u64) -> Result<Self> {
        let p: NtTransactRequestParameters = parameters.parse("SMB_Parameters")?;
        let data_start = at + 1 + 2 * (19 + p.setup.len() as u64) + 2;
        Ok(Self {
            function: p.function,
            max_parameter_count: p.max_parameter_count,
            max_data_count: p.max_data_count,
            max_setup_count: p.max_setup_count,
            setup: p.setup,
            total_parameter_count: p.total_parameter_count,
            total_data_count: p.total_data_count,
            parameters: slice_section(
                &data.bytes,
                data_start,
                p.parameter_offset as usize,
                p.parameter_count as usize,
                "ParameterOffset",
            )?,
            data: slice_section(
                &data.bytes,
                data_start,
                p.data_offset as usize,
                p.data_count as usize,
                "DataOffset",
            )?,
        })
    }

    fn to_blocks(&self, at: u64) -> Result<(ParameterBlock, DataBlock)> {
        let data_start = at + 1 + 2 * (19 + self.setup.len() as u64) + 2;
        let (bytes, parameter_offset, data_offset) =
            lay_out_sections(data_start, &[], &self.parameters, &self.data);
        let p = NtTransactRequestParameters {
            max_setup_count: self.max_setup_count,
            total_parameter_count: self.total_parameter_count,
            total_data_count: self.total_data_count,
            max_parameter_count: self.max_parameter_count,
            max_data_count: self.max_data_count,
            parameter_count: self.parameters.len() as u32,
            parameter_offset: parameter_offset as u32,
            data_count: self.data.len() as u32,
            data_offset: data_offset as u32,
            function: self.function,
            setup: self.setup.clone(),
        };
        Ok((
            ParameterBlock::build(&p, "SMB_Parameters")?,
            DataBlock::from(bytes),
        ))
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
struct NtTransactSecondaryParameters {
    #[bw(calc = [0; 3])]
    #[br(temp)]
    _reserved1: [u8; 3],
    total_parameter_count: u32,
    total_data_count: u32,
    parameter_count: u32,
    parameter_offset: u32,
    parameter_displacement: u32,
    data_count: u32,
    data_offset: u32,
    data_displacement: u32,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved2: u8,
}

/// A continuation fragment of an NT transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NtTransactSecondaryRequest {
    pub total_parameter_count: u32,
    pub total_data_count: u32,
    pub parameter_displacement: u32,
    pub data_displacement: u32,
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

impl CommandCodec for NtTransactSecondaryRequest {
    const COMMAND: SmbCommand = SmbCommand::NtTransactSecondary;
    const DIRECTION: Direction = Direction::Request;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, at: u64) -> Result<Self> {
        let p: NtTransactSecondaryParameters = parameters.parse("SMB_Parameters")?;
        let data_start = at + 1 + 2 * 18 + 2;
        Ok(Self {
            total_parameter_count: p.total_parameter_count,
            total_data_count: p.total_data_count,
            parameter_displacement: p.parameter_displacement,
            data_displacement: p.data_displacement,
            parameters: slice_section(
                &data.bytes,
                data_start,
                p.parameter_offset as usize,
                p.parameter_count as usize,
                "ParameterOffset",
            )?,
            data: slice_section(
                &data.bytes,
                data_start,
                p.data_offset as usize,
                p.data_count as usize,
                "DataOffset",
            )?,
        })
    }

    fn to_blocks(&self, at: u64) -> Result<(ParameterBlock, DataBlock)> {
        let data_start = at + 1 + 2 * 18 + 2;
        let (bytes, parameter_offset, data_offset) =
            lay_out_sections(data_start, &[], &self.parameters, &self.data);
        let p = NtTransactSecondaryParameters {
            total_parameter_count: self.total_parameter_count,
            total_data_count: self.total_data_count,
            parameter_count: self.parameters.len() as u32,
            parameter_offset: parameter_offset as u32,
            parameter_displacement: self.parameter_displacement,
            data_count: self.data.len() as u32,
            data_offset: data_offset as u32,
            data_displacement: self.data_displacement,
        };
        Ok((
            ParameterBlock::build(&p, "SMB_Parameters")?,
            DataBlock::from(bytes),
        ))
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
struct NtTransactResponseParameters {
    #[bw(calc = [0; 3])]
    #[br(temp)]
    _reserved1: [u8; 3],
    total_parameter_count: u32,
    total_data_count: u32,
    parameter_count: u32,
    parameter_offset: u32,
    parameter_displacement: u32,
    data_count: u32,
    data_offset: u32,
    data_displacement: u32,
    #[bw(try_calc = setup.len().try_into())]
    #[br(temp)]
    setup_count: u8,
    #[br(count = setup_count)]
    setup: Vec<u16>,
}

/// An NT response fragment. The Function word is not repeated; the
/// consumer tracks it per exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NtTransactResponse {
    pub total_parameter_count: u32,
    pub total_data_count: u32,
    pub parameter_displacement: u32,
    pub data_displacement: u32,
    pub setup: Vec<u16>,
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

impl CommandCodec for NtTransactResponse {
    const COMMAND: SmbCommand = SmbCommand::NtTransact;
    const DIRECTION: Direction = Direction::Response;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, at: u64) -> Result<Self> {
        let p: NtTransactResponseParameters = parameters.parse("SMB_Parameters")?;
        let data_start = at + 1 + 2 * (18 + p.setup.len() as u64) + 2;
        Ok(Self {
            total_parameter_count: p.total_parameter_count,
            total_data_count: p.total_data_count,
            parameter_displacement: p.parameter_displacement,
            data_displacement: p.data_displacement,
            parameters: slice_section(
                &data.bytes,
                data_start,
                p.parameter_offset as usize,
                p.parameter_count as usize,
                "ParameterOffset",
            )?,
            data: slice_section(
                &data.bytes,
                data_start,
                p.data_offset as usize,
                p.data_count as usize,
                "DataOffset",
            )?,
            setup: p.setup,
        })
    }

    fn to_blocks(&self, at: u64) -> Result<(ParameterBlock, DataBlock)> {
        let data_start = at + 1 + 2 * (18 + self.setup.len() as u64) + 2;
        let (bytes, parameter_offset, data_offset) =
            lay_out_sections(data_start, &[], &self.parameters, &self.data);
        let p = NtTransactResponseParameters {
            total_parameter_count: self.total_parameter_count,
            total_data_count: self.total_data_count,
            parameter_count: self.parameters.len() as u32,
            parameter_offset: parameter_offset as u32,
            parameter_displacement: self.parameter_displacement,
            data_count: self.data.len() as u32,
            data_offset: data_offset as u32,
            data_displacement: self.data_displacement,
            setup: self.setup.clone(),
        };
        Ok((
            ParameterBlock::build(&p, "SMB_Parameters")?,
            DataBlock::from(bytes),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_round_trip() {
        let request = NtTransactRequest::new(0x0007, vec![], vec![0x11; 16], vec![0x22; 24]);
        let (parameters, data) = request.to_blocks(32).unwrap();
        assert_eq!(parameters.word_count(), 19);
        let decoded = NtTransactRequest::from_blocks(&parameters, &data, 32).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_secondary_round_trip() {
        let secondary = NtTransactSecondaryRequest {
            total_parameter_count: 16,
            total_data_count: 600,
            parameter_displacement: 16,
            data_displacement: 384,
            parameters: vec![],
            data: vec![0x33; 216],
        };
        let (parameters, data) = secondary.to_blocks(32).unwrap();
        assert_eq!(parameters.word_count(), 18);
        let decoded = NtTransactSecondaryRequest::from_blocks(&parameters, &data, 32).unwrap();
        assert_eq!(decoded, secondary);
    }

    #[test]
    fn test_response_round_trip() {
        let response = NtTransactResponse {
            total_parameter_count: 4,
            total_data_count: 56,
            setup: vec![0x0102],
            parameters: vec![0x38, 0, 0, 0],
            data: vec![0x44; 56],
            ..Default::default()
        };
        let (parameters, data) = response.to_blocks(32).unwrap();
        assert_eq!(parameters.word_count(), 19);
        let decoded = NtTransactResponse::from_blocks(&parameters, &data, 32).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_into_frames_partitions_data() {
        let request = NtTransactRequest::new(0x0007, vec![], vec![0x11; 16], vec![0x22; 500]);
        let frames = request
            .into_frames(&SmbHeader::default(), 256)
            .unwrap();
        assert!(frames.len() > 1);
        assert_eq!(frames[0].header.command, SmbCommand::NtTransact);
        for frame in &frames[1..] {
            assert_eq!(frame.header.command, SmbCommand::NtTransactSecondary);
        }
    }
}
