//! SMB_COM_TRANSACTION carriers: primary and secondary requests plus
//! the response. These hold raw fragment bytes; sub-command meaning is
//! applied only after reassembly, via the registry.

use binrw::NullString;
use binrw::prelude::*;

use crate::block::{DataBlock, ParameterBlock};
use crate::error::{CodecError, Result};
use crate::header::{Direction, SmbCommand, SmbHeader};
use crate::packet::{CommandCodec, SmbFrame};
use crate::transact::{lay_out_sections, plan_fragments, slice_section};

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
struct TransactionRequestParameters {
    total_parameter_count: u16,
    total_data_count: u16,
    max_parameter_count: u16,
    max_data_count: u16,
    max_setup_count: u8,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved1: u8,
    flags: u16,
    timeout: u32,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved2: u16,
    parameter_count: u16,
    parameter_offset: u16,
    data_count: u16,
    data_offset: u16,
    #[bw(try_calc = setup.len().try_into())]
    #[br(temp)]
    setup_count: u8,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved3: u8,
    #[br(count = setup_count)]
    setup: Vec<u16>,
}

/// The primary request. `parameters`/`data` hold this frame's fragment;
/// the totals declare the full logical buffers and are protocol state,
/// not derived on encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    /// OEM transaction name, e.g. `\MAILSLOT\messenger`.
    pub name: NullString,
    pub flags: u16,
    pub timeout: u32,
    pub max_parameter_count: u16,
    pub max_data_count: u16,
    pub max_setup_count: u8,
    pub setup: Vec<u16>,
    pub total_parameter_count: u16,
    pub total_data_count: u16,
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

fn name_bytes(name: &NullString) -> Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    name.write_le(&mut cursor)?;
    Ok(cursor.into_inner())
}

impl TransactionRequest {
    /// A single-fragment transaction whose totals cover the full
    /// payloads.
    pub fn new(
        name: NullString,
        setup: Vec<u16>,
        parameters: Vec<u8>,
        data: Vec<u8>,
    ) -> Result<Self> {
        let total_parameter_count = parameters.len().try_into().map_err(|_| {
            CodecError::format("TotalParameterCount", "parameters exceed 16-bit range")
        })?;
        let total_data_count = data
            .len()
            .try_into()
            .map_err(|_| CodecError::format("TotalDataCount", "data exceeds 16-bit range"))?;
        Ok(Self {
            name,
            setup,
            total_parameter_count,
            total_data_count,
            parameters,
            data,
            max_data_count: 0x0400,
            ..Default::default()
        })
    }

    fn data_start(&self, at: u64) -> u64 {
        at + 1 + 2 * (14 + self.setup.len() as u64) + 2
    }

    /// Splits the transaction into a primary frame plus as many
    /// secondaries as the buffer size requires, parameter bytes first.
    pub fn into_frames(self, header: &SmbHeader, max_buffer_size: usize) -> Result<Vec<SmbFrame>> {
        let name_len = name_bytes(&self.name)?.len();
        // Fixed bytes around the payload regions, with worst-case
        // alignment padding.
        let primary_overhead =
            SmbHeader::STRUCT_SIZE + 1 + 2 * (14 + self.setup.len()) + 2 + name_len + 6;
        let secondary_overhead = SmbHeader::STRUCT_SIZE + 1 + 2 * 8 + 2 + 6;
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
                    TransactionSecondaryRequest {
                        total_parameter_count: self.total_parameter_count,
                        total_data_count: self.total_data_count,
                        parameter_displacement: slice.parameters.start as u16,
                        data_displacement: slice.data.start as u16,
                        parameters: self.parameters[slice.parameters.clone()].to_vec(),
                        data: self.data[slice.data.clone()].to_vec(),
                    },
                ));
            }
        }
        Ok(frames)
    }
}

impl CommandCodec for TransactionRequest {
    const COMMAND: SmbCommand = SmbCommand::Transaction;
    const DIRECTION: Direction = Direction::Request;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, at: u64) -> Result<Self> {
        let p: TransactionRequestParameters = parameters.parse("SMB_Parameters")?;
        let data_start = at + 1 + 2 * (14 + p.setup.len() as u64) + 2;
        let mut cursor = std::io::Cursor::new(data.bytes.as_slice());
        let name = NullString::read_le(&mut cursor)?;
        Ok(Self {
            name,
            flags: p.flags,
            timeout: p.timeout,
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
        let prefix = name_bytes(&self.name)?;
        let (bytes, parameter_offset, data_offset) =
            lay_out_sections(self.data_start(at), &prefix, &self.parameters, &self.data);
        let p = TransactionRequestParameters {
            total_parameter_count: self.total_parameter_count,
            total_data_count: self.total_data_count,
            max_parameter_count: self.max_parameter_count,
            max_data_count: self.max_data_count,
            max_setup_count: self.max_setup_count,
            flags: self.flags,
            timeout: self.timeout,
            parameter_count: self
                .parameters
                .len()
                .try_into()
                .map_err(|_| CodecError::format("ParameterCount", "fragment exceeds 16 bits"))?,
            parameter_offset: parameter_offset
                .try_into()
                .map_err(|_| CodecError::format("ParameterOffset", "offset exceeds 16 bits"))?,
            data_count: self
                .data
                .len()
                .try_into()
                .map_err(|_| CodecError::format("DataCount", "fragment exceeds 16 bits"))?,
            data_offset: data_offset
                .try_into()
                .map_err(|_| CodecError::format("DataOffset", "offset exceeds 16 bits"))?,
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
struct TransactionSecondaryParameters {
    total_parameter_count: u16,
    total_data_count: u16,
    parameter_count: u16,
    parameter_offset: u16,
    parameter_displacement: u16,
    data_count: u16,
    data_offset: u16,
    data_displacement: u16,
}

/// A continuation fragment. Displacements locate this frame's bytes in
/// the logical buffers; totals restate the primary's declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSecondaryRequest {
    pub total_parameter_count: u16,
    pub total_data_count: u16,
    pub parameter_displacement: u16,
    pub data_displacement: u16,
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

impl CommandCodec for TransactionSecondaryRequest {
    const COMMAND: SmbCommand = SmbCommand::TransactionSecondary;
    const DIRECTION: Direction = Direction::Request;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, at: u64) -> Result<Self> {
        let p: TransactionSecondaryParameters = parameters.parse("SMB_Parameters")?;
        let data_start = at + 1 + 2 * 8 + 2;
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
        let data_start = at + 1 + 2 * 8 + 2;
        let (bytes, parameter_offset, data_offset) =
            lay_out_sections(data_start, &[], &self.parameters, &self.data);
        let p = TransactionSecondaryParameters {
            total_parameter_count: self.total_parameter_count,
            total_data_count: self.total_data_count,
            parameter_count: self
                .parameters
                .len()
                .try_into()
                .map_err(|_| CodecError::format("ParameterCount", "fragment exceeds 16 bits"))?,
            parameter_offset: parameter_offset
                .try_into()
                .map_err(|_| CodecError::format("ParameterOffset", "offset exceeds 16 bits"))?,
            parameter_displacement: self.parameter_displacement,
            data_count: self
                .data
                .len()
                .try_into()
                .map_err(|_| CodecError::format("DataCount", "fragment exceeds 16 bits"))?,
            data_offset: data_offset
                .try_into()
                .map_err(|_| CodecError::format("DataOffset", "offset exceeds 16 bits"))?,
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
struct TransactionResponseParameters {
    total_parameter_count: u16,
    total_data_count: u16,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved1: u16,
    parameter_count: u16,
    parameter_offset: u16,
    parameter_displacement: u16,
    data_count: u16,
    data_offset: u16,
    data_displacement: u16,
    #[bw(try_calc = setup.len().try_into())]
    #[br(temp)]
    setup_count: u8,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved2: u8,
    #[br(count = setup_count)]
    setup: Vec<u16>,
}

/// A response fragment. Responses do not repeat the sub-command id; the
/// consumer tracks it per exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionResponse {
    pub total_parameter_count: u16,
    pub total_data_count: u16,
    pub parameter_displacement: u16,
    pub data_displacement: u16,
    pub setup: Vec<u16>,
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

impl CommandCodec for TransactionResponse {
    const COMMAND: SmbCommand = SmbCommand::Transaction;
    const DIRECTION: Direction = Direction::Response;

    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, at: u64) -> Result<Self> {
        let p: TransactionResponseParameters = parameters.parse("SMB_Parameters")?;
        let data_start = at + 1 + 2 * (10 + p.setup.len() as u64) + 2;
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
        let data_start = at + 1 + 2 * (10 + self.setup.len() as u64) + 2;
        let (bytes, parameter_offset, data_offset) =
            lay_out_sections(data_start, &[], &self.parameters, &self.data);
        let p = TransactionResponseParameters {
            total_parameter_count: self.total_parameter_count,
            total_data_count: self.total_data_count,
            parameter_count: self
                .parameters
                .len()
                .try_into()
                .map_err(|_| CodecError::format("ParameterCount", "fragment exceeds 16 bits"))?,
            parameter_offset: parameter_offset
                .try_into()
                .map_err(|_| CodecError::format("ParameterOffset", "offset exceeds 16 bits"))?,
            parameter_displacement: self.parameter_displacement,
            data_count: self
                .data
                .len()
                .try_into()
                .map_err(|_| CodecError::format("DataCount", "fragment exceeds 16 bits"))?,
            data_offset: data_offset
                .try_into()
                .map_err(|_| CodecError::format("DataOffset", "offset exceeds 16 bits"))?,
            data_displacement: self.data_displacement,
            setup: self.setup.clone(),
        };
        Ok((
            ParameterBlock::build(&p, "SMB_Parameters")?,
            DataBlock::from(bytes),
        ))
    }
}
