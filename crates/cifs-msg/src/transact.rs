//! Transaction fragmentation and reassembly.
//!
//! A transaction whose parameter/data payloads exceed one frame travels
//! as a primary request plus displacement-ordered secondary requests.
//! [`FragmentBuffer`] accumulates one section's fragments; the
//! reassembly drivers combine both sections and hand the completed
//! payload to the registry for sub-command interpretation.

use std::ops::Range;

use binrw::NullString;

use crate::error::{CodecError, Result};
use crate::nt_transact::{NtTransactRequest, NtTransactSecondaryRequest};
use crate::transaction::{TransactionRequest, TransactionSecondaryRequest};

/// The logical content of a fully reassembled SMB_COM_TRANSACTION.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransPayload {
    pub setup: Vec<u16>,
    /// OEM transaction name, e.g. `\MAILSLOT\messenger`.
    pub name: NullString,
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

impl TransPayload {
    /// The sub-command id a request carries in its first setup word.
    pub fn sub_command(&self) -> Option<u16> {
        self.setup.first().copied()
    }
}

/// The logical content of a fully reassembled SMB_COM_NT_TRANSACT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NtTransPayload {
    pub function: u16,
    pub setup: Vec<u16>,
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

/// Upper bound on a declared section total accepted by reassembly.
const MAX_SECTION_TOTAL: usize = 1 << 24;

/// Accumulates one section (parameters or data) of a fragmented
/// transaction, keyed by displacement into the logical buffer.
#[derive(Debug, Clone)]
pub struct FragmentBuffer {
    section: &'static str,
    buffer: Vec<u8>,
    /// Sorted, disjoint ranges already filled.
    filled: Vec<Range<usize>>,
    received: usize,
}

impl FragmentBuffer {
    /// A total beyond [`MAX_SECTION_TOTAL`] is rejected before any
    /// allocation happens.
    pub fn new(section: &'static str, total: usize) -> Result<Self> {
        if total > MAX_SECTION_TOTAL {
            return Err(CodecError::Fragmentation(format!(
                "{section} declares {total} bytes, more than the \
                 {MAX_SECTION_TOTAL}-byte reassembly limit"
            )));
        }
        Ok(Self {
            section,
            buffer: vec![0; total],
            filled: Vec::new(),
            received: 0,
        })
    }

    pub fn total(&self) -> usize {
        self.buffer.len()
    }

    /// Places a fragment at its displacement. Overlapping an
    /// already-filled range, or reaching past the declared total, is a
    /// protocol error; nothing is truncated or overwritten.
    pub fn accept(&mut self, displacement: usize, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let end = displacement + bytes.len();
        if end > self.buffer.len() {
            return Err(CodecError::Fragmentation(format!(
                "{} fragment [{displacement}, {end}) exceeds the declared total of {}",
                self.section,
                self.buffer.len()
            )));
        }
        let insert_at = self.filled.partition_point(|r| r.start < displacement);
        let collides = self.filled[..insert_at]
            .last()
            .is_some_and(|prev| prev.end > displacement)
            || self.filled[insert_at..]
                .first()
                .is_some_and(|next| next.start < end);
        if collides {
            return Err(CodecError::Fragmentation(format!(
                "{} fragment [{displacement}, {end}) overlaps previously received bytes",
                self.section
            )));
        }
        self.buffer[displacement..end].copy_from_slice(bytes);
        self.filled.insert(insert_at, displacement..end);
        self.received += bytes.len();
        Ok(())
    }

    /// Complete once the received byte count equals the declared total.
    pub fn is_complete(&self) -> bool {
        self.received == self.buffer.len()
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.is_complete() {
            return Err(CodecError::Fragmentation(format!(
                "{} incomplete: received {} of {} bytes",
                self.section,
                self.received,
                self.buffer.len()
            )));
        }
        Ok(self.buffer)
    }
}

/// Request-side reassembly of an SMB_COM_TRANSACTION exchange.
#[derive(Debug, Clone)]
pub struct TransactionReassembly {
    setup: Vec<u16>,
    name: NullString,
    total_parameter_count: u16,
    total_data_count: u16,
    parameters: FragmentBuffer,
    data: FragmentBuffer,
}

impl TransactionReassembly {
    pub fn new(primary: &TransactionRequest) -> Result<Self> {
        let mut parameters =
            FragmentBuffer::new("Trans_Parameters", primary.total_parameter_count as usize)?;
        let mut data = FragmentBuffer::new("Trans_Data", primary.total_data_count as usize)?;
        // The primary's own slice always sits at the head of the
        // logical buffers.
        parameters.accept(0, &primary.parameters)?;
        data.accept(0, &primary.data)?;
        Ok(Self {
            setup: primary.setup.clone(),
            name: primary.name.clone(),
            total_parameter_count: primary.total_parameter_count,
            total_data_count: primary.total_data_count,
            parameters,
            data,
        })
    }

    pub fn add_secondary(&mut self, secondary: &TransactionSecondaryRequest) -> Result<()> {
        if secondary.total_parameter_count != self.total_parameter_count
            || secondary.total_data_count != self.total_data_count
        {
            return Err(CodecError::Fragmentation(format!(
                "secondary restates totals {}/{}, primary declared {}/{}",
                secondary.total_parameter_count,
                secondary.total_data_count,
                self.total_parameter_count,
                self.total_data_count
            )));
        }
        self.parameters.accept(
            secondary.parameter_displacement as usize,
            &secondary.parameters,
        )?;
        self.data
            .accept(secondary.data_displacement as usize, &secondary.data)
    }

    pub fn is_complete(&self) -> bool {
        self.parameters.is_complete() && self.data.is_complete()
    }

    pub fn finish(self) -> Result<TransPayload> {
        Ok(TransPayload {
            setup: self.setup,
            name: self.name,
            parameters: self.parameters.finish()?,
            data: self.data.finish()?,
        })
    }
}

/// Request-side reassembly of an SMB_COM_NT_TRANSACT exchange.
#[derive(Debug, Clone)]
pub struct NtTransactReassembly {
    function: u16,
    setup: Vec<u16>,
    total_parameter_count: u32,
    total_data_count: u32,
    parameters: FragmentBuffer,
    data: FragmentBuffer,
}

impl NtTransactReassembly {
    pub fn new(primary: &NtTransactRequest) -> Result<Self> {
        let mut parameters =
            FragmentBuffer::new("NT_Trans_Parameters", primary.total_parameter_count as usize)?;
        let mut data = FragmentBuffer::new("NT_Trans_Data", primary.total_data_count as usize)?;
        parameters.accept(0, &primary.parameters)?;
        data.accept(0, &primary.data)?;
        Ok(Self {
            function: primary.function,
            setup: primary.setup.clone(),
            total_parameter_count: primary.total_parameter_count,
            total_data_count: primary.total_data_count,
            parameters,
            data,
        })
    }

    pub fn add_secondary(&mut self, secondary: &NtTransactSecondaryRequest) -> Result<()> {
        if secondary.total_parameter_count != self.total_parameter_count
            || secondary.total_data_count != self.total_data_count
        {
            return Err(CodecError::Fragmentation(format!(
                "secondary restates totals {}/{}, primary declared {}/{}",
                secondary.total_parameter_count,
                secondary.total_data_count,
                self.total_parameter_count,
                self.total_data_count
            )));
        }
        self.parameters.accept(
            secondary.parameter_displacement as usize,
            &secondary.parameters,
        )?;
        self.data
            .accept(secondary.data_displacement as usize, &secondary.data)
    }

    pub fn is_complete(&self) -> bool {
        self.parameters.is_complete() && self.data.is_complete()
    }

    pub fn finish(self) -> Result<NtTransPayload> {
        Ok(NtTransPayload {
            function: self.function,
            setup: self.setup,
            parameters: self.parameters.finish()?,
            data: self.data.finish()?,
        })
    }
}

/// One frame's slice of the logical parameter/data buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentSlice {
    pub parameters: Range<usize>,
    pub data: Range<usize>,
}

/// Greedily partitions the logical buffers across frames: parameter
/// bytes first, then data, each frame filled up to its capacity. The
/// first slice belongs to the primary request.
pub fn plan_fragments(
    parameter_total: usize,
    data_total: usize,
    primary_capacity: usize,
    secondary_capacity: usize,
) -> Result<Vec<FragmentSlice>> {
    let mut slices = Vec::new();
    let (mut p, mut d) = (0, 0);
    loop {
        let capacity = if slices.is_empty() {
            primary_capacity
        } else {
            secondary_capacity
        };
        let take_p = capacity.min(parameter_total - p);
        let take_d = (capacity - take_p).min(data_total - d);
        if take_p == 0 && take_d == 0 && (p < parameter_total || d < data_total) {
            return Err(CodecError::Fragmentation(format!(
                "a maximum buffer of {capacity} payload bytes cannot make progress"
            )));
        }
        slices.push(FragmentSlice {
            parameters: p..p + take_p,
            data: d..d + take_d,
        });
        p += take_p;
        d += take_d;
        if p == parameter_total && d == data_total {
            return Ok(slices);
        }
    }
}

/// Composes a transaction data block: `prefix` (the name, for primary
/// TRANS requests), then the parameter and data regions, each 4-aligned
/// relative to the frame start. Returns the block bytes along with the
/// frame-relative offsets of both regions.
pub(crate) fn lay_out_sections(
    data_start: u64,
    prefix: &[u8],
    parameters: &[u8],
    data: &[u8],
) -> (Vec<u8>, usize, usize) {
    let mut bytes = Vec::from(prefix);

    let align = |pos: usize| (4 - pos % 4) % 4;
    let pad1 = align(data_start as usize + bytes.len());
    bytes.resize(bytes.len() + pad1, 0);
    let parameter_offset = data_start as usize + bytes.len();
    bytes.extend_from_slice(parameters);

    let pad2 = align(data_start as usize + bytes.len());
    bytes.resize(bytes.len() + pad2, 0);
    let data_offset = data_start as usize + bytes.len();
    bytes.extend_from_slice(data);

    (bytes, parameter_offset, data_offset)
}

/// Extracts one region from a transaction data block, honoring the
/// declared frame-relative offset. An offset/count pair that does not
/// fall inside the block is a format error naming `field`.
pub(crate) fn slice_section(
    block: &[u8],
    data_start: u64,
    offset: usize,
    count: usize,
    field: &'static str,
) -> Result<Vec<u8>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let rel = offset
        .checked_sub(data_start as usize)
        .ok_or_else(|| CodecError::format(field, "offset points before the data block"))?;
    if rel + count > block.len() {
        return Err(CodecError::format(
            field,
            format!(
                "offset {offset} with {count} bytes runs past the {}-byte data block",
                block.len()
            ),
        ));
    }
    Ok(block[rel..rel + count].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_buffer_out_of_order_completion() {
        let mut buf = FragmentBuffer::new("Trans_Data", 10).unwrap();
        buf.accept(6, &[7, 8, 9, 10]).unwrap();
        assert!(!buf.is_complete());
        buf.accept(0, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert!(buf.is_complete());
        assert_eq!(buf.finish().unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_fragment_buffer_rejects_overlap() {
        let mut buf = FragmentBuffer::new("Trans_Data", 10).unwrap();
        buf.accept(0, &[0; 6]).unwrap();
        let err = buf.accept(4, &[0; 4]).unwrap_err();
        assert!(matches!(err, CodecError::Fragmentation(_)));
    }

    #[test]
    fn test_fragment_buffer_rejects_excess() {
        let mut buf = FragmentBuffer::new("Trans_Parameters", 8).unwrap();
        let err = buf.accept(6, &[0; 4]).unwrap_err();
        assert!(matches!(err, CodecError::Fragmentation(_)));
    }

    #[test]
    fn test_fragment_buffer_incomplete_finish() {
        let mut buf = FragmentBuffer::new("Trans_Data", 4).unwrap();
        buf.accept(0, &[1, 2]).unwrap();
        assert!(matches!(
            buf.finish(),
            Err(CodecError::Fragmentation(_))
        ));
    }

    #[test]
    fn test_fragment_buffer_rejects_oversized_total() {
        assert!(matches!(
            FragmentBuffer::new("NT_Trans_Data", MAX_SECTION_TOTAL + 1),
            Err(CodecError::Fragmentation(_))
        ));
    }

    #[test]
    fn test_reassembly_rejects_oversized_declared_total() {
        // The primary's declared total never triggers an allocation of
        // that size.
        let primary = NtTransactRequest {
            total_data_count: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            NtTransactReassembly::new(&primary),
            Err(CodecError::Fragmentation(_))
        ));
    }

    #[test]
    fn test_plan_fragments_parameters_before_data() {
        let slices = plan_fragments(10, 20, 8, 12).unwrap();
        assert_eq!(
            slices,
            vec![
                FragmentSlice {
                    parameters: 0..8,
                    data: 0..0
                },
                FragmentSlice {
                    parameters: 8..10,
                    data: 0..10
                },
                FragmentSlice {
                    parameters: 10..10,
                    data: 10..20
                },
            ]
        );
    }

    #[test]
    fn test_plan_fragments_single_frame() {
        let slices = plan_fragments(4, 4, 100, 100).unwrap();
        assert_eq!(
            slices,
            vec![FragmentSlice {
                parameters: 0..4,
                data: 0..4
            }]
        );
    }

    #[test]
    fn test_plan_fragments_empty_transaction() {
        assert_eq!(plan_fragments(0, 0, 10, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_plan_fragments_zero_capacity() {
        assert!(matches!(
            plan_fragments(1, 0, 0, 0),
            Err(CodecError::Fragmentation(_))
        ));
    }

    #[test]
    fn test_lay_out_sections_round_trip() {
        // data_start 67: name of 5 bytes ends at 72, already aligned.
        let (bytes, poff, doff) = lay_out_sections(67, b"abcd\0", &[1, 2, 3], &[9, 9]);
        assert_eq!(poff, 72);
        assert_eq!(doff, 76);
        assert_eq!(
            slice_section(&bytes, 67, poff, 3, "ParameterOffset").unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(
            slice_section(&bytes, 67, doff, 2, "DataOffset").unwrap(),
            vec![9, 9]
        );
        assert!(slice_section(&bytes, 67, doff, 40, "DataOffset").is_err());
        assert!(slice_section(&bytes, 67, 10, 1, "ParameterOffset").is_err());
    }
}
