//! Quota entries (MS-FSCC 2.4.33), chained by next-entry offsets.

use std::io::SeekFrom;

use binrw::prelude::*;

use cifs_dtyp::prelude::*;

/// Next-entry offsets are aligned to 4 bytes, relative to the start of the
/// current entry. The last entry carries an offset of zero.
const QUOTA_ENTRY_ALIGN: u32 = 4;

/// A single FILE_QUOTA_INFORMATION entry.
#[binrw::binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[bw(import(last: bool))]
#[allow(clippy::manual_non_exhaustive)]
pub struct FileQuotaInformation {
    #[br(assert(next_entry_offset.value % QUOTA_ENTRY_ALIGN == 0))]
    #[bw(calc = PosMarker::default())]
    #[br(temp)]
    next_entry_offset: PosMarker<u32>,
    #[bw(try_calc = sid.len().try_into())]
    #[br(temp)]
    sid_length: u32,
    pub change_time: FileTime,
    pub quota_used: i64,
    pub quota_threshold: i64,
    pub quota_limit: i64,
    /// Raw SID bytes identifying the account the quota applies to.
    #[br(count = sid_length)]
    pub sid: Vec<u8>,

    #[br(seek_before = next_entry_offset.seek_relative(false))] // 0 leaves the stream unmoved: last entry.
    #[bw(if(!last))]
    #[bw(align_before = QUOTA_ENTRY_ALIGN)]
    #[bw(write_with = PosMarker::write_roff, args(&next_entry_offset))]
    _next: (),
}

impl FileQuotaInformation {
    pub fn new(
        change_time: FileTime,
        quota_used: i64,
        quota_threshold: i64,
        quota_limit: i64,
        sid: Vec<u8>,
    ) -> Self {
        Self {
            change_time,
            quota_used,
            quota_threshold,
            quota_limit,
            sid,
            _next: (),
        }
    }
}

/// A chained sequence of quota entries, as carried in quota query/set
/// payloads. Supports empty payloads (zero entries).
#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaList {
    #[br(parse_with = read_quota_entries)]
    #[bw(write_with = write_quota_entries)]
    entries: Vec<FileQuotaInformation>,
}

impl QuotaList {
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FileQuotaInformation> {
        self.entries.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl From<Vec<FileQuotaInformation>> for QuotaList {
    fn from(entries: Vec<FileQuotaInformation>) -> Self {
        Self { entries }
    }
}

impl From<QuotaList> for Vec<FileQuotaInformation> {
    fn from(list: QuotaList) -> Self {
        list.entries
    }
}

#[binrw::parser(reader, endian)]
fn read_quota_entries() -> BinResult<Vec<FileQuotaInformation>> {
    let stream_end = {
        let current = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(current))?;
        end
    };
    if reader.stream_position()? == stream_end {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    loop {
        let position_before = reader.stream_position()?;
        let entry = FileQuotaInformation::read_options(reader, endian, ())?;
        entries.push(entry);

        // A zero next-entry offset leaves the stream where the entry
        // started; that is the termination signal.
        if reader.stream_position()? == position_before {
            break;
        }
    }
    Ok(entries)
}

#[binrw::writer(writer, endian)]
#[allow(clippy::ptr_arg)] // writer accepts exact type.
fn write_quota_entries(entries: &Vec<FileQuotaInformation>) -> BinResult<()> {
    for (i, entry) in entries.iter().enumerate() {
        entry.write_options(writer, endian, (i == entries.len() - 1,))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cifs_tests::*;

    // S-1-5-32-544, the builtin administrators group.
    const ADMIN_SID: [u8; 16] = [
        0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x20, 0x00, 0x00, 0x00, 0x20, 0x02, 0x00,
        0x00,
    ];

    fn sample_entry(used: i64) -> FileQuotaInformation {
        FileQuotaInformation::new(FileTime::ZERO, used, 0x8000, 0x10000, ADMIN_SID.to_vec())
    }

    test_binrw! {
        QuotaList => single: QuotaList::from(vec![sample_entry(0x2000)]) =>
            "00000000 10000000 0000000000000000 0020000000000000 0080000000000000 0000010000000000 01020000000000052000000020020000"
    }

    test_binrw! {
        QuotaList => empty: QuotaList::default() => ""
    }

    #[test]
    fn test_quota_list_two_entries_round_trip() {
        let list = QuotaList::from(vec![sample_entry(0x1000), sample_entry(0x3000)]);
        let mut cursor = binrw::io::Cursor::new(Vec::new());
        list.write_le(&mut cursor).unwrap();
        let bytes = cursor.into_inner();

        // First entry: 40 bytes of fixed fields + 16 SID bytes, already
        // 4-aligned, so the next entry starts at 56.
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 56);
        assert_eq!(bytes.len(), 112);

        let read = QuotaList::read_le(&mut binrw::io::Cursor::new(&bytes)).unwrap();
        assert_eq!(read, list);
    }
}
