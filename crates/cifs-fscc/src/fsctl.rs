//! FSCTL control codes and their structured payloads (MS-FSCC 2.3).

use binrw::prelude::*;

/// File system control codes, MS-FSCC 2.3.
#[binrw::binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[brw(repr(u32))]
pub enum FsctlCode {
    CreateOrGetObjectId = 0x900c0,
    DeleteObjectId = 0x900a0,
    FilesystemGetStatistics = 0x90060,
    GetCompression = 0x9003c,
    GetNtfsVolumeData = 0x90064,
    GetObjectId = 0x9009c,
    GetReparsePoint = 0x900a8,
    GetRetrievalPointers = 0x90073,
    IsPathnameValid = 0x9002c,
    PipePeek = 0x11400c,
    PipeTransceive = 0x11c017,
    PipeWait = 0x110018,
    QueryAllocatedRanges = 0x940cf,
    ReadFileUsnData = 0x900eb,
    RecallFile = 0x90117,
    SetCompression = 0x9c040,
    SetObjectId = 0x90098,
    SetReparsePoint = 0x900a4,
    SetSparse = 0x900c4,
    SetZeroData = 0x980c8,
    WriteUsnCloseRecord = 0x900ef,
}

/// FILE_ALLOCATED_RANGE_BUFFER, MS-FSCC 2.3.36.1.
#[binrw::binrw]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileAllocatedRangeBuffer {
    pub file_offset: i64,
    pub length: i64,
}

/// The FSCTL_QUERY_ALLOCATED_RANGES reply: as many 16-byte ranges as the
/// payload holds.
#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryAllocatedRangesReply {
    #[br(parse_with = binrw::helpers::until_eof)]
    pub ranges: Vec<FileAllocatedRangeBuffer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cifs_tests::*;

    test_binrw! {
        QueryAllocatedRangesReply: QueryAllocatedRangesReply {
            ranges: vec![
                FileAllocatedRangeBuffer {
                    file_offset: 0,
                    length: 0x10000,
                },
                FileAllocatedRangeBuffer {
                    file_offset: 0x20000,
                    length: 0x1000,
                },
            ],
        } => "0000000000000000 0000010000000000 0000020000000000 0010000000000000"
    }

    test_binrw! {
        QueryAllocatedRangesReply => empty: QueryAllocatedRangesReply::default() => ""
    }

    test_binrw! {
        FsctlCode: FsctlCode::QueryAllocatedRanges => "cf400900"
    }
}
