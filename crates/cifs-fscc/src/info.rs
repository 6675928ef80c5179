//! File information classes (MS-FSCC 2.4) used by the query/set commands.

use binrw::prelude::*;
use modular_bitfield::prelude::*;

use cifs_dtyp::prelude::*;

use crate::{FsccError, Result};

/// Information class identifiers, MS-FSCC 2.4.
#[binrw::binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[brw(repr(u8))]
pub enum FileInformationClass {
    FileDirectoryInformation = 0x01,
    FileFullDirectoryInformation = 0x02,
    FileBothDirectoryInformation = 0x03,
    FileBasicInformation = 0x04,
    FileStandardInformation = 0x05,
    FileInternalInformation = 0x06,
    FileEaInformation = 0x07,
    FileAccessInformation = 0x08,
    FileNameInformation = 0x09,
    FileRenameInformation = 0x0a,
    FileLinkInformation = 0x0b,
    FileNamesInformation = 0x0c,
    FileDispositionInformation = 0x0d,
    FilePositionInformation = 0x0e,
    FileFullEaInformation = 0x0f,
    FileModeInformation = 0x10,
    FileAlignmentInformation = 0x11,
    FileAllInformation = 0x12,
    FileAllocationInformation = 0x13,
    FileEndOfFileInformation = 0x14,
    FileAlternateNameInformation = 0x15,
    FileStreamInformation = 0x16,
    FilePipeInformation = 0x17,
    FilePipeLocalInformation = 0x18,
    FilePipeRemoteInformation = 0x19,
    FileMailslotQueryInformation = 0x1a,
    FileMailslotSetInformation = 0x1b,
    FileCompressionInformation = 0x1c,
    FileObjectIdInformation = 0x1d,
    FileMoveClusterInformation = 0x1f,
    FileQuotaInformation = 0x20,
    FileReparsePointInformation = 0x21,
    FileNetworkOpenInformation = 0x22,
    FileAttributeTagInformation = 0x23,
    FileTrackingInformation = 0x24,
    FileIdBothDirectoryInformation = 0x25,
    FileIdFullDirectoryInformation = 0x26,
    FileValidDataLengthInformation = 0x27,
    FileShortNameInformation = 0x28,
    FileSfioReserveInformation = 0x2c,
    FileSfioVolumeInformation = 0x2d,
    FileHardLinkInformation = 0x2e,
    FileNormalizedNameInformation = 0x30,
    FileIdGlobalTxDirectoryInformation = 0x32,
    FileStandardLinkInformation = 0x36,
    FileIdInformation = 0x3b,
}

/// MS-FSCC 2.6 file attribute flags.
#[bitfield]
#[derive(BinWrite, BinRead, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct FileAttributes {
    pub readonly: bool,
    pub hidden: bool,
    pub system: bool,
    #[skip]
    __: bool,

    pub directory: bool,
    pub archive: bool,
    pub device: bool,
    pub normal: bool,

    pub temporary: bool,
    pub sparse_file: bool,
    pub reparse_point: bool,
    pub compressed: bool,

    pub offline: bool,
    pub not_content_indexed: bool,
    pub encrypted: bool,
    pub integrity_stream: bool,

    #[skip]
    __: bool,
    pub no_scrub_data: bool,
    pub recall_on_open: bool,
    #[skip]
    __: B3,
    pub recall_on_data_access: bool,
    #[skip]
    __: B9,
}

/// FileBasicInformation, MS-FSCC 2.4.7.
#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBasicInformation {
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub file_attributes: FileAttributes,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved: u32,
}

/// FileStandardInformation, MS-FSCC 2.4.41.
#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStandardInformation {
    pub allocation_size: u64,
    pub end_of_file: u64,
    pub number_of_links: u32,
    pub delete_pending: Boolean,
    pub directory: Boolean,
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved: u16,
}

/// FileMailslotQueryInformation, MS-FSCC 2.4.21.
#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMailslotQueryInformation {
    pub maximum_message_size: u32,
    pub mailslot_quota: u32,
    pub next_message_size: u32,
    pub messages_available: u32,
    pub read_timeout: u64,
}

/// FileMailslotSetInformation, MS-FSCC 2.4.22.
#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMailslotSetInformation {
    pub read_timeout: u64,
}

/// FileSfioVolumeInformation, MS-FSCC 2.4.44.
///
/// Defined by the protocol, implemented by no file system. Construction
/// always fails, so callers can never hold a value of this class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSfioVolumeInformation {
    _unconstructable: (),
}

impl FileSfioVolumeInformation {
    pub fn new() -> Result<Self> {
        Err(FsccError::NotSupported(
            "no file system implements FileSfioVolumeInformation",
        ))
    }
}

/// A typed file information value, tagged by its class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileInformation {
    Basic(FileBasicInformation),
    Standard(FileStandardInformation),
    MailslotQuery(FileMailslotQueryInformation),
    MailslotSet(FileMailslotSetInformation),
}

macro_rules! file_information_classes {
    ($($variant:ident => $class:ident: $model:ty,)+) => {
        impl FileInformation {
            /// The information class tag of this value.
            pub fn class(&self) -> FileInformationClass {
                match self {
                    $(
                        FileInformation::$variant(_) => FileInformationClass::$class,
                    )+
                }
            }

            /// Interprets `bytes` as the layout of `class`.
            pub fn parse(class: FileInformationClass, bytes: &[u8]) -> Result<Self> {
                let mut cursor = std::io::Cursor::new(bytes);
                match class {
                    $(
                        FileInformationClass::$class => {
                            Ok(FileInformation::$variant(<$model>::read_le(&mut cursor)?))
                        }
                    )+
                    FileInformationClass::FileSfioVolumeInformation => {
                        FileSfioVolumeInformation::new()?;
                        unreachable!()
                    }
                    other => Err(FsccError::UnsupportedClass(other as u8)),
                }
            }

            /// Serializes the value to its wire layout.
            pub fn to_bytes(&self) -> Result<Vec<u8>> {
                let mut cursor = std::io::Cursor::new(Vec::new());
                match self {
                    $(
                        FileInformation::$variant(value) => value.write_le(&mut cursor)?,
                    )+
                }
                Ok(cursor.into_inner())
            }
        }

        $(
            impl From<$model> for FileInformation {
                fn from(value: $model) -> Self {
                    FileInformation::$variant(value)
                }
            }
        )+
    };
}

file_information_classes! {
    Basic => FileBasicInformation: FileBasicInformation,
    Standard => FileStandardInformation: FileStandardInformation,
    MailslotQuery => FileMailslotQueryInformation: FileMailslotQueryInformation,
    MailslotSet => FileMailslotSetInformation: FileMailslotSetInformation,
}
