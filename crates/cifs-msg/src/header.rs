//! The fixed 32-byte SMB header, shared by every command in a frame.

use binrw::prelude::*;
use modular_bitfield::prelude::*;

/// Generates the MS-CIFS command id table along with a fallible
/// conversion from raw id bytes (used when following AndX links).
macro_rules! smb_commands {
    ($($name:ident = $value:literal,)+) => {
        #[binrw::binrw]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[brw(repr(u8))]
        pub enum SmbCommand {
            $($name = $value,)+
        }

        impl SmbCommand {
            /// Resolves a raw command byte, `None` for ids MS-CIFS does
            /// not define.
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($value => Some(Self::$name),)+
                    _ => None,
                }
            }
        }
    };
}

smb_commands! {
    CreateDirectory = 0x00,
    DeleteDirectory = 0x01,
    Open = 0x02,
    Create = 0x03,
    Close = 0x04,
    Flush = 0x05,
    Delete = 0x06,
    Rename = 0x07,
    QueryInformation = 0x08,
    SetInformation = 0x09,
    Read = 0x0a,
    Write = 0x0b,
    LockByteRange = 0x0c,
    UnlockByteRange = 0x0d,
    CreateTemporary = 0x0e,
    CreateNew = 0x0f,
    CheckDirectory = 0x10,
    ProcessExit = 0x11,
    Seek = 0x12,
    LockAndRead = 0x13,
    WriteAndUnlock = 0x14,
    ReadRaw = 0x1a,
    ReadMpx = 0x1b,
    ReadMpxSecondary = 0x1c,
    WriteRaw = 0x1d,
    WriteMpx = 0x1e,
    WriteMpxSecondary = 0x1f,
    WriteComplete = 0x20,
    QueryServer = 0x21,
    SetInformation2 = 0x22,
    QueryInformation2 = 0x23,
    LockingAndx = 0x24,
    Transaction = 0x25,
    TransactionSecondary = 0x26,
    Ioctl = 0x27,
    IoctlSecondary = 0x28,
    Copy = 0x29,
    Move = 0x2a,
    Echo = 0x2b,
    WriteAndClose = 0x2c,
    OpenAndx = 0x2d,
    ReadAndx = 0x2e,
    WriteAndx = 0x2f,
    NewFileSize = 0x30,
    CloseAndTreeDisc = 0x31,
    Transaction2 = 0x32,
    Transaction2Secondary = 0x33,
    FindClose2 = 0x34,
    FindNotifyClose = 0x35,
    TreeConnect = 0x70,
    TreeDisconnect = 0x71,
    Negotiate = 0x72,
    SessionSetupAndx = 0x73,
    LogoffAndx = 0x74,
    TreeConnectAndx = 0x75,
    QueryInformationDisk = 0x80,
    Search = 0x81,
    Find = 0x82,
    FindUnique = 0x83,
    FindClose = 0x84,
    NtTransact = 0xa0,
    NtTransactSecondary = 0xa1,
    NtCreateAndx = 0xa2,
    NtCancel = 0xa4,
    NtRename = 0xa5,
    OpenPrintFile = 0xc0,
    WritePrintFile = 0xc1,
    ClosePrintFile = 0xc2,
    GetPrintQueue = 0xc3,
    ReadBulk = 0xd8,
    WriteBulk = 0xd9,
    WriteBulkData = 0xda,
    NoAndxCommand = 0xff,
}

/// Whether a packet travels client-to-server or back. Derived from the
/// header's reply flag; part of every registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Request,
    Response,
}

#[bitfield]
#[derive(BinWrite, BinRead, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct HeaderFlags {
    pub lock_and_read_ok: bool,
    pub buf_avail: bool,
    #[skip]
    __: bool,
    pub case_insensitive: bool,
    pub canonicalized_paths: bool,
    pub oplock: bool,
    pub oplock_batch: bool,
    pub reply: bool,
}

#[bitfield]
#[derive(BinWrite, BinRead, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct HeaderFlags2 {
    pub long_names_allowed: bool,
    pub eas: bool,
    pub security_signature: bool,
    pub compressed: bool,

    pub security_signature_required: bool,
    #[skip]
    __: bool,
    pub is_long_name: bool,
    #[skip]
    __: B3,

    pub reparse_path: bool,
    pub extended_security: bool,
    pub dfs: bool,
    pub paging_io: bool,

    pub nt_status: bool,
    pub unicode: bool,
}

/// The fixed frame header. Chained (AndX) commands share one physical
/// header; the status field is carried uninterpreted.
#[binrw::binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[brw(little, magic(b"\xffSMB"))]
pub struct SmbHeader {
    pub command: SmbCommand,
    pub status: u32,
    pub flags: HeaderFlags,
    pub flags2: HeaderFlags2,
    pub pid_high: u16,
    pub security_features: [u8; 8],
    #[bw(calc = 0)]
    #[br(temp)]
    _reserved: u16,
    pub tid: u16,
    pub pid_low: u16,
    pub uid: u16,
    pub mid: u16,
}

impl SmbHeader {
    /// Serialized byte length, including the 4-byte magic.
    pub const STRUCT_SIZE: usize = 32;

    pub fn new(command: SmbCommand) -> Self {
        Self {
            command,
            status: 0,
            flags: HeaderFlags::new()
                .with_case_insensitive(true)
                .with_canonicalized_paths(true),
            flags2: HeaderFlags2::new()
                .with_long_names_allowed(true)
                .with_is_long_name(true)
                .with_nt_status(true),
            pid_high: 0,
            security_features: [0; 8],
            tid: 0,
            pid_low: 0,
            uid: 0,
            mid: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.flags.reply() {
            Direction::Response
        } else {
            Direction::Request
        }
    }

    /// Flips the header into a reply to itself.
    pub fn into_response(mut self) -> Self {
        self.flags.set_reply(true);
        self
    }
}

impl Default for SmbHeader {
    fn default() -> Self {
        Self::new(SmbCommand::NoAndxCommand)
    }
}
