//! The packet lifecycle: the codec contract every concrete command
//! implements, the tagged body union, and the frame-level entry points.

use binrw::prelude::*;

use crate::andx;
use crate::block::{DataBlock, ParameterBlock};
use crate::error::{CodecError, Result};
use crate::header::{Direction, SmbCommand, SmbHeader};
use crate::registry::Registry;

use crate::close::{CloseRequest, CloseResponse};
use crate::mailslot::{TransMailslotWriteRequest, TransMailslotWriteResponse};
use crate::nt_quota::{NtTransQueryQuotaRequest, NtTransQueryQuotaResponse};
use crate::nt_transact::{NtTransactRequest, NtTransactResponse, NtTransactSecondaryRequest};
use crate::read_andx::{ReadAndxRequest, ReadAndxResponse};
use crate::transaction::{TransactionRequest, TransactionResponse, TransactionSecondaryRequest};
use crate::write_andx::{WriteAndxRequest, WriteAndxResponse};

/// The contract between the generic carrier blocks and a concrete
/// command's typed fields.
///
/// `at` is the frame-relative byte position of the command's parameter
/// block (its word-count byte); offset-bearing commands derive their
/// wire offsets from it. Codecs hold no state across calls: both
/// directions are pure transformations.
///
/// For AndX-capable commands the 4-byte link prefix is owned by the
/// chain walker and never appears in the blocks a codec sees.
pub trait CommandCodec: Sized + Clone + std::fmt::Debug {
    const COMMAND: SmbCommand;
    const DIRECTION: Direction;
    const ANDX_CAPABLE: bool = false;

    /// Interprets generic blocks into typed fields. Validates every
    /// declared length against the bytes present; fails with a format
    /// error naming the offending field.
    fn from_blocks(parameters: &ParameterBlock, data: &DataBlock, at: u64) -> Result<Self>;

    /// Lowers typed fields into generic blocks. Word/byte counts and
    /// offsets are computed from the actually-serialized content, never
    /// trusted from caller state.
    fn to_blocks(&self, at: u64) -> Result<(ParameterBlock, DataBlock)>;
}

macro_rules! command_bodies {
    (
        frame: { $($fv:ident: $fm:ty,)+ }
        trans: { $($tv:ident: $tm:ty,)+ }
        nt_trans: { $($nv:ident: $nm:ty,)+ }
    ) => {
        /// One decoded command body, tagged by kind. Frame-level bodies
        /// occupy chain slots; transaction sub-command bodies are the
        /// interpretation of a reassembled transaction.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum CommandBody {
            $($fv($fm),)+
            $($tv($tm),)+
            $($nv($nm),)+
        }

        impl CommandBody {
            /// The top-level command id this body belongs to.
            pub fn command(&self) -> SmbCommand {
                match self {
                    $(Self::$fv(_) => <$fm as CommandCodec>::COMMAND,)+
                    $(Self::$tv(_) => SmbCommand::Transaction,)+
                    $(Self::$nv(_) => SmbCommand::NtTransact,)+
                }
            }

            /// Whether this body may carry a link to a following command.
            pub fn andx_capable(&self) -> bool {
                match self {
                    $(Self::$fv(_) => <$fm as CommandCodec>::ANDX_CAPABLE,)+
                    _ => false,
                }
            }

            pub(crate) fn to_blocks(&self, at: u64) -> Result<(ParameterBlock, DataBlock)> {
                match self {
                    $(Self::$fv(body) => body.to_blocks(at),)+
                    _ => Err(CodecError::format(
                        "Command",
                        "transaction sub-command bodies are carried inside a transaction frame",
                    )),
                }
            }
        }

        $(
            impl From<$fm> for CommandBody {
                fn from(value: $fm) -> Self {
                    Self::$fv(value)
                }
            }
        )+
        $(
            impl From<$tm> for CommandBody {
                fn from(value: $tm) -> Self {
                    Self::$tv(value)
                }
            }
        )+
        $(
            impl From<$nm> for CommandBody {
                fn from(value: $nm) -> Self {
                    Self::$nv(value)
                }
            }
        )+
    };
}

command_bodies! {
    frame: {
        ReadAndxRequest: ReadAndxRequest,
        ReadAndxResponse: ReadAndxResponse,
        WriteAndxRequest: WriteAndxRequest,
        WriteAndxResponse: WriteAndxResponse,
        CloseRequest: CloseRequest,
        CloseResponse: CloseResponse,
        TransactionRequest: TransactionRequest,
        TransactionSecondaryRequest: TransactionSecondaryRequest,
        TransactionResponse: TransactionResponse,
        NtTransactRequest: NtTransactRequest,
        NtTransactSecondaryRequest: NtTransactSecondaryRequest,
        NtTransactResponse: NtTransactResponse,
    }
    trans: {
        TransMailslotWriteRequest: TransMailslotWriteRequest,
        TransMailslotWriteResponse: TransMailslotWriteResponse,
    }
    nt_trans: {
        NtTransQueryQuotaRequest: NtTransQueryQuotaRequest,
        NtTransQueryQuotaResponse: NtTransQueryQuotaResponse,
    }
}

/// One physical frame: a header plus the ordered commands it carries.
/// A single-command frame is the common case; AndX chaining batches
/// more. Consumers never see raw link offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbFrame {
    pub header: SmbHeader,
    pub commands: Vec<CommandBody>,
}

impl SmbFrame {
    /// A frame carrying a single command; the header command id follows
    /// the body.
    pub fn new(header: SmbHeader, body: impl Into<CommandBody>) -> Self {
        let body = body.into();
        let header = SmbHeader {
            command: body.command(),
            ..header
        };
        Self {
            header,
            commands: vec![body],
        }
    }

    /// Appends a chained command. The previous command must be
    /// AndX-capable for the resulting frame to encode.
    pub fn chain(mut self, body: impl Into<CommandBody>) -> Self {
        self.commands.push(body.into());
        self
    }

    /// Decodes a frame against the process-wide command catalog.
    pub fn decode(buffer: &[u8]) -> Result<Self> {
        Self::decode_with(buffer, Registry::global())
    }

    /// Decodes a frame against an explicit registry.
    pub fn decode_with(buffer: &[u8], registry: &Registry) -> Result<Self> {
        let mut cursor = std::io::Cursor::new(buffer);
        let header = SmbHeader::read(&mut cursor)?;
        let commands = andx::decode_chain(buffer, &header, registry)?;
        Ok(Self { header, commands })
    }

    /// Encodes the frame, deriving the header command id and every AndX
    /// link from the commands actually serialized.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let first = self.commands.first().ok_or_else(|| {
            CodecError::ChainIntegrity("a frame must carry at least one command".into())
        })?;
        let header = SmbHeader {
            command: first.command(),
            ..self.header.clone()
        };
        andx::encode_chain(&header, &self.commands)
    }
}

impl TryFrom<&[u8]> for SmbFrame {
    type Error = CodecError;

    fn try_from(value: &[u8]) -> Result<Self> {
        Self::decode(value)
    }
}

impl TryFrom<&SmbFrame> for Vec<u8> {
    type Error = CodecError;

    fn try_from(value: &SmbFrame) -> Result<Self> {
        value.encode()
    }
}
