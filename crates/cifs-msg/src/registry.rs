//! The process-wide dispatch table from command tuples to codecs.
//!
//! Built once from the static catalog, immutable afterwards, safe for
//! concurrent reads. Tests may construct their own registries.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::block::{DataBlock, ParameterBlock};
use crate::error::{CodecError, Result};
use crate::header::{Direction, SmbCommand};
use crate::packet::{CommandBody, CommandCodec};
use crate::transact::{NtTransPayload, TransPayload};

use crate::close::{CloseRequest, CloseResponse};
use crate::mailslot::{TransMailslotWriteRequest, TransMailslotWriteResponse};
use crate::nt_quota::{NtTransQueryQuotaRequest, NtTransQueryQuotaResponse};
use crate::nt_transact::{NtTransactRequest, NtTransactResponse, NtTransactSecondaryRequest};
use crate::read_andx::{ReadAndxRequest, ReadAndxResponse};
use crate::transaction::{TransactionRequest, TransactionResponse, TransactionSecondaryRequest};
use crate::write_andx::{WriteAndxRequest, WriteAndxResponse};

/// The exact tuple a codec is registered under. Frame-level codecs use
/// `sub_command: None`; transaction sub-command interpreters use the
/// sub-command id (TRANS setup word or NT_TRANSACT function).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandKey {
    pub command: SmbCommand,
    pub sub_command: Option<u16>,
    pub direction: Direction,
}

#[derive(Debug)]
enum DecodeFn {
    Frame(fn(&ParameterBlock, &DataBlock, u64) -> Result<CommandBody>),
    Trans(fn(&TransPayload) -> Result<CommandBody>),
    NtTrans(fn(&NtTransPayload) -> Result<CommandBody>),
}

/// An immutable catalog entry: how to decode the command, and whether
/// it may chain.
#[derive(Debug)]
pub struct CommandDescriptor {
    andx_capable: bool,
    decode: DecodeFn,
}

impl CommandDescriptor {
    pub fn andx_capable(&self) -> bool {
        self.andx_capable
    }

    pub(crate) fn decode_frame(
        &self,
        parameters: &ParameterBlock,
        data: &DataBlock,
        at: u64,
    ) -> Result<CommandBody> {
        match self.decode {
            DecodeFn::Frame(decode) => decode(parameters, data, at),
            _ => Err(CodecError::format(
                "Command",
                "sub-command codecs decode reassembled payloads, not frames",
            )),
        }
    }
}

/// Registers a frame-level codec, monomorphized into a plain fn.
pub fn frame<T>() -> (CommandKey, CommandDescriptor)
where
    T: CommandCodec + Into<CommandBody>,
{
    (
        CommandKey {
            command: T::COMMAND,
            sub_command: None,
            direction: T::DIRECTION,
        },
        CommandDescriptor {
            andx_capable: T::ANDX_CAPABLE,
            decode: DecodeFn::Frame(|parameters, data, at| {
                T::from_blocks(parameters, data, at).map(Into::into)
            }),
        },
    )
}

/// The contract of an SMB_COM_TRANSACTION sub-command interpretation.
pub trait TransCodec: Sized + Clone + std::fmt::Debug {
    const SUB_COMMAND: u16;
    const DIRECTION: Direction;

    fn from_payload(payload: &TransPayload) -> Result<Self>;
    fn to_payload(&self) -> Result<TransPayload>;
}

/// The contract of an SMB_COM_NT_TRANSACT function interpretation.
pub trait NtTransCodec: Sized + Clone + std::fmt::Debug {
    const FUNCTION: u16;
    const DIRECTION: Direction;

    fn from_payload(payload: &NtTransPayload) -> Result<Self>;
    fn to_payload(&self) -> Result<NtTransPayload>;
}

/// Registers a TRANS sub-command interpreter.
pub fn trans<T>() -> (CommandKey, CommandDescriptor)
where
    T: TransCodec + Into<CommandBody>,
{
    (
        CommandKey {
            command: SmbCommand::Transaction,
            sub_command: Some(T::SUB_COMMAND),
            direction: T::DIRECTION,
        },
        CommandDescriptor {
            andx_capable: false,
            decode: DecodeFn::Trans(|payload| T::from_payload(payload).map(Into::into)),
        },
    )
}

/// Registers an NT_TRANSACT function interpreter.
pub fn nt_trans<T>() -> (CommandKey, CommandDescriptor)
where
    T: NtTransCodec + Into<CommandBody>,
{
    (
        CommandKey {
            command: SmbCommand::NtTransact,
            sub_command: Some(T::FUNCTION),
            direction: T::DIRECTION,
        },
        CommandDescriptor {
            andx_capable: false,
            decode: DecodeFn::NtTrans(|payload| T::from_payload(payload).map(Into::into)),
        },
    )
}

/// The dispatch table. Lookup misses surface as `UnsupportedCommand`,
/// distinct from the construction-time `NotSupported` refusal.
pub struct Registry {
    entries: HashMap<CommandKey, CommandDescriptor>,
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(|| Registry::new(catalog()));

impl Registry {
    pub fn new(entries: impl IntoIterator<Item = (CommandKey, CommandDescriptor)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The process-wide registry over the full command catalog.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    pub fn lookup(
        &self,
        command: SmbCommand,
        sub_command: Option<u16>,
        direction: Direction,
    ) -> Result<&CommandDescriptor> {
        let key = CommandKey {
            command,
            sub_command,
            direction,
        };
        self.entries
            .get(&key)
            .ok_or(CodecError::UnsupportedCommand {
                command,
                sub_command,
                direction,
            })
    }

    /// Interprets a reassembled TRANS payload via its registered
    /// sub-command codec. Requests carry the sub-command in setup[0];
    /// responses do not repeat it, so the caller supplies it.
    pub fn interpret_trans(
        &self,
        sub_command: u16,
        direction: Direction,
        payload: &TransPayload,
    ) -> Result<CommandBody> {
        let descriptor = self.lookup(SmbCommand::Transaction, Some(sub_command), direction)?;
        match descriptor.decode {
            DecodeFn::Trans(decode) => decode(payload),
            _ => Err(CodecError::format(
                "Setup",
                "registered codec is not a TRANS sub-command interpreter",
            )),
        }
    }

    /// Interprets a reassembled NT_TRANSACT payload via its registered
    /// function codec.
    pub fn interpret_nt_trans(
        &self,
        function: u16,
        direction: Direction,
        payload: &NtTransPayload,
    ) -> Result<CommandBody> {
        let descriptor = self.lookup(SmbCommand::NtTransact, Some(function), direction)?;
        match descriptor.decode {
            DecodeFn::NtTrans(decode) => decode(payload),
            _ => Err(CodecError::format(
                "Function",
                "registered codec is not an NT_TRANSACT function interpreter",
            )),
        }
    }
}

/// The full command catalog, registered once at first use.
fn catalog() -> Vec<(CommandKey, CommandDescriptor)> {
    vec![
        frame::<ReadAndxRequest>(),
        frame::<ReadAndxResponse>(),
        frame::<WriteAndxRequest>(),
        frame::<WriteAndxResponse>(),
        frame::<CloseRequest>(),
        frame::<CloseResponse>(),
        frame::<TransactionRequest>(),
        frame::<TransactionSecondaryRequest>(),
        frame::<TransactionResponse>(),
        frame::<NtTransactRequest>(),
        frame::<NtTransactSecondaryRequest>(),
        frame::<NtTransactResponse>(),
        trans::<TransMailslotWriteRequest>(),
        trans::<TransMailslotWriteResponse>(),
        nt_trans::<NtTransQueryQuotaRequest>(),
        nt_trans::<NtTransQueryQuotaResponse>(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_miss_is_unsupported_command() {
        let err = Registry::global()
            .lookup(SmbCommand::Echo, None, Direction::Request)
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedCommand {
                command: SmbCommand::Echo,
                sub_command: None,
                direction: Direction::Request,
            }
        ));
    }

    #[test]
    fn test_custom_registry_shadows_catalog() {
        let registry = Registry::new([frame::<CloseRequest>()]);
        assert!(
            registry
                .lookup(SmbCommand::Close, None, Direction::Request)
                .is_ok()
        );
        assert!(
            registry
                .lookup(SmbCommand::ReadAndx, None, Direction::Request)
                .is_err()
        );
    }
}
