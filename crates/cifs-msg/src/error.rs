//! Error taxonomy of the codec layer.
//!
//! Every failure is local to one decode/encode/construct call; the codec
//! never logs, retries, or coerces malformed input.

use thiserror::Error;

use crate::header::{Direction, SmbCommand};

#[derive(Error, Debug)]
pub enum CodecError {
    /// A declared length/offset field is inconsistent with the bytes
    /// actually present. Names the offending wire field.
    #[error("Invalid {field}: {reason}")]
    Format { field: &'static str, reason: String },

    /// Layout-level read/write failure: bad magic, undefined command
    /// byte, truncated buffer.
    #[error("Failed parsing message: {0}")]
    Parse(#[from] binrw::Error),

    /// No codec is registered for the resolved command tuple.
    #[error("No codec registered for {command:?} (sub-command {sub_command:?}, {direction:?})")]
    UnsupportedCommand {
        command: SmbCommand,
        sub_command: Option<u16>,
        direction: Direction,
    },

    /// The command is defined by the protocol but not implementable by
    /// the abstraction being modeled. Raised at construction time.
    #[error("Not supported: {0}")]
    NotSupported(&'static str),

    /// An AndX link is out of bounds, backward, or revisits a command.
    #[error("Broken command chain: {0}")]
    ChainIntegrity(String),

    /// A transaction fragment overlaps received bytes or exceeds the
    /// declared totals.
    #[error("Broken transaction: {0}")]
    Fragmentation(String),
}

impl CodecError {
    pub(crate) fn format(field: &'static str, reason: impl Into<String>) -> Self {
        CodecError::Format {
            field,
            reason: reason.into(),
        }
    }
}

impl From<cifs_fscc::FsccError> for CodecError {
    fn from(value: cifs_fscc::FsccError) -> Self {
        match value {
            cifs_fscc::FsccError::NotSupported(what) => CodecError::NotSupported(what),
            cifs_fscc::FsccError::UnsupportedClass(class) => CodecError::Format {
                field: "InformationClass",
                reason: format!("no layout for class {class:#04x}"),
            },
            cifs_fscc::FsccError::Parse(e) => CodecError::Parse(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
