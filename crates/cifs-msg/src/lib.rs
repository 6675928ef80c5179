//! CIFS/SMB1 message codecs for conformance testing: byte-exact
//! decoding and encoding of frames, AndX command chains and fragmented
//! transaction exchanges.

pub mod andx;
pub mod block;
pub mod error;
pub mod header;
pub mod packet;
pub mod registry;
pub mod transact;

pub mod close;
pub mod mailslot;
pub mod nt_quota;
pub mod nt_transact;
pub mod read_andx;
pub mod transaction;
pub mod write_andx;

pub use error::{CodecError, Result};
pub use header::{Direction, SmbCommand, SmbHeader};
pub use packet::{CommandBody, CommandCodec, SmbFrame};
pub use registry::{NtTransCodec, Registry, TransCodec};
pub use transact::{
    NtTransPayload, NtTransactReassembly, TransPayload, TransactionReassembly,
};
