//! File System Control Codes (MS-FSCC) structures:
//! file information classes, quota entries and FSCTL payloads.

pub mod error;
pub mod fsctl;
pub mod info;
pub mod quota;

pub use error::*;
pub use fsctl::*;
pub use info::*;
pub use quota::*;
