//! Windows Data Types (MS-DTYP) shared by the CIFS wire crates.

pub mod boolean;
pub mod file_time;
pub mod pos_marker;

pub mod prelude {
    pub use super::boolean::Boolean;
    pub use super::file_time::{FileTime, Utime};
    pub use super::pos_marker::PosMarker;
}

pub use prelude::*;
