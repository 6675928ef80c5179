use thiserror::Error;

/// Errors specific to the cifs-fscc crate.
#[derive(Error, Debug)]
pub enum FsccError {
    /// The class is defined by MS-FSCC, but no file system implements it.
    /// Raised at construction time, so no half-built value is ever observed.
    #[error("Not supported: {0}")]
    NotSupported(&'static str),

    /// The class is valid but has no typed layout in this catalog.
    #[error("No layout for information class {0:#04x}")]
    UnsupportedClass(u8),

    /// Layout-level read/write failure.
    #[error("Failed parsing FSCC structure: {0}")]
    Parse(#[from] binrw::Error),
}

pub type Result<T> = std::result::Result<T, FsccError>;
