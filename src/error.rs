use std::path::PathBuf;

use thiserror::Error;

/// A single entry's failure inside an aggregate (`extract_all` / `convert_sng`) operation.
#[derive(Debug, Error)]
#[error("{name}: {source}")]
pub struct EntryFailure {
    pub name: String,
    #[source]
    pub source: Error,
}

/// The full error taxonomy for this crate. Every failure maps to exactly one variant.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open archive at {path:?}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a PSARC archive (bad magic)")]
    InvalidMagic,

    #[error("unsupported PSARC version {major}.{minor}, only 1.4 is supported")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("TOC is shorter than its declared size")]
    TruncatedToc,

    #[error("invalid TOC entry size {0}: must be >= 20, even, and imply a 1..8 byte field width")]
    InvalidTocEntrySize(u32),

    #[error("chunk index out of range while assembling an entry")]
    ChunkIndexOutOfRange,

    #[error("short read while assembling an entry")]
    ShortRead,

    #[error("cryptographic operation failed during {stage}")]
    CryptoFailure { stage: &'static str },

    #[error("decompression failed and no raw fallback applies")]
    DecompressionFailure,

    #[error("read past end of buffer at offset {offset}: need {need} bytes, {available} available")]
    ReadPastEnd {
        offset: usize,
        need: usize,
        available: usize,
    },

    #[error("{remaining} trailing byte(s) left after a complete SNG parse")]
    TrailingBytes { remaining: usize },

    #[error("failed to write {path:?}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} entries failed", failures.len())]
    PartialExtraction { failures: Vec<EntryFailure> },

    #[error("audio conversion is not supported by this converter")]
    AudioConversionNotSupported,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
