//! Error types shared across the projection engine.

use thiserror::Error;

/// Result type for tunefs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between a virtual path and the bytes
/// behind it.
#[derive(Error, Debug)]
pub enum Error {
    /// Virtual path (or one of its segments) does not exist in the tree.
    #[error("path not found")]
    NotFound,

    /// Directory operation applied to a file path.
    #[error("not a directory")]
    NotADirectory,

    /// File operation applied to a directory path.
    #[error("not a file")]
    NotAFile,

    /// Tag header bytes did not parse as a supported container.
    #[error("tag decode failed: {0}")]
    TagDecode(String),

    /// More than one comment, cue-sheet or seek-table block in a header.
    #[error("duplicate {0} block")]
    DuplicateBlock(&'static str),

    /// No stream-info block found in the header chain.
    #[error("stream info block not found")]
    MissingStreamInfo,

    /// Re-encoded header cannot fit the extent reserved in the real file.
    #[error("encoded header needs {needed} bytes but only {available} are reserved")]
    HeaderTooLarge { needed: usize, available: usize },

    /// Write landed at or past the header/payload boundary.
    #[error("write at offset {offset} is past the writable header boundary {boundary}")]
    ReadOnlyRegion { offset: u64, boundary: u64 },

    /// Filesystem mutation outside this layer's contract. Permanent,
    /// never retried.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// Path template names a field that does not exist.
    #[error("unknown template placeholder `{0}`")]
    UnknownPlaceholder(String),

    /// Template level resolved to an empty path segment.
    #[error("template level {0} resolved to an empty segment")]
    EmptySegment(usize),

    /// File handle not present in the open table.
    #[error("stale file handle {0}")]
    StaleHandle(u64),

    /// Item id present in the tree but missing from the store.
    #[error("item {0} missing from the collection store")]
    MissingItem(u64),

    /// IO error from the real file underneath a virtual one.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading error.
    #[error("config error: {0}")]
    Config(#[from] ::config::ConfigError),
}
