use crate::artifacts::objects::object_id::ObjectId;
use std::io;
use thiserror::Error;

/// Failures raised while reading pack indexes and pack object records.
///
/// Only structural problems are errors. An object that is simply absent is
/// reported as `None` by the lookup APIs instead.
#[derive(Error, Debug)]
pub enum PackError {
    /// Wrong magic bytes or a layout the reader does not understand
    #[error("invalid pack format: {0}")]
    Format(String),

    #[error("unsupported pack or index version {0}")]
    UnsupportedVersion(u32),

    /// Delta cycles, out-of-bounds copies, truncated records
    #[error("corrupt pack: {0}")]
    Corrupt(String),

    /// A hash delta whose base object is in none of the known packs
    #[error("delta base {0} not found")]
    MissingBase(ObjectId),

    #[error("failed to inflate object at offset {offset}: {source}")]
    Decompression {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PackError {
    pub fn corrupt(message: impl Into<String>) -> Self {
        PackError::Corrupt(message.into())
    }

    /// Whether the failure is confined to a single object.
    ///
    /// Per-object failures are skipped by callers; everything else aborts the
    /// pack they were raised for.
    pub fn is_object_local(&self) -> bool {
        matches!(
            self,
            PackError::Corrupt(_) | PackError::MissingBase(_) | PackError::Decompression { .. }
        )
    }
}

pub type PackResult<T> = Result<T, PackError>;
