use chunk_codec::{CoverError, SegmentError};
use meta_store::FileType;

/// Engine failures, each carrying the stable wire code clients key on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no valid credential presented")]
    Unauthenticated,
    /// Covers both "no capability" and "no such session": the response shape
    /// must not reveal which, so unknown ids collapse into this variant.
    #[error("caller may not access this session")]
    Forbidden,
    #[error("append would leave a hole after line {current_last_synced_line}")]
    GapDetected { current_last_synced_line: u64 },
    #[error("file is {established}, request says {requested}")]
    FileTypeMismatch {
        established: FileType,
        requested: FileType,
    },
    #[error("invalid file name: {0}")]
    InvalidFileName(#[source] SegmentError),
    #[error("invalid external id: {0}")]
    InvalidExternalId(#[source] SegmentError),
    #[error("first_line must be at least 1")]
    InvalidFirstLine,
    #[error("lines must not be empty")]
    EmptyLines,
    #[error("line {line_number} exceeds the {max_bytes} byte line ceiling")]
    LineTooLong { line_number: u64, max_bytes: usize },
    #[error("chunk body of {bytes} bytes exceeds the {max_bytes} byte ceiling")]
    ChunkTooLarge { bytes: usize, max_bytes: usize },
    #[error("quota exceeded: {0}")]
    QuotaExceeded(QuotaKind),
    #[error("file {file_name:?} does not exist in this session")]
    UnknownFile { file_name: String },
    #[error("stored chunks are inconsistent with the watermark: {0}")]
    CorruptedState(#[from] CoverError),
    #[error("listing returned a non-chunk object {key:?}")]
    StrayObject { key: String },
    #[error(transparent)]
    Storage(#[from] blob_store::Error),
    #[error(transparent)]
    Database(#[from] meta_store::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    Sessions,
    Bytes,
}

impl std::fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sessions => f.write_str("max sessions per user"),
            Self::Bytes => f.write_str("max stored bytes per user"),
        }
    }
}

impl Error {
    /// The stable code written into error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::GapDetected { .. } => "gap_detected",
            Self::FileTypeMismatch { .. } => "file_type_mismatch",
            Self::InvalidFileName(_)
            | Self::InvalidExternalId(_)
            | Self::InvalidFirstLine
            | Self::EmptyLines => "invalid_request",
            Self::LineTooLong { .. } | Self::ChunkTooLarge { .. } => "payload_too_large",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::UnknownFile { .. } => "not_found",
            Self::CorruptedState(_) | Self::StrayObject { .. } => "corrupted_state",
            Self::Storage(_) => "storage_unavailable",
            Self::Database(_) => "database_unavailable",
        }
    }

    /// `gap_detected` responses carry the watermark so the client can reset
    /// its local pointer without a second round trip.
    pub fn current_last_synced_line(&self) -> Option<u64> {
        match self {
            Self::GapDetected {
                current_last_synced_line,
            } => Some(*current_last_synced_line),
            _ => None,
        }
    }

    /// Server-side faults are logged with operator alerts; caller faults are
    /// routine.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::CorruptedState(_) | Self::StrayObject { .. } | Self::Storage(_) | Self::Database(_)
        )
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
