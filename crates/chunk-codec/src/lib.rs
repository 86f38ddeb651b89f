//! Codec for the chunk object naming scheme and JSONL chunk bodies.
//!
//! A chunk stores a contiguous, inclusive, 1-based line range `[first..last]`
//! of one sync file. On the wire (and in the object store) it is addressed as
//!
//! ```text
//! <user_id>/<external_id>/chunks/<file_name>/chunk_<first>_<last>.jsonl
//! ```
//!
//! with `first`/`last` zero-padded so lexical listing order matches numeric
//! order. Everything in this crate is pure; no I/O.

mod cover;
mod key;
mod lines;

pub use cover::{CoverError, ReadPlan, Segment, plan_read};
pub use key::{
    ChunkKey, ChunkRange, MAX_SEGMENT_LEN, NameError, SegmentError, file_prefix, session_prefix,
    validate_segment,
};
pub use lines::{encode_lines, lines, skip_lines};

/// Primary zero-pad width for line numbers in chunk names.
///
/// Seven digits covers any realistic transcript. Numbers that overflow it are
/// padded to [`WIDE_PAD_WIDTH`] instead; readers re-sort numerically after
/// parsing, so a file mixing both widths stays ordered.
pub const PAD_WIDTH: usize = 7;

/// Fallback zero-pad width for line numbers above `10^7 - 1`.
pub const WIDE_PAD_WIDTH: usize = 12;

pub type Result<T, E = NameError> = core::result::Result<T, E>;
