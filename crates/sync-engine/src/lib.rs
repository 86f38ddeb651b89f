//! The incremental sync core: `init`, `append_chunk`, `read_file` and
//! `delete_session`, plus the access resolver that gates all four.
//!
//! Invariants this crate owns, for every `(session, file)`:
//!
//! - the watermark (`last_synced_line`) never decreases;
//! - the stored chunks contiguously cover `[1..=watermark]`;
//! - replaying any accepted append is a no-op with the same response;
//! - concurrent appends serialize on the watermark row lock, so the loser
//!   of a race becomes a no-op, a trim or a gap error, never a hole.

mod access;
mod append;
mod delete;
mod engine;
mod error;
mod init;
mod principal;
mod read;
pub mod retry;

pub use access::Need;
pub use append::{AppendPlan, AppendRequest, AppendResponse, plan_append};
pub use engine::{EngineConfig, SyncEngine};
pub use error::{Error, QuotaKind, Result};
pub use init::{InitOutcome, InitRequest};
pub use principal::Principal;
pub use read::{FileRead, ReadRequest};
