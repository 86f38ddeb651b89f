use std::fmt;
use std::str::FromStr;

use time::OffsetDateTime;
use uuid::Uuid;

/// The two kinds of append-only files a session carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Transcript,
    Agent,
}

impl FileType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown file type {0:?}")]
pub struct ParseFileTypeError(String);

impl FromStr for FileType {
    type Err = ParseFileTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transcript" => Ok(Self::Transcript),
            "agent" => Ok(Self::Agent),
            other => Err(ParseFileTypeError(other.to_owned())),
        }
    }
}

// Stored as TEXT; the schema CHECK constraint keeps the column honest.
impl sqlx::Type<sqlx::Postgres> for FileType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for FileType {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for FileType {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub bytes_used: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub owner_user_id: i64,
    pub external_id: String,
    pub transcript_path: String,
    pub cwd: String,
    pub git_info: Option<serde_json::Value>,
    pub hostname: Option<String>,
    pub first_seen: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncFileRow {
    pub session_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub last_synced_line: i64,
    pub bytes_used: i64,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKeyRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub revoked: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShareRow {
    pub id: i64,
    pub session_id: Uuid,
    pub token: Option<String>,
    pub recipient_email: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
}

/// One claimed unit of analytics work.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalyticsClaim {
    pub session_id: Uuid,
    pub computed_line_count: i64,
    pub attempts: i32,
}

/// Full analytics state for one session, as the dashboard reads it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalyticsRow {
    pub session_id: Uuid,
    pub status: String,
    pub computed_line_count: i64,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub line_count: i64,
    pub message_count: i64,
    pub tool_use_count: i64,
    pub tool_counts: Option<serde_json::Value>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub duration_seconds: f64,
    pub model: Option<String>,
    pub computed_at: Option<OffsetDateTime>,
}

/// Derived metrics written back after a successful recomputation.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SessionMetrics {
    pub line_count: i64,
    pub message_count: i64,
    pub tool_use_count: i64,
    pub tool_counts: serde_json::Value,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub duration_seconds: f64,
    pub model: Option<String>,
}
