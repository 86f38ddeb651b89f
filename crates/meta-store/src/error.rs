#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("api key {name:?} already exists for this user")]
    DuplicateKeyName { name: String },
    #[error("share token already exists")]
    DuplicateShareToken,
}

impl Error {
    /// Whether the underlying failure is worth a client retry (connection
    /// loss, pool timeout) rather than a definite negative answer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Sqlx(sqlx::Error::Io(_))
                | Self::Sqlx(sqlx::Error::PoolTimedOut)
                | Self::Sqlx(sqlx::Error::PoolClosed)
        )
    }

    pub(crate) fn is_unique_violation(&self, constraint: &str) -> bool {
        match self {
            Self::Sqlx(sqlx::Error::Database(db)) => {
                db.is_unique_violation() && db.constraint() == Some(constraint)
            }
            _ => false,
        }
    }
}
