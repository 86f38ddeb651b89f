use aws_sdk_s3::error::SdkError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object {key:?} does not exist")]
    NotFound { key: String },
    #[error("{operation} failed")]
    Service {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("error reading object body")]
    Body {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub(crate) fn service<E, R>(operation: &'static str, error: SdkError<E, R>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
        R: std::fmt::Debug + Send + Sync + 'static,
    {
        Self::Service {
            operation,
            source: Box::new(error),
        }
    }

    pub(crate) fn body(
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Body {
            source: Box::new(source),
        }
    }

    /// Transient failures a caller can retry; a missing object is not one.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }
}
