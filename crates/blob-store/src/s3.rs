use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use bytes::Bytes;

use crate::{ByteStream, Error, Result};

/// Batch ceiling for one `DeleteObjects` call, per the S3 API.
const DELETE_BATCH: usize = 1000;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2). `None` uses the
    /// regular AWS endpoint resolution.
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Path-style addressing, required by most self-hosted stores.
    pub force_path_style: bool,
}

impl S3Config {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            endpoint: None,
            region: None,
            force_path_style: false,
        }
    }

    /// Builds a client from this config on top of the ambient AWS
    /// environment (credentials, default region).
    pub async fn connect(self) -> S3Store {
        let base = aws_config::load_from_env().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&base);

        if let Some(endpoint) = self.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(self.force_path_style);
        }

        if let Some(region) = self.region {
            builder = builder.region(Region::new(region));
        }

        S3Store {
            client: Client::from_conf(builder.build()),
            bucket: self.bucket,
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    #[inline]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait::async_trait]
impl crate::BlobStore for S3Store {
    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(body))
            .send()
            .await
            .map_err(|error| Error::service("PutObject", error))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<ByteStream> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(SdkError::ServiceError(service)) if service.err().is_no_such_key() => {
                return Err(Error::NotFound {
                    key: key.to_owned(),
                });
            }
            Err(error) => return Err(Error::service("GetObject", error)),
        };

        let stream = futures::stream::try_unfold(output.body, |mut body| async move {
            match body.next().await {
                Some(Ok(bytes)) => Ok(Some((bytes, body))),
                Some(Err(error)) => Err(Error::body(error)),
                None => Ok(None),
            }
        });

        Ok(Box::pin(stream))
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = token.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|error| Error::service("ListObjectsV2", error))?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_owned)),
            );

            match response.next_continuation_token() {
                Some(next) => token = Some(next.to_owned()),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let keys = self.list_prefix(prefix).await?;
        let mut deleted = 0_u64;

        for batch in keys.chunks(DELETE_BATCH) {
            let objects = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|error| Error::Service {
                    operation: "DeleteObjects",
                    source: Box::new(error),
                })?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .build()
                .map_err(|error| Error::Service {
                    operation: "DeleteObjects",
                    source: Box::new(error),
                })?;

            let response = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|error| Error::service("DeleteObjects", error))?;

            deleted += response.deleted().len() as u64;

            for error in response.errors() {
                tracing::warn!(
                    message = "object survived prefix delete",
                    key = error.key(),
                    code = error.code(),
                );
            }
        }

        Ok(deleted)
    }
}
