//! Poster uploads to object storage
//!
//! The one media operation the catalog needs: pull a file off the web and
//! drop it into an S3 bucket. The S3 client is the lazily-initialized global
//! from the crate root, so the catalog and media layers share configuration.

use aws_sdk_s3::operation::put_object::PutObjectOutput;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

use crate::error::Error;
use crate::s3_client;

/// Upload raw bytes to a bucket under the given key
pub async fn upload_bytes(
    bucket: &str,
    key: &str,
    bytes: Vec<u8>,
) -> Result<PutObjectOutput, Error> {
    info!(bucket, key, size = bytes.len(), "uploading object");

    let output = s3_client()
        .await
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(bytes))
        .send()
        .await?;

    Ok(output)
}

/// Fetch a file over HTTP and upload it to a bucket
///
/// The download must succeed with a 2xx status before anything is written;
/// a failed fetch surfaces as [`Error::HttpFetchError`] and leaves the bucket
/// untouched.
pub async fn upload_from_url(
    url: &str,
    bucket: &str,
    key: &str,
) -> Result<PutObjectOutput, Error> {
    info!(url, bucket, key, "fetching file for upload");

    let response = reqwest::get(url).await?.error_for_status()?;
    let body = response.bytes().await?;

    upload_bytes(bucket, key, body.to_vec()).await
}
