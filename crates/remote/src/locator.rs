//! Translation of display URLs into canonical storage locators.
//!
//! The service hands out time-limited presigned URLs for display, but
//! its job endpoints only accept `s3://bucket/key` locators. Translation
//! is purely syntactic and never touches the network.

use std::fmt;

use percent_encoding::percent_decode_str;
use reqwest::Url;

/// Host suffix shared by every S3 endpoint form we accept.
const S3_HOST_SUFFIX: &str = ".amazonaws.com";

/// Canonical storage locator (`s3://bucket/key`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    bucket: String,
    key: String,
}

impl Locator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Reasons a URL could not be translated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    #[error("Cannot derive storage locator, not a valid URL: {0}")]
    Unparsable(String),

    #[error("Cannot derive storage locator, not a storage URL: {0}")]
    UnrecognizedHost(String),

    #[error("Cannot derive storage locator, missing bucket or key: {0}")]
    MissingKey(String),
}

/// Translate a presigned/display URL (or an existing locator) into a
/// canonical [`Locator`].
///
/// Accepted shapes:
/// - `s3://bucket/key` (passed through)
/// - `https://bucket.s3.amazonaws.com/key`
/// - `https://bucket.s3.<region>.amazonaws.com/key`
/// - `https://bucket.s3-<region>.amazonaws.com/key`
/// - `https://s3[.<region>].amazonaws.com/bucket/key`
///
/// Query strings (signatures, expiry) are dropped. The key is
/// percent-decoded, so it names the stored object rather than its URL
/// spelling.
pub fn to_locator(raw: &str) -> Result<Locator, LocatorError> {
    let url = Url::parse(raw.trim()).map_err(|_| LocatorError::Unparsable(raw.to_string()))?;

    let host = url
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| LocatorError::UnrecognizedHost(raw.to_string()))?;
    let path = url.path().trim_start_matches('/');

    let (bucket, key) = match url.scheme() {
        "s3" => (host, path.to_string()),
        "http" | "https" => {
            let prefix = host
                .strip_suffix(S3_HOST_SUFFIX)
                .ok_or_else(|| LocatorError::UnrecognizedHost(raw.to_string()))?;

            if prefix == "s3" || prefix.starts_with("s3.") || prefix.starts_with("s3-") {
                // Path-style: first segment is the bucket.
                match path.split_once('/') {
                    Some((bucket, key)) => (bucket.to_string(), key.to_string()),
                    None => return Err(LocatorError::MissingKey(raw.to_string())),
                }
            } else {
                let bucket = virtual_hosted_bucket(prefix)
                    .ok_or_else(|| LocatorError::UnrecognizedHost(raw.to_string()))?;
                (bucket.to_string(), path.to_string())
            }
        }
        _ => return Err(LocatorError::UnrecognizedHost(raw.to_string())),
    };

    let key = percent_decode_str(&key)
        .decode_utf8()
        .map_err(|_| LocatorError::Unparsable(raw.to_string()))?
        .into_owned();

    if bucket.is_empty() || key.is_empty() || key.ends_with('/') {
        return Err(LocatorError::MissingKey(raw.to_string()));
    }

    Ok(Locator { bucket, key })
}

/// Extract the bucket from a virtual-hosted host prefix such as
/// `mybucket.s3`, `mybucket.s3.us-west-2` or `mybucket.s3-us-west-2`.
fn virtual_hosted_bucket(prefix: &str) -> Option<&str> {
    if let Some(bucket) = prefix.strip_suffix(".s3") {
        return Some(bucket);
    }
    prefix
        .rfind(".s3.")
        .or_else(|| prefix.rfind(".s3-"))
        .map(|idx| &prefix[..idx])
}
