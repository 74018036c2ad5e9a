// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use futures::TryStreamExt;
use reqwest::StatusCode;
use url::Url;

use super::{ByteStream, ObjectError, ObjectStore};

/// Object store over a plain HTTP(S) bucket endpoint, e.g.
/// `https://my-bucket.s3.us-east-1.amazonaws.com/`. `HEAD` is used for size
/// probes and `GET` for bodies; the response body is surfaced as a chunk
/// stream without buffering.
pub struct HttpBucket {
    base: Url,
    client: reqwest::Client,
}

impl HttpBucket {
    pub fn new(base: Url, client: reqwest::Client) -> Self {
        Self { base, client }
    }

    fn object_url(&self, path: &str) -> Result<Url, ObjectError> {
        self.base
            .join(path)
            .with_context(|| format!("invalid object path: {path}"))
            .map_err(ObjectError::Unavailable)
    }
}

#[async_trait::async_trait]
impl ObjectStore for HttpBucket {
    async fn head(&self, path: &str) -> Result<u64, ObjectError> {
        let url = self.object_url(path)?;
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| ObjectError::Unavailable(e.into()))?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(ObjectError::NotFound),
            // The Content-Length header is read directly: a HEAD response has
            // no body for the client to size.
            status if status.is_success() => Ok(resp
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok())
                .unwrap_or_default()),
            status => Err(ObjectError::Unavailable(anyhow::anyhow!(
                "unexpected status {status} for HEAD {path}"
            ))),
        }
    }

    async fn get(&self, path: &str) -> Result<ByteStream, ObjectError> {
        let url = self.object_url(path)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ObjectError::Unavailable(e.into()))?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(ObjectError::NotFound),
            status if status.is_success() => Ok(Box::pin(
                resp.bytes_stream()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
            )),
            status => Err(ObjectError::Unavailable(anyhow::anyhow!(
                "unexpected status {status} for GET {path}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_urls_are_joined_and_encoded() {
        let bucket = HttpBucket::new(
            Url::parse("https://bucket.example.com/").unwrap(),
            reqwest::Client::new(),
        );
        let url = bucket.object_url("audio/7W/7W Abandoned.mp3").unwrap();
        assert_eq!(
            url.as_str(),
            "https://bucket.example.com/audio/7W/7W%20Abandoned.mp3"
        );
    }
}
