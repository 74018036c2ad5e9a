// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Process configuration, read once at startup from environment variables.
//!
//! - `ZIPSTREAM_PORT` — listen port, default `8000`.
//! - `BUCKET_ENDPOINT` — base URL of the object bucket; when unset it is
//!   derived from `AWS_BUCKET` and `AWS_REGION` (default `us-east-1`).
//! - `REDIS_URL` — `host:port` of the manifest store, `REDIS_PASSWORD`
//!   optional.

use anyhow::Context as _;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bucket_endpoint: Url,
    pub redis_url: String,
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_owned(),
    }
}

/// Virtual-hosted-style bucket URL for a bucket/region pair.
fn bucket_endpoint_for(bucket: &str, region: &str) -> anyhow::Result<Url> {
    Url::parse(&format!("https://{bucket}.s3.{region}.amazonaws.com/"))
        .with_context(|| format!("invalid bucket endpoint for bucket {bucket}"))
}

/// Connection URL for the redis client, folding in the optional password.
fn redis_connection_url(server: &str, password: &str) -> String {
    let server = server.strip_prefix("redis://").unwrap_or(server);
    if password.is_empty() {
        format!("redis://{server}")
    } else {
        format!("redis://:{password}@{server}")
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env_or("ZIPSTREAM_PORT", "8000")
            .parse()
            .context("invalid ZIPSTREAM_PORT")?;

        let bucket_endpoint = match std::env::var("BUCKET_ENDPOINT") {
            Ok(endpoint) if !endpoint.is_empty() => {
                // Object paths are joined onto the endpoint, so it has to be
                // directory-shaped.
                let endpoint = if endpoint.ends_with('/') {
                    endpoint
                } else {
                    format!("{endpoint}/")
                };
                Url::parse(&endpoint).context("invalid BUCKET_ENDPOINT")?
            }
            _ => {
                let bucket = std::env::var("AWS_BUCKET")
                    .context("either BUCKET_ENDPOINT or AWS_BUCKET must be set")?;
                bucket_endpoint_for(&bucket, &env_or("AWS_REGION", "us-east-1"))?
            }
        };

        let redis_server = std::env::var("REDIS_URL").context("REDIS_URL must be set")?;
        let redis_url = redis_connection_url(&redis_server, &env_or("REDIS_PASSWORD", ""));

        Ok(Self {
            port,
            bucket_endpoint,
            redis_url,
        })
    }
}
