// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Request-level contracts for the two external stores the service talks to:
//! the key-value store holding manifests and the object store holding file
//! bytes. Production implementations live in the submodules; tests substitute
//! in-memory fakes.

mod http_bucket;
mod redis_kv;

pub use http_bucket::HttpBucket;
pub use redis_kv::RedisKv;

use bytes::Bytes;
use futures::stream::BoxStream;

/// Streamed object body. Items are chunks in arrival order.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Errors reported by [`ObjectStore`], as an enumerated kind so callers can
/// match on "object is missing" without inspecting the error chain.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("object not found")]
    NotFound,
    #[error("object store request failed: {0}")]
    Unavailable(anyhow::Error),
}

/// Read-only view of the manifest key-value store.
///
/// Implementations must be safe for concurrent use from multiple request
/// tasks; the production implementation multiplexes over a managed redis
/// connection.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetches the raw value under `key`, or `None` if the key is absent.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Read-only view of the remote object store.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Metadata-only request returning the object's declared byte length.
    async fn head(&self, path: &str) -> Result<u64, ObjectError>;

    /// Opens the object body as a byte stream. No bytes are buffered beyond
    /// transport chunks.
    async fn get(&self, path: &str) -> Result<ByteStream, ObjectError>;
}
