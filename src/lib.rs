// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! zipstream assembles a zip archive on the fly from remotely stored objects
//! and streams it as a single HTTP download. A request carries an opaque
//! reference key; the key resolves to a manifest in the key-value store, the
//! manifest lists the remote objects, and the response body is the archive
//! built from them in manifest order.

pub mod config;
pub mod logger;
pub mod manifest;
pub mod probe;
pub mod resolve;
pub mod sanitize;
pub mod server;
pub mod store;
pub mod streamer;
pub mod zip;

use std::sync::Arc;

/// Entry point for the `zipstream` binary: configuration, logging, store
/// clients, then the serve loop.
pub async fn zipstream_main() -> anyhow::Result<()> {
    logger::setup_logger();
    let config = config::Config::from_env()?;

    let kv = store::RedisKv::connect(&config.redis_url).await?;
    let objects = store::HttpBucket::new(config.bucket_endpoint.clone(), reqwest::Client::new());
    let ctx = Arc::new(server::ServiceContext {
        kv: Arc::new(kv),
        objects: Arc::new(objects),
    });

    server::serve(ctx, config.port).await
}
