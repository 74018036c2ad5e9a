// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::KeyValueStore;

/// Manifest store backed by redis. The [`ConnectionManager`] multiplexes a
/// single reconnecting connection and is cheap to clone, so one instance is
/// shared across all request tasks.
#[derive(Clone)]
pub struct RedisKv {
    manager: ConnectionManager,
}

impl RedisKv {
    /// Connects to redis at `url` (`redis://[:password@]host:port`).
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }
}
