// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Reference-key resolution: one key-value store round trip, then a typed
//! decode. No caching and no retries; a store failure is reported the same
//! way as an absent key.

use crate::manifest::Manifest;
use crate::store::KeyValueStore;

/// Namespace prefix for manifest keys in the key-value store.
const KEY_PREFIX: &str = "zip:";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The key is absent, expired, or the store call failed; the cases are
    /// not distinguished.
    #[error("Access Denied (link expired)")]
    AccessDenied,
    #[error("error decoding manifest: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Looks up `reference` under the namespaced key and decodes the payload.
pub async fn resolve(
    store: &dyn KeyValueStore,
    reference: &str,
) -> Result<Manifest, ResolveError> {
    let key = format!("{KEY_PREFIX}{reference}");
    let payload = match store.get(&key).await {
        Ok(Some(payload)) => payload,
        Ok(None) => return Err(ResolveError::AccessDenied),
        Err(err) => {
            tracing::warn!(%key, "key-value store error: {err:#}");
            return Err(ResolveError::AccessDenied);
        }
    };
    Ok(Manifest::from_json(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapKv(HashMap<String, Vec<u8>>);

    #[async_trait::async_trait]
    impl KeyValueStore for MapKv {
        async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(self.0.get(key).cloned())
        }
    }

    struct FailingKv;

    #[async_trait::async_trait]
    impl KeyValueStore for FailingKv {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn resolves_namespaced_key() {
        let mut map = HashMap::new();
        map.insert(
            "zip:abc".to_owned(),
            br#"{"Name":"Show","Files":[{"S3Path":"a.mp3","FileName":"A.mp3"}]}"#.to_vec(),
        );
        let manifest = resolve(&MapKv(map), "abc").await.unwrap();
        assert_eq!(manifest.name, "Show");
        assert_eq!(manifest.files.len(), 1);
    }

    #[tokio::test]
    async fn absent_key_is_access_denied() {
        let err = resolve(&MapKv(HashMap::new()), "nope").await.unwrap_err();
        assert!(matches!(err, ResolveError::AccessDenied));
    }

    #[tokio::test]
    async fn store_error_is_access_denied() {
        let err = resolve(&FailingKv, "abc").await.unwrap_err();
        assert!(matches!(err, ResolveError::AccessDenied));
    }

    #[tokio::test]
    async fn malformed_payload_is_decode_error() {
        let mut map = HashMap::new();
        map.insert("zip:abc".to_owned(), b"{broken".to_vec());
        let err = resolve(&MapKv(map), "abc").await.unwrap_err();
        assert!(matches!(err, ResolveError::Decode(_)));
    }
}
