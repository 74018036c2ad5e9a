// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Pre-flight size probe. Runs strictly before any response byte is
//! committed; a single failed metadata request fails the whole request.

use crate::manifest::ManifestEntry;
use crate::store::{ObjectError, ObjectStore};

#[derive(Debug, thiserror::Error)]
#[error("failed to probe size of {path}: {source}")]
pub struct ProbeError {
    pub path: String,
    #[source]
    pub source: ObjectError,
}

/// Sums the declared byte length of every entry's remote object.
///
/// The sum is the length of the *uncompressed* sources, not of the deflated
/// archive that will actually be sent; it is used verbatim as the declared
/// response length. See DESIGN.md for why this is reproduced as-is.
pub async fn total_size(
    store: &dyn ObjectStore,
    entries: &[ManifestEntry],
) -> Result<u64, ProbeError> {
    let mut total = 0u64;
    for entry in entries {
        let len = store.head(&entry.remote_path).await.map_err(|source| ProbeError {
            path: entry.remote_path.clone(),
            source,
        })?;
        total += len;
    }
    Ok(total)
}
