// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Typed view of the manifest payload stored in the key-value store.
//!
//! The payload is JSON with PascalCase keys; the numeric identifiers are
//! transport-encoded as decimal strings and absent fields decode to their
//! defaults. Entry order in `files` is the order entries appear in the
//! produced archive.

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};

/// A resolved download manifest: a display name (seed for the attachment file
/// name) plus an ordered list of remote objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Files", default)]
    pub files: Vec<ManifestEntry>,
}

/// One remote object to be placed into the archive.
///
/// `remote_path` is the only field required for an entry to be fetchable.
/// `track_id`/`playlist_id` of zero mean "not set".
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "FileName", default)]
    pub file_name: String,
    #[serde(rename = "Folder", default)]
    pub folder: String,
    #[serde(rename = "S3Path")]
    pub remote_path: String,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "TrackID", default)]
    pub track_id: i64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "PlaylistID", default)]
    pub playlist_id: i64,
    #[serde(rename = "PlaylistName", default)]
    pub playlist_name: String,
}

impl Manifest {
    /// Decodes a raw key-value store payload.
    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}
