// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Archive-safe name handling.
//!
//! Zip readers on various platforms choke on a handful of characters in entry
//! names; those are deleted outright rather than replaced, so names stay
//! human-readable. Everything else, including spaces and non-ASCII, passes
//! through untouched.

use crate::manifest::ManifestEntry;

/// Characters that are stripped from user-supplied name components.
const DISALLOWED: &[char] = &['#', '<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Fallback entry name when sanitizing leaves nothing behind.
pub const FALLBACK_TRACK: &str = "Track";
/// Fallback playlist directory name when sanitizing leaves nothing behind.
pub const FALLBACK_PLAYLIST: &str = "Playlist";

/// Deletes every disallowed character from `raw`. Returns `fallback` if the
/// result is empty. Idempotent.
pub fn sanitize(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !DISALLOWED.contains(c)).collect();
    if cleaned.is_empty() {
        fallback.to_owned()
    } else {
        cleaned
    }
}

/// Computes the full path of an entry inside the produced archive:
/// an optional `<playlist_id>.<playlist name>/` prefix, then the manifest
/// folder (trusted, slash-terminated), then the sanitized file name.
pub fn archive_path(entry: &ManifestEntry) -> String {
    let mut path = String::new();
    if entry.playlist_id > 0 {
        path.push_str(&entry.playlist_id.to_string());
        path.push('.');
        path.push_str(&sanitize(&entry.playlist_name, FALLBACK_PLAYLIST));
        path.push('/');
    }
    if !entry.folder.is_empty() {
        path.push_str(&entry.folder);
        if !path.ends_with('/') {
            path.push('/');
        }
    }
    path.push_str(&sanitize(&entry.file_name, FALLBACK_TRACK));
    path
}
