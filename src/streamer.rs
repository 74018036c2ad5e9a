// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The archive assembly loop.
//!
//! Runs strictly after the response headers are committed, so it has no
//! failure terminal towards the client: an entry that cannot be opened is
//! logged and skipped, and the archive is finalized with whatever made it in.
//! The one thing that does abort the loop is a sink write failure, which
//! means the client went away; every remaining remote read would be wasted
//! work.
//!
//! Entries are processed sequentially in manifest order. Ordering in the
//! archive is part of the contract, and the synchronous copy loop lets the
//! response sink's backpressure throttle the upstream object reads.

use futures::TryStreamExt;
use tokio::io::AsyncWrite;
use tracing::warn;

use crate::manifest::ManifestEntry;
use crate::sanitize::archive_path;
use crate::store::{ObjectError, ObjectStore};
use crate::zip::ZipStreamWriter;

/// Outcome of one streaming run, for the request log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    /// Entries fully or partially written into the archive.
    pub written: usize,
    /// Entries skipped because their object could not be opened.
    pub skipped: usize,
}

/// Fetches every entry in order and writes it into `zip`, then finalizes the
/// archive. An `Err` here is a sink failure (client disconnect); everything
/// else is recovered per entry.
pub async fn stream_archive<W: AsyncWrite + Unpin>(
    store: &dyn ObjectStore,
    entries: &[ManifestEntry],
    mut zip: ZipStreamWriter<W>,
) -> std::io::Result<StreamStats> {
    let mut stats = StreamStats::default();

    for entry in entries {
        if entry.remote_path.is_empty() {
            warn!("entry {:?} has no remote path, skipping", entry.file_name);
            stats.skipped += 1;
            continue;
        }
        let mut body = match store.get(&entry.remote_path).await {
            Ok(body) => body,
            Err(ObjectError::NotFound) => {
                warn!("object not found: {}, skipping entry", entry.remote_path);
                stats.skipped += 1;
                continue;
            }
            Err(ObjectError::Unavailable(err)) => {
                warn!("error opening {:?}: {err:#}, skipping entry", entry.remote_path);
                stats.skipped += 1;
                continue;
            }
        };

        zip.begin_entry(&archive_path(entry)).await?;
        loop {
            match body.try_next().await {
                Ok(Some(chunk)) => zip.write_chunk(&chunk).await?,
                Ok(None) => break,
                // A source that dies mid-copy leaves a truncated entry; the
                // header is already out, so the entry stays in the archive.
                Err(err) => {
                    warn!("read of {:?} failed mid-copy: {err}", entry.remote_path);
                    break;
                }
            }
        }
        zip.finish_entry().await?;
        stats.written += 1;
    }

    let mut sink = zip.finish().await?;
    tokio::io::AsyncWriteExt::shutdown(&mut sink).await?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ByteStream;
    use crate::zip::tests::{extract_entry, parse_central_directory};
    use bytes::Bytes;
    use std::collections::HashMap;

    /// In-memory object store; a missing key reads as `NotFound`, the
    /// `"boom"` path fails to open, and `"cutoff"` dies after one chunk.
    struct FakeStore(HashMap<String, Vec<u8>>);

    #[async_trait::async_trait]
    impl ObjectStore for FakeStore {
        async fn head(&self, path: &str) -> Result<u64, ObjectError> {
            self.0
                .get(path)
                .map(|body| body.len() as u64)
                .ok_or(ObjectError::NotFound)
        }

        async fn get(&self, path: &str) -> Result<ByteStream, ObjectError> {
            if path == "boom" {
                return Err(ObjectError::Unavailable(anyhow::anyhow!("tls handshake")));
            }
            if path == "cutoff" {
                return Ok(Box::pin(futures::stream::iter(vec![
                    Ok(Bytes::from_static(b"partial")),
                    Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "reset")),
                ])));
            }
            let body = self.0.get(path).cloned().ok_or(ObjectError::NotFound)?;
            Ok(Box::pin(futures::stream::once(async move {
                Ok(Bytes::from(body))
            })))
        }
    }

    fn entry(file_name: &str, remote_path: &str) -> ManifestEntry {
        ManifestEntry {
            file_name: file_name.into(),
            remote_path: remote_path.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn all_entries_in_manifest_order() {
        let store = FakeStore(HashMap::from([
            ("b.mp3".to_owned(), b"bbb".to_vec()),
            ("a.mp3".to_owned(), b"aaaa".to_vec()),
        ]));
        let entries = [entry("B.mp3", "b.mp3"), entry("A.mp3", "a.mp3")];
        let mut out = std::io::Cursor::new(Vec::new());
        let stats = stream_archive(&store, &entries, ZipStreamWriter::new(&mut out))
            .await
            .unwrap();
        assert_eq!(stats, StreamStats { written: 2, skipped: 0 });

        let parsed = parse_central_directory(out.get_ref());
        let names: Vec<_> = parsed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["B.mp3", "A.mp3"]);
        assert_eq!(extract_entry(out.get_ref(), &parsed[0]), b"bbb");
        assert_eq!(extract_entry(out.get_ref(), &parsed[1]), b"aaaa");
    }

    #[tokio::test]
    async fn missing_object_is_skipped_not_fatal() {
        let store = FakeStore(HashMap::from([("a.mp3".to_owned(), b"aaaa".to_vec())]));
        let entries = [entry("A.mp3", "a.mp3"), entry("B.mp3", "gone.mp3")];
        let mut out = std::io::Cursor::new(Vec::new());
        let stats = stream_archive(&store, &entries, ZipStreamWriter::new(&mut out))
            .await
            .unwrap();
        assert_eq!(stats, StreamStats { written: 1, skipped: 1 });
        let parsed = parse_central_directory(out.get_ref());
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "A.mp3");
    }

    #[tokio::test]
    async fn open_failure_and_empty_path_are_skipped() {
        let store = FakeStore(HashMap::from([("a.mp3".to_owned(), b"a".to_vec())]));
        let entries = [entry("X.mp3", "boom"), entry("Y.mp3", ""), entry("A.mp3", "a.mp3")];
        let mut out = std::io::Cursor::new(Vec::new());
        let stats = stream_archive(&store, &entries, ZipStreamWriter::new(&mut out))
            .await
            .unwrap();
        assert_eq!(stats, StreamStats { written: 1, skipped: 2 });
    }

    #[tokio::test]
    async fn source_failure_mid_copy_truncates_but_continues() {
        let store = FakeStore(HashMap::from([("a.mp3".to_owned(), b"after".to_vec())]));
        let entries = [entry("C.mp3", "cutoff"), entry("A.mp3", "a.mp3")];
        let mut out = std::io::Cursor::new(Vec::new());
        let stats = stream_archive(&store, &entries, ZipStreamWriter::new(&mut out))
            .await
            .unwrap();
        assert_eq!(stats, StreamStats { written: 2, skipped: 0 });
        let parsed = parse_central_directory(out.get_ref());
        assert_eq!(parsed[0].name, "C.mp3");
        assert_eq!(extract_entry(out.get_ref(), &parsed[0]), b"partial");
        assert_eq!(extract_entry(out.get_ref(), &parsed[1]), b"after");
    }

    #[tokio::test]
    async fn sink_failure_aborts_the_loop() {
        // A sink with a hard cap: writes past it fail, like a closed duplex.
        struct Capped {
            inner: Vec<u8>,
            cap: usize,
        }
        impl tokio::io::AsyncWrite for Capped {
            fn poll_write(
                mut self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                buf: &[u8],
            ) -> std::task::Poll<std::io::Result<usize>> {
                if self.inner.len() + buf.len() > self.cap {
                    return std::task::Poll::Ready(Err(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "client went away",
                    )));
                }
                self.inner.extend_from_slice(buf);
                std::task::Poll::Ready(Ok(buf.len()))
            }
            fn poll_flush(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }
            fn poll_shutdown(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }
        }

        let store = FakeStore(HashMap::from([(
            "big.mp3".to_owned(),
            vec![0u8; 1 << 16],
        )]));
        let entries = [entry("Big.mp3", "big.mp3"), entry("Big2.mp3", "big.mp3")];
        let sink = Capped { inner: Vec::new(), cap: 64 };
        let err = stream_archive(&store, &entries, ZipStreamWriter::new(sink))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
