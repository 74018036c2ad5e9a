// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Streaming Zip32 writer.
//!
//! Entries are written strictly sequentially into any [`AsyncWrite`] sink.
//! Because entry sizes are unknown when the local header goes out, every
//! entry is written in streaming mode (general-purpose flag bit 3) with its
//! crc and sizes in a trailing data descriptor; real values additionally land
//! in the central directory at finalization. Entry names are always flagged
//! as UTF-8 (flag bit 11), otherwise readers fall back to CP-437 for
//! non-ASCII names.
//!
//! Bodies are deflated incrementally; nothing is buffered beyond the
//! encoder's internal window and the chunk in flight.
//!
//! Zip32 only: entries and the archive itself are limited to 4 GiB, and the
//! entry count to 65535. Exceeding a limit surfaces as an I/O error at write
//! time.

use std::io::Write as _;
use std::mem;

use flate2::write::DeflateEncoder;
use flate2::Compression;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const LOCAL_HEADER_SIG: u32 = 0x04034b50;
const CENTRAL_HEADER_SIG: u32 = 0x02014b50;
const DATA_DESCRIPTOR_SIG: u32 = 0x08074b50;
const END_OF_CENTRAL_DIR_SIG: u32 = 0x06054b50;

const VERSION_NEEDED: u16 = 20;
/// Bit 3: sizes in data descriptor. Bit 11: name is UTF-8.
const FLAGS: u16 = 0x0808;
const METHOD_DEFLATE: u16 = 8;

/// State of the entry currently being written.
struct OpenEntry {
    name: Vec<u8>,
    local_offset: u64,
    crc: crc32fast::Hasher,
    uncompressed: u64,
    compressed: u64,
    encoder: DeflateEncoder<Vec<u8>>,
}

/// Sequential zip writer over `sink`. Duplicate entry names are permitted,
/// matching the append-only semantics of the format.
pub struct ZipStreamWriter<W> {
    sink: W,
    offset: u64,
    central: Vec<u8>,
    entry_count: u64,
    current: Option<OpenEntry>,
}

fn invalid<E: Into<Box<dyn std::error::Error + Send + Sync>>>(err: E) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, err)
}

fn to_u32(value: u64, what: &str) -> std::io::Result<u32> {
    u32::try_from(value).map_err(|_| invalid(format!("{what} exceeds the zip32 limit")))
}

impl<W: AsyncWrite + Unpin> ZipStreamWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            offset: 0,
            central: Vec::new(),
            entry_count: 0,
            current: None,
        }
    }

    /// Number of entries fully written so far.
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    async fn put(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.sink.write_all(bytes).await?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    /// Writes the local header for a new deflate entry named `name`.
    pub async fn begin_entry(&mut self, name: &str) -> std::io::Result<()> {
        if self.current.is_some() {
            return Err(invalid("previous entry not finished"));
        }
        let name = name.as_bytes().to_vec();
        let name_len = u16::try_from(name.len()).map_err(|_| invalid("entry name too long"))?;
        let local_offset = self.offset;

        let mut header = Vec::with_capacity(30 + name.len());
        header.extend_from_slice(&LOCAL_HEADER_SIG.to_le_bytes());
        header.extend_from_slice(&VERSION_NEEDED.to_le_bytes());
        header.extend_from_slice(&FLAGS.to_le_bytes());
        header.extend_from_slice(&METHOD_DEFLATE.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // mod time
        header.extend_from_slice(&0u16.to_le_bytes()); // mod date
        header.extend_from_slice(&0u32.to_le_bytes()); // crc, in descriptor
        header.extend_from_slice(&0u32.to_le_bytes()); // compressed size, in descriptor
        header.extend_from_slice(&0u32.to_le_bytes()); // uncompressed size, in descriptor
        header.extend_from_slice(&name_len.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // extra field length
        header.extend_from_slice(&name);
        self.put(&header).await?;

        self.current = Some(OpenEntry {
            name,
            local_offset,
            crc: crc32fast::Hasher::new(),
            uncompressed: 0,
            compressed: 0,
            encoder: DeflateEncoder::new(Vec::new(), Compression::default()),
        });
        Ok(())
    }

    /// Appends a chunk of the current entry's body.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        let entry = self
            .current
            .as_mut()
            .ok_or_else(|| invalid("no entry open"))?;
        entry.crc.update(chunk);
        entry.uncompressed += chunk.len() as u64;
        entry.encoder.write_all(chunk)?;
        let produced = mem::take(entry.encoder.get_mut());
        entry.compressed += produced.len() as u64;
        if !produced.is_empty() {
            self.put(&produced).await?;
        }
        Ok(())
    }

    /// Flushes the deflate stream, writes the data descriptor, and records the
    /// central directory entry.
    pub async fn finish_entry(&mut self) -> std::io::Result<()> {
        let entry = self.current.take().ok_or_else(|| invalid("no entry open"))?;
        let tail = entry.encoder.finish()?;
        let compressed = entry.compressed + tail.len() as u64;
        if !tail.is_empty() {
            self.put(&tail).await?;
        }

        let crc = entry.crc.finalize();
        let compressed32 = to_u32(compressed, "compressed entry size")?;
        let uncompressed32 = to_u32(entry.uncompressed, "entry size")?;
        let local_offset32 = to_u32(entry.local_offset, "archive size")?;

        let mut descriptor = Vec::with_capacity(16);
        descriptor.extend_from_slice(&DATA_DESCRIPTOR_SIG.to_le_bytes());
        descriptor.extend_from_slice(&crc.to_le_bytes());
        descriptor.extend_from_slice(&compressed32.to_le_bytes());
        descriptor.extend_from_slice(&uncompressed32.to_le_bytes());
        self.put(&descriptor).await?;

        let name_len = u16::try_from(entry.name.len()).expect("validated in begin_entry");
        self.central.extend_from_slice(&CENTRAL_HEADER_SIG.to_le_bytes());
        self.central.extend_from_slice(&VERSION_NEEDED.to_le_bytes()); // version made by
        self.central.extend_from_slice(&VERSION_NEEDED.to_le_bytes());
        self.central.extend_from_slice(&FLAGS.to_le_bytes());
        self.central.extend_from_slice(&METHOD_DEFLATE.to_le_bytes());
        self.central.extend_from_slice(&0u16.to_le_bytes()); // mod time
        self.central.extend_from_slice(&0u16.to_le_bytes()); // mod date
        self.central.extend_from_slice(&crc.to_le_bytes());
        self.central.extend_from_slice(&compressed32.to_le_bytes());
        self.central.extend_from_slice(&uncompressed32.to_le_bytes());
        self.central.extend_from_slice(&name_len.to_le_bytes());
        self.central.extend_from_slice(&0u16.to_le_bytes()); // extra field length
        self.central.extend_from_slice(&0u16.to_le_bytes()); // comment length
        self.central.extend_from_slice(&0u16.to_le_bytes()); // disk number start
        self.central.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
        self.central.extend_from_slice(&0u32.to_le_bytes()); // external attributes
        self.central.extend_from_slice(&local_offset32.to_le_bytes());
        self.central.extend_from_slice(&entry.name);

        self.entry_count += 1;
        Ok(())
    }

    /// Writes the central directory and end record, flushes the sink, and
    /// hands it back.
    pub async fn finish(mut self) -> std::io::Result<W> {
        if self.current.is_some() {
            return Err(invalid("entry still open at finalization"));
        }
        let cd_offset = to_u32(self.offset, "archive size")?;
        let cd_size = to_u32(self.central.len() as u64, "central directory size")?;
        let entries = u16::try_from(self.entry_count).map_err(|_| invalid("too many entries"))?;

        let central = mem::take(&mut self.central);
        self.put(&central).await?;

        let mut end = Vec::with_capacity(22);
        end.extend_from_slice(&END_OF_CENTRAL_DIR_SIG.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes()); // this disk
        end.extend_from_slice(&0u16.to_le_bytes()); // central directory disk
        end.extend_from_slice(&entries.to_le_bytes());
        end.extend_from_slice(&entries.to_le_bytes());
        end.extend_from_slice(&cd_size.to_le_bytes());
        end.extend_from_slice(&cd_offset.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes()); // comment length
        self.put(&end).await?;

        self.sink.flush().await?;
        Ok(self.sink)
    }
}
