//! PSARC container reader: header, table of contents, and chunk-index-driven entry assembly.
//!
//! The TOC's `b`-byte length/offset field width is derived from `toc_entry_size` rather than
//! from the block size, and the chunk-length table is always read at a fixed 16-bit width.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use bitflags::bitflags;
use tracing::{debug, trace};

use crate::binary_reader::BinaryReader;
use crate::compression;
use crate::crypto;
use crate::error::{Error, Result};
use crate::sng;

bitflags! {
    pub struct ArchiveFlags: u32 {
        const TOC_ENCRYPTED = 0x04;
    }
}

pub const HEADER_LEN: usize = 32;
const MAGIC: u32 = 0x5053_4152; // "PSAR"

#[derive(Debug, Clone)]
pub struct Header {
    pub version_major: u16,
    pub version_minor: u16,
    pub compression: [u8; 4],
    pub toc_size: u32,
    pub toc_entry_size: u32,
    pub entry_count: u32,
    pub block_size: u32,
    pub flags: ArchiveFlags,
}

impl Header {
    fn read_from(buf: &[u8]) -> Result<Self> {
        let mut r = BinaryReader::new(buf);
        let magic = r.read_u32_be()?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic);
        }
        let version = r.read_u32_be()?;
        let version_major = (version >> 16) as u16;
        let version_minor = version as u16;
        if version_major != 1 || version_minor != 4 {
            return Err(Error::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }
        let compression_bytes = r.read_bytes(4)?;
        let mut compression = [0u8; 4];
        compression.copy_from_slice(compression_bytes);
        let toc_size = r.read_u32_be()?;
        let toc_entry_size = r.read_u32_be()?;
        let entry_count = r.read_u32_be()?;
        let block_size = r.read_u32_be()?;
        let flags = ArchiveFlags::from_bits_truncate(r.read_u32_be()?);
        Ok(Header {
            version_major,
            version_minor,
            compression,
            toc_size,
            toc_entry_size,
            entry_count,
            block_size,
            flags,
        })
    }

    pub fn compression_str(&self) -> &str {
        std::str::from_utf8(&self.compression).unwrap_or("")
    }

    /// The per-archive byte width of the TOC entry's length and offset fields.
    fn field_width(&self) -> Result<usize> {
        if self.toc_entry_size < 20 || (self.toc_entry_size - 20) % 2 != 0 {
            return Err(Error::InvalidTocEntrySize(self.toc_entry_size));
        }
        let b = (self.toc_entry_size - 20) / 2;
        if !(1..=8).contains(&b) {
            return Err(Error::InvalidTocEntrySize(self.toc_entry_size));
        }
        Ok(b as usize)
    }
}

#[derive(Debug, Clone)]
pub struct TocEntry {
    pub start_chunk_index: u32,
    pub uncompressed_size: u64,
    pub offset: u64,
    pub name: Option<String>,
}

pub struct Toc {
    pub entries: Vec<TocEntry>,
    pub z_lengths: Vec<u16>,
}

impl Toc {
    fn read_from(buf: &[u8], header: &Header) -> Result<Self> {
        let field_width = header.field_width()?;
        let mut r = BinaryReader::new(buf);
        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            r.skip(16)?; // MD5, ignored
            let start_chunk_index = r.read_u32_be()?;
            let uncompressed_size = r.read_uint_be(field_width)?;
            let offset = r.read_uint_be(field_width)?;
            entries.push(TocEntry {
                start_chunk_index,
                uncompressed_size,
                offset,
                name: None,
            });
        }

        let consumed = r.position();
        let toc_payload_len = (header.toc_size as usize)
            .checked_sub(HEADER_LEN)
            .ok_or(Error::TruncatedToc)?;
        if consumed > toc_payload_len {
            return Err(Error::TruncatedToc);
        }
        let z_len_bytes = toc_payload_len - consumed;
        let z_count = z_len_bytes / 2;
        let mut z_lengths = Vec::with_capacity(z_count);
        for _ in 0..z_count {
            z_lengths.push(r.read_u16_be()?);
        }

        Ok(Toc { entries, z_lengths })
    }
}

/// The PSARC container reader/facade's inner state. `Archive` (in `crate::archive`) wraps this
/// with the public, idempotent open/close lifecycle.
pub struct ContainerReader {
    file: File,
    pub header: Header,
    pub toc: Toc,
}

impl ContainerReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|source| Error::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let mut header_buf = [0u8; HEADER_LEN];
        file.read_exact(&mut header_buf)?;
        let header = Header::read_from(&header_buf)?;
        debug!(
            version = format!("{}.{}", header.version_major, header.version_minor),
            compression = header.compression_str(),
            entry_count = header.entry_count,
            "parsed PSARC header"
        );

        let toc_rest_len = header.toc_size as usize - HEADER_LEN;
        let mut toc_buf = vec![0u8; toc_rest_len];
        file.read_exact(&mut toc_buf)?;
        if header.flags.contains(ArchiveFlags::TOC_ENCRYPTED) {
            debug!("TOC is encrypted, decrypting");
            toc_buf = crypto::decrypt_toc(&toc_buf)?;
        }
        let mut toc = Toc::read_from(&toc_buf, &header)?;

        for entry in &toc.entries {
            let blocks_needed = blocks_needed(entry.uncompressed_size, header.block_size as u64);
            if entry.start_chunk_index as u64 + blocks_needed > toc.z_lengths.len() as u64 {
                return Err(Error::ChunkIndexOutOfRange);
            }
        }

        let mut reader = ContainerReader { file, header, toc };
        reader.read_names()?;
        Ok(reader)
    }

    fn read_names(&mut self) -> Result<()> {
        if self.toc.entries.is_empty() {
            return Ok(());
        }
        self.toc.entries[0].name = Some("NamesBlock.bin".to_string());
        let bytes = self.extract_by_index(0)?;
        let text = String::from_utf8_lossy(&bytes);
        for (i, line) in text.split('\n').enumerate() {
            let idx = i + 1;
            if idx >= self.toc.entries.len() {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.toc.entries[idx].name = Some(trimmed.to_string());
        }
        Ok(())
    }

    pub fn file_count(&self) -> usize {
        self.toc.entries.len()
    }

    pub fn entry(&self, index: usize) -> Option<&TocEntry> {
        self.toc.entries.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.toc
            .entries
            .iter()
            .position(|e| e.name.as_deref() == Some(name))
    }

    /// Assembles the bytes for TOC entry `index`, applying the SNG unwrap step when the entry's
    /// name matches the game arrangement path predicate.
    pub fn extract_by_index(&mut self, index: usize) -> Result<Vec<u8>> {
        let entry = self
            .toc
            .entries
            .get(index)
            .ok_or(Error::ChunkIndexOutOfRange)?
            .clone();

        let block_size = self.header.block_size as usize;
        let needed = entry.uncompressed_size as usize;
        let mut produced = 0usize;
        let mut chunk_idx = entry.start_chunk_index as usize;
        let mut out = Vec::with_capacity(needed);

        self.file.seek(SeekFrom::Start(entry.offset))?;

        while produced < needed {
            if chunk_idx >= self.toc.z_lengths.len() {
                return Err(Error::ChunkIndexOutOfRange);
            }
            let z = self.toc.z_lengths[chunk_idx];
            chunk_idx += 1;

            if z == 0 {
                let mut buf = vec![0u8; block_size];
                let n = read_up_to(&mut self.file, &mut buf)?;
                buf.truncate(n);
                produced += buf.len();
                out.extend_from_slice(&buf);
            } else {
                let mut raw = vec![0u8; z as usize];
                self.file.read_exact(&mut raw)?;
                let expected = (needed - produced).min(block_size);
                let decompressed = match self.header.compression_str() {
                    "zlib" => compression::zlib_inflate(&raw, expected),
                    "lzma" => compression::lzma_decompress(&raw, expected),
                    _ => {
                        let z = compression::zlib_inflate(&raw, expected);
                        if z.is_empty() {
                            compression::lzma_decompress(&raw, expected)
                        } else {
                            z
                        }
                    }
                };
                if decompressed.is_empty() {
                    trace!(chunk_idx, z, "decompression failed, using raw fallback");
                    produced += raw.len();
                    out.extend_from_slice(&raw);
                } else {
                    produced += decompressed.len();
                    out.extend_from_slice(&decompressed);
                }
            }
        }

        out.truncate(needed);

        let is_sng = entry
            .name
            .as_deref()
            .map(|n| n.contains("songs/bin/generic/") && n.ends_with(".sng"))
            .unwrap_or(false);
        if is_sng {
            out = sng::decoder::unwrap_sng(&out)?;
        }

        Ok(out)
    }

    pub fn extract_by_name(&mut self, name: &str) -> Result<Vec<u8>> {
        let index = self.index_of(name).ok_or(Error::ChunkIndexOutOfRange)?;
        self.extract_by_index(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.toc.entries.iter().filter_map(|e| e.name.as_deref())
    }
}

fn blocks_needed(uncompressed_size: u64, block_size: u64) -> u64 {
    if uncompressed_size == 0 {
        0
    } else {
        (uncompressed_size + block_size - 1) / block_size
    }
}

/// Reads as many bytes as are available, up to `buf.len()`, returning the count actually read.
/// Unlike `read_exact`, reaching EOF early is not an error.
fn read_up_to(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match file.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

impl Drop for ContainerReader {
    fn drop(&mut self) {
        debug!("closing archive file handle");
    }
}
