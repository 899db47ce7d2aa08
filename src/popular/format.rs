// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! On-disk format of a popularity file.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ header (16 bytes)                            │
//! │   magic "TYPP" | version u8 | flags u8       │
//! │   reserved u16 | capacity u32 | count u32    │
//! ├──────────────────────────────────────────────┤
//! │ count × entry, sorted by key bytes           │
//! │   varint key_len | key (UTF-8) | varint n    │
//! ├──────────────────────────────────────────────┤
//! │ footer (8 bytes)                             │
//! │   crc32(header + entries) u32 | magic "PPYT" │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! All integers little-endian. The footer is written last, so a torn write
//! shows up as a bad footer magic or a CRC mismatch and the file is treated
//! as corrupt. Entries are sorted so the same table always encodes to the
//! same bytes.

use std::io::{self, Write};

use crc32fast::Hasher as Crc32Hasher;

use crate::error::StoreError;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Magic bytes: "TYPP" in ASCII (header)
pub const MAGIC: [u8; 4] = *b"TYPP";

/// Footer magic: "PPYT" (reversed, marks valid file end)
pub const FOOTER_MAGIC: [u8; 4] = *b"PPYT";

/// Current format version
pub const VERSION: u8 = 1;

/// Maximum varint bytes (u64 needs at most 10 bytes)
pub const MAX_VARINT_BYTES: usize = 10;

/// Longest key accepted when decoding
pub const MAX_KEY_BYTES: usize = 64 * 1024;

// ============================================================================
// VARINT
// ============================================================================

/// Encode a varint to bytes
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// Decode a varint from bytes, returning (value, bytes_consumed)
pub fn decode_varint(bytes: &[u8]) -> io::Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().take(MAX_VARINT_BYTES).enumerate() {
        if shift == 63 && byte > 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Varint overflows u64",
            ));
        }
        result |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
        shift += 7;
    }

    if bytes.len() >= MAX_VARINT_BYTES {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Varint exceeds maximum length (possible corruption)",
        ))
    } else {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Incomplete varint"))
    }
}

// ============================================================================
// HEADER / FOOTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    pub version: u8,
    pub flags: u8,
    pub capacity: u32,
    pub count: u32,
}

impl StoreHeader {
    // 4 (magic) + 1 (version) + 1 (flags) + 2 (reserved) + 4 + 4 = 16
    pub const SIZE: usize = 16;

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&MAGIC)?;
        w.write_all(&[self.version, self.flags])?;
        w.write_all(&[0u8; 2])?; // reserved
        w.write_all(&self.capacity.to_le_bytes())?;
        w.write_all(&self.count.to_le_bytes())?;
        Ok(())
    }

    pub fn read(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < Self::SIZE {
            return Err(StoreError::Corrupt("file too short for header".into()));
        }
        if bytes[..4] != MAGIC {
            return Err(StoreError::Corrupt(format!(
                "invalid magic: expected TYPP, got {:?}",
                &bytes[..4]
            )));
        }
        let header = Self {
            version: bytes[4],
            flags: bytes[5],
            capacity: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            count: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        };
        if header.version != VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported version {}",
                header.version
            )));
        }
        if header.count > header.capacity {
            return Err(StoreError::Corrupt(format!(
                "{} entries exceed capacity {}",
                header.count, header.capacity
            )));
        }
        Ok(header)
    }
}

/// CRC32 checksum and magic number
#[derive(Debug, Clone, Copy)]
pub struct StoreFooter {
    pub crc32: u32,
}

impl StoreFooter {
    pub const SIZE: usize = 8; // 4 bytes CRC32 + 4 bytes magic

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.crc32.to_le_bytes())?;
        w.write_all(&FOOTER_MAGIC)?;
        Ok(())
    }

    pub fn read(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < Self::SIZE {
            return Err(StoreError::Corrupt("file too short for footer".into()));
        }
        let start = bytes.len() - Self::SIZE;
        if bytes[start + 4..] != FOOTER_MAGIC {
            return Err(StoreError::Corrupt("invalid footer magic".into()));
        }
        let crc32 = u32::from_le_bytes([
            bytes[start],
            bytes[start + 1],
            bytes[start + 2],
            bytes[start + 3],
        ]);
        Ok(Self { crc32 })
    }

    /// Compute CRC32 over the given bytes
    pub fn compute_crc32(data: &[u8]) -> u32 {
        let mut hasher = Crc32Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }
}

// ============================================================================
// WHOLE FILE
// ============================================================================

/// Encode a table. `entries` must be sorted by key.
pub fn encode_store(capacity: u32, entries: &[(&str, u64)]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(StoreHeader::SIZE + entries.len() * 16 + StoreFooter::SIZE);
    let header = StoreHeader {
        version: VERSION,
        flags: 0,
        capacity,
        count: entries.len() as u32,
    };
    // Writing into a Vec can't fail.
    let _ = header.write(&mut buf);

    for (key, count) in entries {
        encode_varint(key.len() as u64, &mut buf);
        buf.extend_from_slice(key.as_bytes());
        encode_varint(*count, &mut buf);
    }

    let footer = StoreFooter {
        crc32: StoreFooter::compute_crc32(&buf),
    };
    let _ = footer.write(&mut buf);
    buf
}

/// A decoded popularity file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedStore {
    pub header: StoreHeader,
    pub entries: Vec<(String, u64)>,
}

fn corrupt(e: io::Error) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

/// Decode and validate a whole file.
pub fn decode_store(bytes: &[u8]) -> Result<DecodedStore, StoreError> {
    let header = StoreHeader::read(bytes)?;
    let footer = StoreFooter::read(bytes)?;
    if bytes.len() < StoreHeader::SIZE + StoreFooter::SIZE {
        return Err(StoreError::Corrupt("file truncated".into()));
    }

    let body_end = bytes.len() - StoreFooter::SIZE;
    let actual = StoreFooter::compute_crc32(&bytes[..body_end]);
    if actual != footer.crc32 {
        return Err(StoreError::Corrupt(format!(
            "CRC32 mismatch: expected {:08x}, got {:08x}",
            footer.crc32, actual
        )));
    }

    let body = &bytes[StoreHeader::SIZE..body_end];
    let mut pos = 0;
    let mut entries: Vec<(String, u64)> = Vec::with_capacity((header.count as usize).min(1 << 16));

    for _ in 0..header.count {
        let (len, n) = decode_varint(&body[pos..]).map_err(corrupt)?;
        pos += n;
        let len = len as usize;
        if len > MAX_KEY_BYTES || pos + len > body.len() {
            return Err(StoreError::Corrupt("key runs past end of file".into()));
        }
        let key = std::str::from_utf8(&body[pos..pos + len])
            .map_err(|e| StoreError::Corrupt(format!("key is not UTF-8: {e}")))?
            .to_string();
        pos += len;
        let (count, n) = decode_varint(&body[pos..]).map_err(corrupt)?;
        pos += n;

        if entries.last().is_some_and(|(prev, _)| *prev >= key) {
            return Err(StoreError::Corrupt(format!("keys out of order at `{key}`")));
        }
        entries.push((key, count));
    }

    if pos != body.len() {
        return Err(StoreError::Corrupt(format!(
            "{} trailing bytes after entries",
            body.len() - pos
        )));
    }

    Ok(DecodedStore { header, entries })
}
