//! Frame codec
//!
//! Wraps bincode payloads in a small checksummed header.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, StoreError};
use crate::page::Page;

/// Magic bytes identifying a page file
pub const PAGE_MAGIC: &[u8; 4] = b"TSPG";

/// Magic bytes identifying a table catalog file
pub const CATALOG_MAGIC: &[u8; 4] = b"TSTB";

/// Current frame format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + PayloadLen (4) + CRC (4) = 14 bytes
const HEADER_SIZE: usize = 14;

/// Wrap a payload in a frame
pub fn encode_frame(magic: &[u8; 4], payload: &[u8]) -> Result<Bytes> {
    let len = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization(format!("payload too large: {} bytes", payload.len())))?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_slice(magic);
    buf.put_u16_le(VERSION);
    buf.put_u32_le(len);
    buf.put_u32_le(crc32fast::hash(payload));
    buf.put_slice(payload);

    Ok(buf.freeze())
}

/// Validate a frame and return its payload
pub fn decode_frame<'a>(magic: &[u8; 4], data: &'a [u8]) -> Result<&'a [u8]> {
    if data.len() < HEADER_SIZE {
        return Err(StoreError::Corruption(format!(
            "frame too short: {} bytes",
            data.len()
        )));
    }

    if &data[0..4] != magic {
        return Err(StoreError::Corruption(format!(
            "invalid magic: expected {:?}, got {:?}",
            magic,
            &data[0..4]
        )));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != VERSION {
        return Err(StoreError::Corruption(format!(
            "unsupported frame version: {}",
            version
        )));
    }

    let len = u32::from_le_bytes([data[6], data[7], data[8], data[9]]) as usize;
    let crc = u32::from_le_bytes([data[10], data[11], data[12], data[13]]);

    let payload = &data[HEADER_SIZE..];
    if payload.len() != len {
        return Err(StoreError::Corruption(format!(
            "payload length mismatch: header says {}, found {}",
            len,
            payload.len()
        )));
    }

    if crc32fast::hash(payload) != crc {
        return Err(StoreError::Corruption("payload checksum mismatch".to_string()));
    }

    Ok(payload)
}

/// Serialize a page into a framed image
pub fn encode_page(page: &Page) -> Result<Bytes> {
    let payload = bincode::serialize(page)?;
    encode_frame(PAGE_MAGIC, &payload)
}

/// Deserialize a framed page image
pub fn decode_page(data: &[u8]) -> Result<Page> {
    let payload = decode_frame(PAGE_MAGIC, data)?;
    Ok(bincode::deserialize(payload)?)
}
