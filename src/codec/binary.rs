//! Binary snapshot format
//!
//! Little-endian, length-prefixed layout with a CRC32 footer. See the module
//! docs of `codec` for the byte layout.

use std::collections::BTreeMap;

use crate::error::{RangeKvError, Result};

use super::{Marshaller, StoreData, StoreDataRef};

/// Magic bytes identifying a rangekv snapshot
const MAGIC: &[u8; 4] = b"RKVS";

/// Current format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + KvCount (8) = 14 bytes
const HEADER_SIZE: usize = 14;

/// Footer size: CRC32 (4)
const FOOTER_SIZE: usize = 4;

/// Length-prefixed binary marshaller
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryMarshaller;

impl Marshaller for BinaryMarshaller {
    fn marshal(&self, data: StoreDataRef<'_>) -> Result<Vec<u8>> {
        let kv_bytes: usize = data.kv.iter().map(|(k, v)| 8 + k.len() + v.len()).sum();
        let prefix_bytes: usize = data.delete_prefixes.iter().map(|p| 4 + p.len()).sum();
        let mut out = Vec::with_capacity(HEADER_SIZE + kv_bytes + 4 + prefix_bytes + FOOTER_SIZE);

        // Header
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(data.kv.len() as u64).to_le_bytes());

        // KV block, ascending key order
        for (key, value) in data.kv {
            out.extend_from_slice(&len_u32(key.len(), "key")?.to_le_bytes());
            out.extend_from_slice(&len_u32(value.len(), "value")?.to_le_bytes());
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(value);
        }

        // Prefix block, deletion order
        out.extend_from_slice(&len_u32(data.delete_prefixes.len(), "prefix count")?.to_le_bytes());
        for prefix in data.delete_prefixes {
            out.extend_from_slice(&len_u32(prefix.len(), "prefix")?.to_le_bytes());
            out.extend_from_slice(prefix.as_bytes());
        }

        let crc = crc32fast::hash(&out);
        out.extend_from_slice(&crc.to_le_bytes());

        Ok(out)
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<(StoreData, u64)> {
        if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(RangeKvError::Unmarshal(format!(
                "snapshot too short: {} bytes",
                bytes.len()
            )));
        }

        // Verify checksum before trusting any length field
        let (body, footer) = bytes.split_at(bytes.len() - FOOTER_SIZE);
        let expected = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(RangeKvError::Unmarshal(format!(
                "checksum mismatch: expected {:08x}, computed {:08x}",
                expected, actual
            )));
        }

        let mut reader = SliceReader::new(body);

        let magic = reader.take(4)?;
        if magic != MAGIC {
            return Err(RangeKvError::Unmarshal(format!(
                "invalid snapshot magic: expected RKVS, got {:?}",
                magic
            )));
        }

        let version = reader.read_u16()?;
        if version != VERSION {
            return Err(RangeKvError::Unmarshal(format!(
                "unsupported snapshot version: {}",
                version
            )));
        }

        let kv_count = reader.read_u64()?;
        let mut kv = BTreeMap::new();
        let mut size = 0u64;
        for _ in 0..kv_count {
            let key_len = reader.read_u32()? as usize;
            let val_len = reader.read_u32()? as usize;
            let key = reader.read_string(key_len)?;
            let value = reader.take(val_len)?.to_vec();
            size += value.len() as u64;
            if kv.insert(key.clone(), value).is_some() {
                return Err(RangeKvError::Unmarshal(format!("duplicate key {:?}", key)));
            }
        }

        let prefix_count = reader.read_u32()?;
        let mut delete_prefixes = Vec::with_capacity(prefix_count.min(1024) as usize);
        for _ in 0..prefix_count {
            let len = reader.read_u32()? as usize;
            delete_prefixes.push(reader.read_string(len)?);
        }

        if reader.remaining() != 0 {
            return Err(RangeKvError::Unmarshal(format!(
                "{} trailing bytes after prefix block",
                reader.remaining()
            )));
        }

        Ok((StoreData { kv, delete_prefixes }, size))
    }
}

fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| RangeKvError::Marshal(format!("{} length {} exceeds u32", what, len)))
}

/// Bounds-checked cursor over a byte slice
struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(RangeKvError::Unmarshal(format!(
                "truncated snapshot: need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| RangeKvError::Unmarshal(format!("invalid utf-8 string: {}", e)))
    }
}
