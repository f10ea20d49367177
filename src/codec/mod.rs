//! Snapshot Codec Module
//!
//! Deterministic bidirectional mapping between a store's state and bytes.
//!
//! ## Responsibilities
//! - Encode `{kv, delete_prefixes}` for persistence
//! - Decode it back, reporting the total size of stored values
//! - Keep the format swappable without touching store logic
//!
//! Both formats iterate `kv` in key order (it is a `BTreeMap`), so equal
//! states always encode to equal bytes.
//!
//! ## Binary Format (V1)
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "RKVS" (4) | Version: u16 (2) | KvCount: u64 (8)│
//! ├─────────────────────────────────────────────────────────┤
//! │ KV Block                                                │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated, ascending key order ...                 │
//! ├─────────────────────────────────────────────────────────┤
//! │ Prefix Block                                            │
//! │   PrefixCount: u32                                      │
//! │   [PrefixLen: u32][Prefix] ... in deletion order ...    │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                        │
//! │   CRC32 of everything above                             │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod binary;
mod compact;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use binary::BinaryMarshaller;
pub use compact::BincodeMarshaller;

/// Decoded snapshot content
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoreData {
    pub kv: BTreeMap<String, Vec<u8>>,
    pub delete_prefixes: Vec<String>,
}

impl StoreData {
    /// Borrowed view suitable for `Marshaller::marshal`
    pub fn view(&self) -> StoreDataRef<'_> {
        StoreDataRef {
            kv: &self.kv,
            delete_prefixes: &self.delete_prefixes,
        }
    }

    /// Sum of stored value lengths
    pub fn value_size(&self) -> u64 {
        value_size(&self.kv)
    }
}

/// Borrowed store state to encode; lets a store serialize without cloning
/// its mapping
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StoreDataRef<'a> {
    pub kv: &'a BTreeMap<String, Vec<u8>>,
    pub delete_prefixes: &'a [String],
}

/// Snapshot encoder/decoder
pub trait Marshaller: Send + Sync + std::fmt::Debug {
    /// Encode store state
    fn marshal(&self, data: StoreDataRef<'_>) -> Result<Vec<u8>>;

    /// Decode store state, returning it with the total stored value size
    fn unmarshal(&self, bytes: &[u8]) -> Result<(StoreData, u64)>;
}

/// Available snapshot encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarshallerKind {
    /// Length-prefixed binary with CRC32 footer
    #[default]
    Binary,

    /// serde + bincode
    Bincode,
}

impl std::str::FromStr for MarshallerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(MarshallerKind::Binary),
            "bincode" => Ok(MarshallerKind::Bincode),
            other => Err(format!("unknown marshaller: {}", other)),
        }
    }
}

/// Build a marshaller of the given kind
pub fn new_marshaller(kind: MarshallerKind) -> Arc<dyn Marshaller> {
    match kind {
        MarshallerKind::Binary => Arc::new(BinaryMarshaller),
        MarshallerKind::Bincode => Arc::new(BincodeMarshaller),
    }
}

pub(crate) fn value_size(kv: &BTreeMap<String, Vec<u8>>) -> u64 {
    kv.values().map(|v| v.len() as u64).sum()
}
