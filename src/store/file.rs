//! Snapshot file naming
//!
//! A snapshot's name is a pure function of its identity and can be parsed
//! back without consulting the blob store:
//!
//! ```text
//! {store}/{end:010}-{start:010}.{trace_id}.partial   partial segment
//! {store}/{end:010}-{start:010}.partial              partial, empty trace id
//! {store}/{end:010}-{start:010}.kv                   fully merged state
//! ```
//!
//! The end block comes first so a store's snapshots list in boundary order.
//! Store names may contain `/` (the last one separates the file part). In the
//! trace id, `%` and `/` are written as `%25` and `%2F` so every trace id
//! survives the round trip.

use std::fmt;

use crate::block::BlockRange;
use crate::error::{RangeKvError, Result};

const PARTIAL_EXT: &str = ".partial";
const FULL_EXT: &str = ".kv";

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Which store variant produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    /// Mutations of one segment only
    Partial,

    /// Complete state from the module's initial block
    Full,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Partial => write!(f, "partial"),
            FileKind::Full => write!(f, "full"),
        }
    }
}

/// Identity of a persisted snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileInfo {
    pub store_name: String,
    pub range: BlockRange,
    pub trace_id: String,
    pub kind: FileKind,
    pub filename: String,
}

impl FileInfo {
    /// Identity of a partial segment `[start_block, end_boundary_block)`
    pub fn new_partial(
        store_name: &str,
        start_block: u64,
        end_boundary_block: u64,
        trace_id: &str,
    ) -> Self {
        let range = BlockRange::new(start_block, end_boundary_block);
        let filename = if trace_id.is_empty() {
            format!(
                "{}/{:010}-{:010}{}",
                store_name, end_boundary_block, start_block, PARTIAL_EXT
            )
        } else {
            format!(
                "{}/{:010}-{:010}.{}{}",
                store_name,
                end_boundary_block,
                start_block,
                escape_trace_id(trace_id),
                PARTIAL_EXT
            )
        };

        Self {
            store_name: store_name.to_string(),
            range,
            trace_id: trace_id.to_string(),
            kind: FileKind::Partial,
            filename,
        }
    }

    /// Identity of a full snapshot `[start_block, end_boundary_block)`
    pub fn new_full(store_name: &str, start_block: u64, end_boundary_block: u64) -> Self {
        let range = BlockRange::new(start_block, end_boundary_block);
        let filename = format!(
            "{}/{:010}-{:010}{}",
            store_name, end_boundary_block, start_block, FULL_EXT
        );

        Self {
            store_name: store_name.to_string(),
            range,
            trace_id: String::new(),
            kind: FileKind::Full,
            filename,
        }
    }

    /// Recover a snapshot identity from its name.
    ///
    /// Only canonical names are accepted: re-encoding the parsed identity must
    /// reproduce `filename` exactly, escapes included.
    pub fn parse(filename: &str) -> Result<Self> {
        let invalid = |reason: &str| RangeKvError::InvalidFileName {
            filename: filename.to_string(),
            reason: reason.to_string(),
        };

        // The trace id is escaped, so the store name ends at the last `/`
        // before the range part
        let (store_name, base) = filename
            .rsplit_once('/')
            .ok_or_else(|| invalid("missing store name"))?;
        if store_name.is_empty() {
            return Err(invalid("empty store name"));
        }

        let (kind, range_part, trace_id) = if let Some(stem) = base.strip_suffix(PARTIAL_EXT) {
            match stem.split_once('.') {
                Some((range_part, escaped)) => {
                    let trace_id =
                        unescape_trace_id(escaped).ok_or_else(|| invalid("bad trace id escape"))?;
                    (FileKind::Partial, range_part, trace_id)
                }
                None => (FileKind::Partial, stem, String::new()),
            }
        } else if let Some(stem) = base.strip_suffix(FULL_EXT) {
            (FileKind::Full, stem, String::new())
        } else {
            return Err(invalid("unknown extension"));
        };

        let (end, start) = range_part
            .split_once('-')
            .ok_or_else(|| invalid("missing block range"))?;
        let end: u64 = end.parse().map_err(|_| invalid("bad end block"))?;
        let start: u64 = start.parse().map_err(|_| invalid("bad start block"))?;
        if end < start {
            return Err(invalid("end block before start block"));
        }

        let info = match kind {
            FileKind::Partial => Self::new_partial(store_name, start, end, &trace_id),
            FileKind::Full => Self::new_full(store_name, start, end),
        };
        if info.filename != filename {
            return Err(invalid("non-canonical name"));
        }
        Ok(info)
    }
}

fn escape_trace_id(trace_id: &str) -> String {
    let mut out = String::with_capacity(trace_id.len());
    for c in trace_id.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            c => out.push(c),
        }
    }
    out
}

/// Inverse of `escape_trace_id`; `None` on a malformed escape
fn unescape_trace_id(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            out.push(hi << 4 | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn hex_value(digit: u8) -> Option<u8> {
    HEX_DIGITS
        .iter()
        .position(|&d| d == digit.to_ascii_uppercase())
        .map(|p| p as u8)
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.store_name, self.range)
    }
}
