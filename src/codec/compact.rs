//! bincode snapshot format

use crate::error::{RangeKvError, Result};

use super::{Marshaller, StoreData, StoreDataRef};

/// serde + bincode marshaller
///
/// `StoreDataRef` and `StoreData` share a field layout, so a borrowed view
/// encodes to exactly what the owned type decodes from.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeMarshaller;

impl Marshaller for BincodeMarshaller {
    fn marshal(&self, data: StoreDataRef<'_>) -> Result<Vec<u8>> {
        bincode::serialize(&data).map_err(|e| RangeKvError::Marshal(e.to_string()))
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<(StoreData, u64)> {
        let data: StoreData =
            bincode::deserialize(bytes).map_err(|e| RangeKvError::Unmarshal(e.to_string()))?;
        let size = data.value_size();
        Ok((data, size))
    }
}
