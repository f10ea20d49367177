//! Codec Tests
//!
//! Tests verify:
//! - Both marshallers reproduce kv and prefixes exactly
//! - Reported size equals the sum of value lengths
//! - Encoding is deterministic
//! - The binary format rejects damaged input

use std::collections::BTreeMap;

use rangekv::codec::{
    new_marshaller, BinaryMarshaller, BincodeMarshaller, Marshaller, MarshallerKind, StoreData,
};
use rangekv::RangeKvError;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_data() -> StoreData {
    let mut kv = BTreeMap::new();
    kv.insert("alice".to_string(), b"100".to_vec());
    kv.insert("bob".to_string(), Vec::new());
    kv.insert("pair:0x01".to_string(), vec![0u8, 255, 7, 42]);
    kv.insert("ключ".to_string(), "значение".as_bytes().to_vec());

    StoreData {
        kv,
        delete_prefixes: vec!["old:".to_string(), "".to_string(), "tmp/".to_string()],
    }
}

fn all_marshallers() -> Vec<Box<dyn Marshaller>> {
    vec![Box::new(BinaryMarshaller), Box::new(BincodeMarshaller)]
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_preserves_content_and_size() {
    let data = sample_data();

    for marshaller in all_marshallers() {
        let bytes = marshaller.marshal(data.view()).unwrap();
        let (decoded, size) = marshaller.unmarshal(&bytes).unwrap();

        assert_eq!(decoded, data, "{:?}", marshaller);
        assert_eq!(size, data.value_size(), "{:?}", marshaller);
        assert_eq!(size, 3 + 4 + "значение".len() as u64);
    }
}

#[test]
fn test_round_trip_empty_state() {
    let data = StoreData::default();

    for marshaller in all_marshallers() {
        let bytes = marshaller.marshal(data.view()).unwrap();
        let (decoded, size) = marshaller.unmarshal(&bytes).unwrap();

        assert!(decoded.kv.is_empty());
        assert!(decoded.delete_prefixes.is_empty());
        assert_eq!(size, 0);
    }
}

#[test]
fn test_prefix_order_is_preserved() {
    let data = StoreData {
        kv: BTreeMap::new(),
        delete_prefixes: vec!["z".to_string(), "a".to_string(), "m".to_string()],
    };

    for marshaller in all_marshallers() {
        let bytes = marshaller.marshal(data.view()).unwrap();
        let (decoded, _) = marshaller.unmarshal(&bytes).unwrap();
        assert_eq!(decoded.delete_prefixes, vec!["z", "a", "m"]);
    }
}

#[test]
fn test_encoding_is_deterministic() {
    // Same state built in a different insertion order
    let mut kv = BTreeMap::new();
    for key in ["c", "a", "b"] {
        kv.insert(key.to_string(), key.as_bytes().to_vec());
    }
    let first = StoreData {
        kv,
        delete_prefixes: vec!["p".to_string()],
    };

    let mut kv = BTreeMap::new();
    for key in ["b", "c", "a"] {
        kv.insert(key.to_string(), key.as_bytes().to_vec());
    }
    let second = StoreData {
        kv,
        delete_prefixes: vec!["p".to_string()],
    };

    for marshaller in all_marshallers() {
        assert_eq!(
            marshaller.marshal(first.view()).unwrap(),
            marshaller.marshal(second.view()).unwrap()
        );
    }
}

// =============================================================================
// Binary Format Tests
// =============================================================================

#[test]
fn test_binary_header() {
    let bytes = BinaryMarshaller.marshal(sample_data().view()).unwrap();

    assert_eq!(&bytes[0..4], b"RKVS");
    assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 1);

    let mut count = [0u8; 8];
    count.copy_from_slice(&bytes[6..14]);
    assert_eq!(u64::from_le_bytes(count), 4);
}

#[test]
fn test_binary_detects_flipped_bit() {
    let mut bytes = BinaryMarshaller.marshal(sample_data().view()).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x01;

    let err = BinaryMarshaller.unmarshal(&bytes).unwrap_err();
    assert!(matches!(err, RangeKvError::Unmarshal(_)));
    assert!(err.to_string().contains("checksum"));
}

#[test]
fn test_binary_rejects_truncated_input() {
    let bytes = BinaryMarshaller.marshal(sample_data().view()).unwrap();

    for len in [0, 3, 17, bytes.len() - 1] {
        let result = BinaryMarshaller.unmarshal(&bytes[..len]);
        assert!(matches!(result, Err(RangeKvError::Unmarshal(_))), "len {}", len);
    }
}

#[test]
fn test_binary_rejects_wrong_magic() {
    let mut bytes = BinaryMarshaller.marshal(StoreData::default().view()).unwrap();
    bytes[0] = b'X';

    // Re-seal so only the magic is wrong
    let body_len = bytes.len() - 4;
    let crc = crc32fast::hash(&bytes[..body_len]);
    bytes[body_len..].copy_from_slice(&crc.to_le_bytes());

    let err = BinaryMarshaller.unmarshal(&bytes).unwrap_err();
    assert!(err.to_string().contains("magic"));
}

#[test]
fn test_bincode_rejects_garbage() {
    let result = BincodeMarshaller.unmarshal(&[0xff; 3]);
    assert!(matches!(result, Err(RangeKvError::Unmarshal(_))));
}

// =============================================================================
// Kind Selection Tests
// =============================================================================

#[test]
fn test_marshaller_kind_from_str() {
    assert_eq!("binary".parse::<MarshallerKind>().unwrap(), MarshallerKind::Binary);
    assert_eq!("Bincode".parse::<MarshallerKind>().unwrap(), MarshallerKind::Bincode);
    assert!("json".parse::<MarshallerKind>().is_err());
    assert_eq!(MarshallerKind::default(), MarshallerKind::Binary);
}

#[test]
fn test_kinds_are_not_interchangeable() {
    let data = sample_data();
    let binary = new_marshaller(MarshallerKind::Binary);
    let bincode = new_marshaller(MarshallerKind::Bincode);

    let bytes = bincode.marshal(data.view()).unwrap();
    assert!(binary.unmarshal(&bytes).is_err());
}
