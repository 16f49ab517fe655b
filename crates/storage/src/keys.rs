//! Key encoding for the retention index.

use arclight_types::Hash;

/// Encode a retention-index key.
///
/// Format: {ledger_sequence:4BE}{hash:32}. Big-endian sequence keeps the
/// index sorted by owning ledger, so a single prefix range covers a trim.
pub fn tx_by_ledger_key(sequence: u32, hash: &Hash) -> [u8; 36] {
    let mut key = [0u8; 36];
    key[0..4].copy_from_slice(&sequence.to_be_bytes());
    key[4..36].copy_from_slice(hash);
    key
}

/// The smallest key with the given sequence; keys of all earlier ledgers
/// sort strictly below it.
pub fn sequence_floor_key(sequence: u32) -> [u8; 36] {
    tx_by_ledger_key(sequence, &[0u8; 32])
}

/// The hash portion of a retention-index key.
pub fn hash_of_key(key: &[u8]) -> Option<Hash> {
    let bytes: [u8; 32] = key.get(4..36)?.try_into().ok()?;
    Some(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_sort_by_sequence_first() {
        let low = tx_by_ledger_key(5, &[0xFF; 32]);
        let high = tx_by_ledger_key(6, &[0x00; 32]);
        assert!(low < high);
        assert!(sequence_floor_key(6) <= high);
        assert!(low < sequence_floor_key(6));
    }

    #[test]
    fn test_hash_roundtrip() {
        let hash = [0xAB; 32];
        let key = tx_by_ledger_key(9, &hash);
        assert_eq!(hash_of_key(&key).unwrap(), hash);
        assert!(hash_of_key(&key[..10]).is_none());
    }
}
