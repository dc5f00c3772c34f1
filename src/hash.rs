//! Hash computation for cross-chain transfer IDs
//!
//! Transfer IDs are produced by transport modules; this module provides the
//! reference keccak256 construction modules use so that the same transfer is
//! identified identically on both sides of a bridge.

use tiny_keccak::{Hasher, Keccak};

use crate::types::{ChainId, TransferId};

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Compute a transfer ID from routing parameters.
///
/// Packed layout (no padding between fields):
/// `srcChain (4) || destChain (4) || recipient (32) || amount (32, BE) || nonce (8, BE)`
pub fn compute_transfer_id(
    src_chain: ChainId,
    dest_chain: ChainId,
    recipient: &[u8; 32],
    amount: u128,
    nonce: u64,
) -> TransferId {
    // 4 + 4 + 32 + 32 + 8 = 80 bytes
    let mut data = [0u8; 80];

    data[0..4].copy_from_slice(src_chain.as_bytes());
    data[4..8].copy_from_slice(dest_chain.as_bytes());
    data[8..40].copy_from_slice(recipient);

    // amount as uint256 (32 bytes, big-endian)
    data[40 + 16..72].copy_from_slice(&amount.to_be_bytes());

    // nonce as uint64 (8 bytes, big-endian)
    data[72..80].copy_from_slice(&nonce.to_be_bytes());

    TransferId(keccak256(&data))
}

/// Left-pad a string recipient into a 32-byte account field.
///
/// Convenience for modules whose recipients are shorter than 32 bytes;
/// longer inputs are hashed down instead of truncated.
pub fn account_bytes32(recipient: &str) -> [u8; 32] {
    let raw = recipient.as_bytes();
    if raw.len() > 32 {
        return keccak256(raw);
    }
    let mut out = [0u8; 32];
    out[32 - raw.len()..].copy_from_slice(raw);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_known_vector() {
        let result = keccak256(b"hello");
        assert_eq!(
            format!("0x{}", hex::encode(result)),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_compute_transfer_id_deterministic() {
        let recipient = [0u8; 32];
        let a = compute_transfer_id(
            ChainId::from_u32(1),
            ChainId::from_u32(2),
            &recipient,
            1_000_000,
            1,
        );
        let b = compute_transfer_id(
            ChainId::from_u32(1),
            ChainId::from_u32(2),
            &recipient,
            1_000_000,
            1,
        );
        assert_eq!(a, b);

        // Changing any field changes the id
        let c = compute_transfer_id(
            ChainId::from_u32(1),
            ChainId::from_u32(2),
            &recipient,
            1_000_000,
            2,
        );
        assert_ne!(a, c);
    }

    #[test]
    fn test_account_bytes32_short_input() {
        let packed = account_bytes32("abc");
        assert_eq!(&packed[29..], b"abc");
        assert!(packed[..29].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_account_bytes32_long_input_hashed() {
        let long = "x".repeat(40);
        let packed = account_bytes32(&long);
        assert_eq!(packed, keccak256(long.as_bytes()));
    }
}
