//! Content-address hashing for Arclight.
//!
//! Transaction hashes are SHA-256 over the canonical envelope bytes, so the
//! stored blob must be preserved verbatim for downstream hash verification.

use sha2::{Digest, Sha256};
use snafu::Snafu;

/// SHA-256 hash output (32 bytes).
pub type Hash = [u8; 32];

/// Compute SHA-256 hash of arbitrary data.
#[inline]
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Error parsing a caller-supplied transaction hash.
#[derive(Debug, Snafu)]
pub enum HashParseError {
    /// The hex string does not decode to exactly 32 bytes.
    #[snafu(display("unexpected hash length ({len})"))]
    UnexpectedLength {
        /// Length of the supplied string.
        len: usize,
    },

    /// The string contains non-hex characters.
    #[snafu(display("incorrect hash: {source}"))]
    InvalidHex {
        /// The underlying hex error.
        source: hex::FromHexError,
    },
}

/// Parses a hex-encoded transaction hash.
///
/// The input must decode to exactly 32 bytes; anything else is rejected
/// before touching the store.
pub fn parse_tx_hash(input: &str) -> Result<Hash, HashParseError> {
    if input.len() != 64 {
        return Err(HashParseError::UnexpectedLength { len: input.len() });
    }
    let mut hash = Hash::default();
    hex::decode_to_slice(input, &mut hash).map_err(|source| HashParseError::InvalidHex { source })?;
    Ok(hash)
}
