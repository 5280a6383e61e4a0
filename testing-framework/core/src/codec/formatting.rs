//! Text encodings used by node APIs for binary payloads.
//!
//! Both encodings append the last four bytes of the SHA-256 digest of the
//! payload as a checksum before rendering.

use sha2::{Digest as _, Sha256};
use thiserror::Error;

const CHECKSUM_LEN: usize = 4;
const HEX_PREFIX: &str = "0x";

#[derive(Debug, Error)]
pub enum FormattingError {
    #[error("invalid base58 payload: {0}")]
    Base58(#[from] bs58::decode::Error),
    #[error("invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("hex payload is missing the '{HEX_PREFIX}' prefix")]
    MissingHexPrefix,
    #[error("payload of {len} bytes is too short to carry a checksum")]
    TooShort { len: usize },
    #[error("checksum mismatch: expected {expected}, found {found}")]
    ChecksumMismatch { expected: String, found: String },
}

#[must_use]
pub fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    out
}

fn with_checksum(bytes: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    buf.extend_from_slice(bytes);
    buf.extend_from_slice(&checksum(bytes));
    buf
}

fn strip_checksum(mut raw: Vec<u8>) -> Result<Vec<u8>, FormattingError> {
    if raw.len() < CHECKSUM_LEN {
        return Err(FormattingError::TooShort { len: raw.len() });
    }
    let found = raw.split_off(raw.len() - CHECKSUM_LEN);
    let expected = checksum(&raw);
    if found != expected {
        return Err(FormattingError::ChecksumMismatch {
            expected: hex::encode(expected),
            found: hex::encode(found),
        });
    }
    Ok(raw)
}

#[must_use]
pub fn cb58_encode(bytes: &[u8]) -> String {
    bs58::encode(with_checksum(bytes)).into_string()
}

pub fn cb58_decode(encoded: &str) -> Result<Vec<u8>, FormattingError> {
    let raw = bs58::decode(encoded).into_vec()?;
    strip_checksum(raw)
}

#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    format!("{HEX_PREFIX}{}", hex::encode(with_checksum(bytes)))
}

pub fn hex_decode(encoded: &str) -> Result<Vec<u8>, FormattingError> {
    let body = encoded
        .strip_prefix(HEX_PREFIX)
        .ok_or(FormattingError::MissingHexPrefix)?;
    strip_checksum(hex::decode(body)?)
}
