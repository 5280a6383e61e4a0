use std::{fmt, str::FromStr};

use libsecp256k1::{Message, PublicKey, RecoveryId, SecretKey, Signature};
use sha2::{Digest as _, Sha256};
use testing_framework_config::constants::PRIVATE_KEY_PREFIX;
use thiserror::Error;

use crate::codec::{
    SIGNATURE_LEN,
    formatting::{FormattingError, cb58_decode, cb58_encode},
};

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("private key missing '{PRIVATE_KEY_PREFIX}' prefix")]
    MissingPrefix,
    #[error("problem parsing private key: {0}")]
    Encoding(#[from] FormattingError),
    #[error("invalid secp256k1 key material: {0}")]
    Secp256k1(#[from] libsecp256k1::Error),
}

/// secp256k1 private key as exported by the keystore.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        Ok(Self {
            secret: SecretKey::parse_slice(bytes)?,
        })
    }

    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(&self.secret)
    }

    /// Signs the SHA-256 digest of `payload`, returning `r || s || v`.
    #[must_use]
    pub fn sign(&self, payload: &[u8]) -> [u8; SIGNATURE_LEN] {
        let message = Message::parse(&Sha256::digest(payload).into());
        let (signature, recovery_id) = libsecp256k1::sign(&message, &self.secret);
        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&signature.serialize());
        out[64] = recovery_id.serialize();
        out
    }

    /// Recovers the public key that produced `signature` over `payload`.
    pub fn recover(
        payload: &[u8],
        signature: &[u8; SIGNATURE_LEN],
    ) -> Result<PublicKey, KeyError> {
        let message = Message::parse(&Sha256::digest(payload).into());
        let compact = Signature::parse_standard_slice(&signature[..64])?;
        let recovery_id = RecoveryId::parse(signature[64])?;
        Ok(libsecp256k1::recover(&message, &compact, &recovery_id)?)
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value
            .strip_prefix(PRIVATE_KEY_PREFIX)
            .ok_or(KeyError::MissingPrefix)?;
        Self::from_bytes(&cb58_decode(trimmed)?)
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PRIVATE_KEY_PREFIX}{}",
            cb58_encode(&self.secret.serialize())
        )
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}
