use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

use crate::codec::formatting::{FormattingError, cb58_decode, cb58_encode};

#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid CB58 id '{value}': {source}")]
    Encoding {
        value: String,
        #[source]
        source: FormattingError,
    },
    #[error("id '{value}' decodes to {actual} bytes, expected {expected}")]
    Length {
        value: String,
        expected: usize,
        actual: usize,
    },
}

macro_rules! cb58_id {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            #[must_use]
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(bytes).ok().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&cb58_encode(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let bytes = cb58_decode(value).map_err(|source| IdParseError::Encoding {
                    value: value.to_owned(),
                    source,
                })?;
                Self::from_slice(&bytes).ok_or_else(|| IdParseError::Length {
                    value: value.to_owned(),
                    expected: $len,
                    actual: bytes.len(),
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(D::Error::custom)
            }
        }
    };
}

cb58_id!(
    /// 32-byte identifier used for transactions, assets and blockchains.
    Id,
    32
);

cb58_id!(
    /// 20-byte identifier used for addresses inside output owner lists.
    ShortId,
    20
);

impl Id {
    pub const EMPTY: Self = Self([0; 32]);

    /// Identifier derived by hashing `bytes`, as done for transaction IDs.
    #[must_use]
    pub fn from_digest(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }
}
