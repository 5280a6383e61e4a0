//! Binary codec for the subset of asset-chain structures the framework builds
//! or inspects offline: UTXOs, secp256k1 transfer inputs/outputs, base
//! transactions and their credentials.
//!
//! Every structure is prefixed with the codec version and uses big-endian
//! integers; variable-length lists carry a `u32` length prefix.

pub mod formatting;
mod tx;
mod utxo;

use bytes::{Buf as _, BufMut as _, BytesMut};
use thiserror::Error;
pub use tx::{BaseTx, Credential, SignedTx, TransferableInput, TransferableOutput};
pub use utxo::{TransferOutput, Utxo};

use crate::ids::{Id, ShortId};

pub const CODEC_VERSION: u16 = 0;
pub const BASE_TX_TYPE_ID: u32 = 0;
pub const SECP256K1_TRANSFER_INPUT_TYPE_ID: u32 = 5;
pub const SECP256K1_TRANSFER_OUTPUT_TYPE_ID: u32 = 7;
pub const SECP256K1_CREDENTIAL_TYPE_ID: u32 = 9;
pub const SIGNATURE_LEN: usize = 65;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of input while reading {field} (needed {needed} bytes, {remaining} left)")]
    UnexpectedEof {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("unsupported codec version {0}")]
    Version(u16),
    #[error("unexpected type id {found} for {field} (expected {expected})")]
    TypeId {
        field: &'static str,
        expected: u32,
        found: u32,
    },
    #[error("{0} trailing bytes after decoding")]
    TrailingBytes(usize),
}

pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn need(&self, field: &'static str, needed: usize) -> Result<(), CodecError> {
        if self.buf.len() < needed {
            return Err(CodecError::UnexpectedEof {
                field,
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn u16(&mut self, field: &'static str) -> Result<u16, CodecError> {
        self.need(field, 2)?;
        Ok(self.buf.get_u16())
    }

    pub(crate) fn u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        self.need(field, 4)?;
        Ok(self.buf.get_u32())
    }

    pub(crate) fn u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
        self.need(field, 8)?;
        Ok(self.buf.get_u64())
    }

    pub(crate) fn array<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<[u8; N], CodecError> {
        self.need(field, N)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    pub(crate) fn bytes(&mut self, field: &'static str, len: usize) -> Result<Vec<u8>, CodecError> {
        self.need(field, len)?;
        let out = self.buf[..len].to_vec();
        self.buf.advance(len);
        Ok(out)
    }

    pub(crate) fn id(&mut self, field: &'static str) -> Result<Id, CodecError> {
        self.array::<32>(field).map(Id::new)
    }

    pub(crate) fn short_id(&mut self, field: &'static str) -> Result<ShortId, CodecError> {
        self.array::<20>(field).map(ShortId::new)
    }

    /// Reads a `u32` list length, rejecting lengths that cannot fit in the
    /// remaining input given the minimum element size.
    pub(crate) fn len(&mut self, field: &'static str, min_elem: usize) -> Result<usize, CodecError> {
        let len = self.u32(field)? as usize;
        self.need(field, len.saturating_mul(min_elem))?;
        Ok(len)
    }

    pub(crate) fn version(&mut self) -> Result<(), CodecError> {
        match self.u16("codec version")? {
            CODEC_VERSION => Ok(()),
            other => Err(CodecError::Version(other)),
        }
    }

    pub(crate) fn expect_type(&mut self, field: &'static str, expected: u32) -> Result<(), CodecError> {
        let found = self.u32(field)?;
        if found != expected {
            return Err(CodecError::TypeId {
                field,
                expected,
                found,
            });
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<(), CodecError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes(self.buf.len()))
        }
    }
}

pub(crate) fn put_len(buf: &mut BytesMut, len: usize) {
    buf.put_u32(u32::try_from(len).unwrap_or(u32::MAX));
}
