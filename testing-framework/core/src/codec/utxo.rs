use bytes::{BufMut as _, BytesMut};

use super::{CODEC_VERSION, CodecError, Reader, SECP256K1_TRANSFER_OUTPUT_TYPE_ID, put_len};
use crate::ids::{Id, ShortId};

/// A secp256k1 transfer output: `amount` spendable by `threshold` of
/// `addresses` once `locktime` has passed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferOutput {
    pub amount: u64,
    pub locktime: u64,
    pub threshold: u32,
    pub addresses: Vec<ShortId>,
}

impl TransferOutput {
    /// Output spendable by a single signature from `address`.
    #[must_use]
    pub fn single_owner(amount: u64, address: ShortId) -> Self {
        Self {
            amount,
            locktime: 0,
            threshold: 1,
            addresses: vec![address],
        }
    }

    pub(crate) fn write(&self, buf: &mut BytesMut) {
        buf.put_u32(SECP256K1_TRANSFER_OUTPUT_TYPE_ID);
        buf.put_u64(self.amount);
        buf.put_u64(self.locktime);
        buf.put_u32(self.threshold);
        put_len(buf, self.addresses.len());
        for address in &self.addresses {
            buf.put_slice(address.as_bytes());
        }
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        reader.expect_type("output type id", SECP256K1_TRANSFER_OUTPUT_TYPE_ID)?;
        let amount = reader.u64("output amount")?;
        let locktime = reader.u64("output locktime")?;
        let threshold = reader.u32("output threshold")?;
        let count = reader.len("output addresses", ShortId::LEN)?;
        let addresses = (0..count)
            .map(|_| reader.short_id("output address"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            amount,
            locktime,
            threshold,
            addresses,
        })
    }
}

/// An unspent output of a prior transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub tx_id: Id,
    pub output_index: u32,
    pub asset_id: Id,
    pub output: TransferOutput,
}

impl Utxo {
    #[must_use]
    pub const fn amount(&self) -> u64 {
        self.output.amount
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u16(CODEC_VERSION);
        buf.put_slice(self.tx_id.as_bytes());
        buf.put_u32(self.output_index);
        buf.put_slice(self.asset_id.as_bytes());
        self.output.write(&mut buf);
        buf.to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        reader.version()?;
        let tx_id = reader.id("utxo tx id")?;
        let output_index = reader.u32("utxo output index")?;
        let asset_id = reader.id("utxo asset id")?;
        let output = TransferOutput::read(&mut reader)?;
        reader.finish()?;
        Ok(Self {
            tx_id,
            output_index,
            asset_id,
            output,
        })
    }
}
