use bytes::{BufMut as _, BytesMut};

use super::{
    BASE_TX_TYPE_ID, CODEC_VERSION, CodecError, Reader, SECP256K1_CREDENTIAL_TYPE_ID,
    SECP256K1_TRANSFER_INPUT_TYPE_ID, SIGNATURE_LEN, TransferOutput, Utxo, put_len,
};
use crate::{crypto::PrivateKey, ids::Id};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferableOutput {
    pub asset_id: Id,
    pub output: TransferOutput,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferableInput {
    pub tx_id: Id,
    pub output_index: u32,
    pub asset_id: Id,
    pub amount: u64,
    pub sig_indices: Vec<u32>,
}

impl TransferableInput {
    /// Spends `utxo` with a signature from its first owner.
    #[must_use]
    pub fn spending(utxo: &Utxo) -> Self {
        Self {
            tx_id: utxo.tx_id,
            output_index: utxo.output_index,
            asset_id: utxo.asset_id,
            amount: utxo.output.amount,
            sig_indices: vec![0],
        }
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_slice(self.tx_id.as_bytes());
        buf.put_u32(self.output_index);
        buf.put_slice(self.asset_id.as_bytes());
        buf.put_u32(SECP256K1_TRANSFER_INPUT_TYPE_ID);
        buf.put_u64(self.amount);
        put_len(buf, self.sig_indices.len());
        for index in &self.sig_indices {
            buf.put_u32(*index);
        }
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let tx_id = reader.id("input tx id")?;
        let output_index = reader.u32("input output index")?;
        let asset_id = reader.id("input asset id")?;
        reader.expect_type("input type id", SECP256K1_TRANSFER_INPUT_TYPE_ID)?;
        let amount = reader.u64("input amount")?;
        let count = reader.len("input signature indices", 4)?;
        let sig_indices = (0..count)
            .map(|_| reader.u32("input signature index"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tx_id,
            output_index,
            asset_id,
            amount,
            sig_indices,
        })
    }
}

/// Unsigned asset transfer: consumes `inputs`, produces `outputs`, and burns
/// the difference as fee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseTx {
    pub network_id: u32,
    pub blockchain_id: Id,
    pub outputs: Vec<TransferableOutput>,
    pub inputs: Vec<TransferableInput>,
    pub memo: Vec<u8>,
}

impl BaseTx {
    #[must_use]
    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.write(&mut buf);
        buf.to_vec()
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u16(CODEC_VERSION);
        buf.put_u32(BASE_TX_TYPE_ID);
        buf.put_u32(self.network_id);
        buf.put_slice(self.blockchain_id.as_bytes());
        put_len(buf, self.outputs.len());
        for output in &self.outputs {
            buf.put_slice(output.asset_id.as_bytes());
            output.output.write(buf);
        }
        put_len(buf, self.inputs.len());
        for input in &self.inputs {
            input.write(buf);
        }
        put_len(buf, self.memo.len());
        buf.put_slice(&self.memo);
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        reader.version()?;
        reader.expect_type("tx type id", BASE_TX_TYPE_ID)?;
        let network_id = reader.u32("network id")?;
        let blockchain_id = reader.id("blockchain id")?;
        let output_count = reader.len("outputs", 32)?;
        let outputs = (0..output_count)
            .map(|_| {
                Ok(TransferableOutput {
                    asset_id: reader.id("output asset id")?,
                    output: TransferOutput::read(reader)?,
                })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;
        let input_count = reader.len("inputs", 32)?;
        let inputs = (0..input_count)
            .map(|_| TransferableInput::read(reader))
            .collect::<Result<Vec<_>, _>>()?;
        let memo_len = reader.len("memo", 1)?;
        let memo = reader.bytes("memo", memo_len)?;
        Ok(Self {
            network_id,
            blockchain_id,
            outputs,
            inputs,
            memo,
        })
    }

    /// Signs every input with `key`, producing one credential per input.
    #[must_use]
    pub fn sign(self, key: &PrivateKey) -> SignedTx {
        let signature = key.sign(&self.unsigned_bytes());
        let credentials = self
            .inputs
            .iter()
            .map(|_| Credential {
                signatures: vec![signature],
            })
            .collect();
        SignedTx::new(self, credentials)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub signatures: Vec<[u8; SIGNATURE_LEN]>,
}

/// A base transaction together with its credentials and cached encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTx {
    unsigned: BaseTx,
    credentials: Vec<Credential>,
    bytes: Vec<u8>,
    id: Id,
}

impl SignedTx {
    #[must_use]
    pub fn new(unsigned: BaseTx, credentials: Vec<Credential>) -> Self {
        let mut buf = BytesMut::new();
        unsigned.write(&mut buf);
        put_len(&mut buf, credentials.len());
        for credential in &credentials {
            buf.put_u32(SECP256K1_CREDENTIAL_TYPE_ID);
            put_len(&mut buf, credential.signatures.len());
            for signature in &credential.signatures {
                buf.put_slice(signature);
            }
        }
        let bytes = buf.to_vec();
        let id = Id::from_digest(&bytes);
        Self {
            unsigned,
            credentials,
            bytes,
            id,
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let unsigned = BaseTx::read(&mut reader)?;
        let count = reader.len("credentials", 8)?;
        let credentials = (0..count)
            .map(|_| {
                reader.expect_type("credential type id", SECP256K1_CREDENTIAL_TYPE_ID)?;
                let sigs = reader.len("signatures", SIGNATURE_LEN)?;
                let signatures = (0..sigs)
                    .map(|_| reader.array::<SIGNATURE_LEN>("signature"))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Credential { signatures })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;
        reader.finish()?;
        Ok(Self {
            unsigned,
            credentials,
            bytes: bytes.to_vec(),
            id: Id::from_digest(bytes),
        })
    }

    #[must_use]
    pub const fn id(&self) -> Id {
        self.id
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[must_use]
    pub const fn unsigned(&self) -> &BaseTx {
        &self.unsigned
    }

    #[must_use]
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }
}
