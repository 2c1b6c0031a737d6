//! Legacy (EIP-155) and EIP-1559 transactions

use super::keys::{keccak256, EthereumKey};
use super::rlp::{encode_bytes, encode_list, encode_uint, encode_uint_bytes};
use teller_core::Result;

/// EIP-2718 type byte for EIP-1559 transactions
pub const EIP1559_TX_TYPE: u8 = 0x02;

/// Pre-London transaction with replay protection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    /// EIP-155 chain id
    pub chain_id: u64,
    /// Sender nonce
    pub nonce: u64,
    /// Gas price, wei
    pub gas_price: u128,
    /// Gas limit
    pub gas_limit: u64,
    /// `None` creates a contract
    pub to: Option<[u8; 20]>,
    /// Value, wei
    pub value: u128,
    /// Call data
    pub data: Vec<u8>,
}

/// Dynamic-fee transaction with an empty access list
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Eip1559Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub to: Option<[u8; 20]>,
    pub value: u128,
    pub data: Vec<u8>,
}

/// Either transaction kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EthereumTransaction {
    /// EIP-155
    Legacy(LegacyTransaction),
    /// Type 2
    Eip1559(Eip1559Transaction),
}

fn encode_to(to: &Option<[u8; 20]>) -> Vec<u8> {
    match to {
        Some(address) => encode_bytes(address),
        None => encode_bytes(&[]),
    }
}

fn signature_fields(signature: &[u8; 64]) -> [Vec<u8>; 2] {
    [
        encode_uint_bytes(&signature[..32]),
        encode_uint_bytes(&signature[32..]),
    ]
}

impl LegacyTransaction {
    fn base_fields(&self) -> Vec<Vec<u8>> {
        vec![
            encode_uint(u128::from(self.nonce)),
            encode_uint(self.gas_price),
            encode_uint(u128::from(self.gas_limit)),
            encode_to(&self.to),
            encode_uint(self.value),
            encode_bytes(&self.data),
        ]
    }

    /// RLP of the EIP-155 signing payload
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = self.base_fields();
        fields.push(encode_uint(u128::from(self.chain_id)));
        fields.push(encode_uint(0));
        fields.push(encode_uint(0));
        encode_list(&fields)
    }

    /// Keccak of [`Self::signing_payload`]
    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Signed raw transaction, `v = recovery_id + chain_id * 2 + 35`
    pub fn sign(&self, key: &EthereumKey) -> Result<Vec<u8>> {
        let (recovery_id, signature) = key.sign_digest(&self.signing_hash())?;
        let v = u128::from(recovery_id) + u128::from(self.chain_id) * 2 + 35;

        let mut fields = self.base_fields();
        fields.push(encode_uint(v));
        fields.extend(signature_fields(&signature));
        Ok(encode_list(&fields))
    }
}

impl Eip1559Transaction {
    fn base_fields(&self) -> Vec<Vec<u8>> {
        vec![
            encode_uint(u128::from(self.chain_id)),
            encode_uint(u128::from(self.nonce)),
            encode_uint(self.max_priority_fee_per_gas),
            encode_uint(self.max_fee_per_gas),
            encode_uint(u128::from(self.gas_limit)),
            encode_to(&self.to),
            encode_uint(self.value),
            encode_bytes(&self.data),
            encode_list(&[]),
        ]
    }

    fn typed(payload: Vec<u8>) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 1);
        out.push(EIP1559_TX_TYPE);
        out.extend(payload);
        out
    }

    /// Keccak of `0x02 || rlp(fields)`
    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&Self::typed(encode_list(&self.base_fields())))
    }

    /// Signed envelope `0x02 || rlp(fields, y_parity, r, s)`
    pub fn sign(&self, key: &EthereumKey) -> Result<Vec<u8>> {
        let (recovery_id, signature) = key.sign_digest(&self.signing_hash())?;

        let mut fields = self.base_fields();
        fields.push(encode_uint(u128::from(recovery_id)));
        fields.extend(signature_fields(&signature));
        Ok(Self::typed(encode_list(&fields)))
    }
}

impl EthereumTransaction {
    /// Signed raw bytes
    pub fn sign(&self, key: &EthereumKey) -> Result<Vec<u8>> {
        match self {
            Self::Legacy(tx) => tx.sign(key),
            Self::Eip1559(tx) => tx.sign(key),
        }
    }
}
