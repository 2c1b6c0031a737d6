//! Pocket transaction encoding
//!
//! The signed bytes are a compact JSON sign doc with sorted keys; the
//! submitted bytes are a length-delimited protobuf `ProtoStdTx`.

#![allow(missing_docs)] // Proto fields don't need individual docs

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use teller_core::{Error, Result};

/// Amino type of a send message
pub const MSG_SEND_TYPE: &str = "pos/Send";

/// Protobuf type URL of a send message
pub const MSG_SEND_TYPE_URL: &str = "/x.nodes.MsgSend";

#[derive(Clone, PartialEq, Message)]
pub struct ProtoAny {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoCoin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoMsgSend {
    #[prost(bytes = "vec", tag = "1")]
    pub from_address: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub to_address: Vec<u8>,
    #[prost(string, tag = "3")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoStdSignature {
    #[prost(bytes = "vec", tag = "1")]
    pub public_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoStdTx {
    #[prost(message, optional, tag = "1")]
    pub msg: Option<ProtoAny>,
    #[prost(message, repeated, tag = "2")]
    pub fee: Vec<ProtoCoin>,
    #[prost(message, optional, tag = "3")]
    pub signature: Option<ProtoStdSignature>,
    #[prost(string, tag = "4")]
    pub memo: String,
    #[prost(int64, tag = "5")]
    pub entropy: i64,
}

/// Fee entry as it appears in the sign doc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCoin {
    pub amount: String,
    pub denom: String,
}

/// Message in both encodings
#[derive(Debug, Clone)]
pub struct PocketMsg {
    /// Amino JSON `{"type", "value"}`
    pub json: Value,
    /// Protobuf Any
    pub proto: ProtoAny,
}

impl PocketMsg {
    /// Send message
    pub fn send(from: &str, to: &str, amount: u128) -> Result<Self> {
        let from_bytes = hex::decode(from)
            .map_err(|e| Error::InvalidArgument(format!("invalid sender address: {}", e)))?;
        let to_bytes = hex::decode(to)
            .map_err(|e| Error::InvalidArgument(format!("invalid recipient address: {}", e)))?;

        let mut value = Map::new();
        value.insert("amount".to_string(), Value::String(amount.to_string()));
        value.insert("from_address".to_string(), Value::String(from.to_string()));
        value.insert("to_address".to_string(), Value::String(to.to_string()));

        let mut json = Map::new();
        json.insert("type".to_string(), Value::String(MSG_SEND_TYPE.to_string()));
        json.insert("value".to_string(), Value::Object(value));

        let proto = ProtoMsgSend {
            from_address: from_bytes,
            to_address: to_bytes,
            amount: amount.to_string(),
        };

        Ok(Self {
            json: Value::Object(json),
            proto: ProtoAny {
                type_url: MSG_SEND_TYPE_URL.to_string(),
                value: proto.encode_to_vec(),
            },
        })
    }
}

#[derive(Serialize)]
struct StdSignDoc<'a> {
    chain_id: &'a str,
    entropy: String,
    fee: &'a [FeeCoin],
    memo: &'a str,
    msg: Value,
}

/// Bytes that get signed
pub fn sign_doc_bytes(
    chain_id: &str,
    entropy: i64,
    fee: &[FeeCoin],
    memo: &str,
    msg: &Value,
) -> Result<Vec<u8>> {
    let doc = StdSignDoc {
        chain_id,
        entropy: entropy.to_string(),
        fee,
        memo,
        msg: sorted(msg),
    };
    Ok(serde_json::to_vec(&doc)?)
}

/// Signed transaction bytes for `/v1/client/rawtx`
pub fn encode_signed_tx(
    msg: &PocketMsg,
    fee: &[FeeCoin],
    public_key: [u8; 32],
    signature: [u8; 64],
    memo: &str,
    entropy: i64,
) -> Vec<u8> {
    let tx = ProtoStdTx {
        msg: Some(msg.proto.clone()),
        fee: fee
            .iter()
            .map(|c| ProtoCoin {
                denom: c.denom.clone(),
                amount: c.amount.clone(),
            })
            .collect(),
        signature: Some(ProtoStdSignature {
            public_key: public_key.to_vec(),
            signature: signature.to_vec(),
        }),
        memo: memo.to_string(),
        entropy,
    };
    tx.encode_length_delimited_to_vec()
}

/// Random non-negative entropy
pub fn random_entropy() -> i64 {
    (rand::random::<u64>() >> 1) as i64
}

// Rebuild objects with keys inserted in sorted order, whatever map type serde_json uses.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
