//! EIP-712 typed structured data hashing

use super::keys::keccak256;
use crate::encoding::decode_hex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use teller_core::{Error, Result};

const DOMAIN_TYPE: &str = "EIP712Domain";

#[derive(Debug, Clone, Deserialize)]
struct Field {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypedData {
    #[serde(default)]
    types: HashMap<String, Vec<Field>>,
    primary_type: String,
    #[serde(default)]
    domain: Map<String, Value>,
    #[serde(default)]
    message: Value,
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidArgument(message.into())
}

/// Digest to sign: `keccak256(0x19 0x01 || domainSeparator || hashStruct(message))`
pub fn typed_data_hash(typed_data: &Value) -> Result<[u8; 32]> {
    let mut data: TypedData = serde_json::from_value(typed_data.clone())
        .map_err(|e| invalid(format!("invalid typed data: {}", e)))?;
    if !data.types.contains_key(DOMAIN_TYPE) {
        let inferred = infer_domain_type(&data.domain);
        data.types.insert(DOMAIN_TYPE.to_string(), inferred);
    }
    let encoder = Encoder { types: &data.types };

    let domain_separator = encoder.hash_struct(DOMAIN_TYPE, &Value::Object(data.domain.clone()))?;
    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(&domain_separator);
    if data.primary_type != DOMAIN_TYPE {
        preimage.extend_from_slice(&encoder.hash_struct(&data.primary_type, &data.message)?);
    }
    Ok(keccak256(&preimage))
}

fn infer_domain_type(domain: &Map<String, Value>) -> Vec<Field> {
    [
        ("name", "string"),
        ("version", "string"),
        ("chainId", "uint256"),
        ("verifyingContract", "address"),
        ("salt", "bytes32"),
    ]
    .into_iter()
    .filter(|(name, _)| domain.contains_key(*name))
    .map(|(name, kind)| Field {
        name: name.to_string(),
        kind: kind.to_string(),
    })
    .collect()
}

struct Encoder<'a> {
    types: &'a HashMap<String, Vec<Field>>,
}

impl Encoder<'_> {
    fn fields(&self, type_name: &str) -> Result<&[Field]> {
        self.types
            .get(type_name)
            .map(Vec::as_slice)
            .ok_or_else(|| invalid(format!("unknown struct type {}", type_name)))
    }

    fn collect_dependencies(&self, type_name: &str, found: &mut BTreeSet<String>) -> Result<()> {
        for field in self.fields(type_name)? {
            let base = base_type(&field.kind);
            if self.types.contains_key(base) && found.insert(base.to_string()) {
                self.collect_dependencies(base, found)?;
            }
        }
        Ok(())
    }

    /// `Primary(...)Dep1(...)Dep2(...)`, dependencies sorted by name
    fn encode_type(&self, type_name: &str) -> Result<String> {
        let mut dependencies = BTreeSet::new();
        self.collect_dependencies(type_name, &mut dependencies)?;
        dependencies.remove(type_name);

        let mut out = String::new();
        for name in std::iter::once(type_name).chain(dependencies.iter().map(String::as_str)) {
            let members: Vec<String> = self
                .fields(name)?
                .iter()
                .map(|f| format!("{} {}", f.kind, f.name))
                .collect();
            out.push_str(&format!("{}({})", name, members.join(",")));
        }
        Ok(out)
    }

    fn hash_struct(&self, type_name: &str, value: &Value) -> Result<[u8; 32]> {
        let object = value
            .as_object()
            .ok_or_else(|| invalid(format!("{} value must be an object", type_name)))?;
        let mut encoded = keccak256(self.encode_type(type_name)?.as_bytes()).to_vec();
        for field in self.fields(type_name)? {
            let member = object.get(&field.name).unwrap_or(&Value::Null);
            encoded.extend_from_slice(&self.encode_value(&field.kind, member)?);
        }
        Ok(keccak256(&encoded))
    }

    fn encode_value(&self, kind: &str, value: &Value) -> Result<[u8; 32]> {
        if let Some(element) = array_element_type(kind) {
            let items = value
                .as_array()
                .ok_or_else(|| invalid(format!("{} value must be an array", kind)))?;
            let mut concatenated = Vec::with_capacity(items.len() * 32);
            for item in items {
                concatenated.extend_from_slice(&self.encode_value(element, item)?);
            }
            return Ok(keccak256(&concatenated));
        }
        if self.types.contains_key(kind) {
            return self.hash_struct(kind, value);
        }
        if value.is_null() {
            return Err(invalid(format!("missing value for {}", kind)));
        }

        match kind {
            "string" => {
                let text = value
                    .as_str()
                    .ok_or_else(|| invalid("string value expected"))?;
                Ok(keccak256(text.as_bytes()))
            }
            "bytes" => Ok(keccak256(&bytes_value(value)?)),
            "bool" => {
                let flag = match value {
                    Value::Bool(b) => *b,
                    Value::String(s) => s == "true",
                    _ => return Err(invalid("bool value expected")),
                };
                let mut word = [0u8; 32];
                word[31] = u8::from(flag);
                Ok(word)
            }
            "address" => {
                let bytes = bytes_value(value)?;
                if bytes.len() != 20 {
                    return Err(invalid(format!("address must be 20 bytes, got {}", bytes.len())));
                }
                let mut word = [0u8; 32];
                word[12..].copy_from_slice(&bytes);
                Ok(word)
            }
            _ if kind.starts_with("bytes") => {
                let size: usize = kind[5..]
                    .parse()
                    .map_err(|_| invalid(format!("unknown type {}", kind)))?;
                let bytes = bytes_value(value)?;
                if size == 0 || size > 32 || bytes.len() > size {
                    return Err(invalid(format!("{} value has {} bytes", kind, bytes.len())));
                }
                let mut word = [0u8; 32];
                word[..bytes.len()].copy_from_slice(&bytes);
                Ok(word)
            }
            _ if kind.starts_with("uint") => integer_word(value, false),
            _ if kind.starts_with("int") => integer_word(value, true),
            _ => Err(invalid(format!("unknown type {}", kind))),
        }
    }
}

fn base_type(kind: &str) -> &str {
    kind.find('[').map_or(kind, |pos| &kind[..pos])
}

fn array_element_type(kind: &str) -> Option<&str> {
    if kind.ends_with(']') {
        kind.rfind('[').map(|pos| &kind[..pos])
    } else {
        None
    }
}

fn bytes_value(value: &Value) -> Result<Vec<u8>> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid("hex string expected"))?;
    decode_hex(text).map_err(|e| invalid(format!("invalid hex {:?}: {}", text, e)))
}

fn integer_word(value: &Value, signed: bool) -> Result<[u8; 32]> {
    let mut word = [0u8; 32];
    let negative = |n: i128, word: &mut [u8; 32]| {
        word[..16].copy_from_slice(&[0xff; 16]);
        word[16..].copy_from_slice(&n.to_be_bytes());
    };

    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                word[24..].copy_from_slice(&u.to_be_bytes());
            } else if let (true, Some(i)) = (signed, n.as_i64()) {
                negative(i128::from(i), &mut word);
            } else {
                return Err(invalid(format!("unsupported integer {}", n)));
            }
        }
        Value::String(s) if s.starts_with("0x") || s.starts_with("0X") => {
            let bytes = bytes_value(value)?;
            if bytes.len() > 32 {
                return Err(invalid(format!("integer {} exceeds 256 bits", s)));
            }
            word[32 - bytes.len()..].copy_from_slice(&bytes);
        }
        Value::String(s) => {
            if let Ok(u) = s.parse::<u128>() {
                word[16..].copy_from_slice(&u.to_be_bytes());
            } else if let (true, Ok(i)) = (signed, s.parse::<i128>()) {
                negative(i, &mut word);
            } else {
                return Err(invalid(format!("invalid integer {:?}", s)));
            }
        }
        _ => return Err(invalid("integer value expected")),
    }
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mail_example() -> Value {
        json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"},
                    {"name": "verifyingContract", "type": "address"}
                ],
                "Person": [
                    {"name": "name", "type": "string"},
                    {"name": "wallet", "type": "address"}
                ],
                "Mail": [
                    {"name": "from", "type": "Person"},
                    {"name": "to", "type": "Person"},
                    {"name": "contents", "type": "string"}
                ]
            },
            "primaryType": "Mail",
            "domain": {
                "name": "Ether Mail",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            },
            "message": {
                "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
                "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
                "contents": "Hello, Bob!"
            }
        })
    }

    fn parsed(value: &Value) -> TypedData {
        serde_json::from_value(value.clone()).unwrap()
    }

    #[test]
    fn test_encode_type_orders_dependencies() {
        let data = parsed(&mail_example());
        let encoder = Encoder { types: &data.types };
        assert_eq!(
            encoder.encode_type("Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
    }

    #[test]
    fn test_mail_hashes() {
        let example = mail_example();
        let data = parsed(&example);
        let encoder = Encoder { types: &data.types };

        let domain = encoder
            .hash_struct(DOMAIN_TYPE, &Value::Object(data.domain.clone()))
            .unwrap();
        assert_eq!(
            hex::encode(domain),
            "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );
        let message = encoder.hash_struct("Mail", &data.message).unwrap();
        assert_eq!(
            hex::encode(message),
            "c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
        );
        assert_eq!(
            hex::encode(typed_data_hash(&example).unwrap()),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
    }

    #[test]
    fn test_domain_type_inferred_when_absent() {
        let mut example = mail_example();
        example["types"]
            .as_object_mut()
            .unwrap()
            .remove(DOMAIN_TYPE);
        assert_eq!(
            hex::encode(typed_data_hash(&example).unwrap()),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
    }

    #[test]
    fn test_arrays_hash_concatenated_members() {
        let typed = json!({
            "types": {"Group": [{"name": "ids", "type": "uint256[]"}]},
            "primaryType": "Group",
            "domain": {"name": "Test"},
            "message": {"ids": [1, "2", "0x03"]}
        });
        let data = parsed(&typed);
        let encoder = Encoder { types: &data.types };
        let mut words = Vec::new();
        for n in 1u8..=3 {
            let mut word = [0u8; 32];
            word[31] = n;
            words.extend_from_slice(&word);
        }
        assert_eq!(
            encoder.encode_value("uint256[]", &data.message["ids"]).unwrap(),
            keccak256(&words)
        );
    }

    #[test]
    fn test_negative_int_is_twos_complement() {
        let word = integer_word(&json!(-1), true).unwrap();
        assert_eq!(word, [0xff; 32]);
        assert!(integer_word(&json!(-1), false).is_err());
    }

    #[test]
    fn test_missing_member_rejected() {
        let mut example = mail_example();
        example["message"].as_object_mut().unwrap().remove("contents");
        assert!(matches!(
            typed_data_hash(&example),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_primary_type_rejected() {
        let mut example = mail_example();
        example["primaryType"] = json!("Letter");
        assert!(typed_data_hash(&example).is_err());
    }
}
