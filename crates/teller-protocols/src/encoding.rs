//! Hex, quantity and amount helpers

use serde_json::Value;
use teller_core::{Error, Result};
use zeroize::Zeroizing;

/// Strip an optional `0x` prefix
pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode hex with an optional `0x` prefix
pub fn decode_hex(s: &str) -> std::result::Result<Vec<u8>, hex::FromHexError> {
    hex::decode(strip_0x(s.trim()))
}

/// Parse a 32-byte hex private key
pub fn parse_secret_32(private_key: &str) -> Result<Zeroizing<[u8; 32]>> {
    let bytes = Zeroizing::new(
        decode_hex(private_key)
            .map_err(|e| Error::InvalidPrivateKey(format!("not hex: {}", e)))?,
    );
    if bytes.len() != 32 {
        return Err(Error::InvalidPrivateKey(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parse the hex form of a 64-byte BIP-39 seed
pub fn parse_seed_hex(seed: &str) -> Result<Zeroizing<[u8; 64]>> {
    let bytes = Zeroizing::new(
        decode_hex(seed).map_err(|e| Error::KeyDerivation(format!("seed is not hex: {}", e)))?,
    );
    if bytes.len() != 64 {
        return Err(Error::KeyDerivation(format!(
            "seed must be 64 bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// JSON-RPC quantity (`0x`-prefixed, no leading zeros)
pub fn to_quantity(value: u128) -> String {
    format!("{:#x}", value)
}

/// Parse a hex quantity
pub fn parse_quantity(s: &str) -> Result<u128> {
    let digits = strip_0x(s.trim());
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| Error::NetworkRequestFailed(format!("invalid quantity {:?}: {}", s, e)))
}

/// Amount from a JSON number, decimal string, or `0x` hex string
pub fn amount_from_json(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) if s.starts_with("0x") || s.starts_with("0X") => {
            u128::from_str_radix(strip_0x(s), 16).ok()
        }
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Message bytes for personal signing: `0x` hex is decoded, anything else is UTF-8
pub fn message_bytes(data: &str) -> Vec<u8> {
    if data.starts_with("0x") {
        if let Ok(bytes) = hex::decode(&data[2..]) {
            return bytes;
        }
    }
    data.as_bytes().to_vec()
}

/// Parse a decimal amount in `unit`-scaled fixed point, e.g. gwei `"1.5"` with 9 decimals
pub fn parse_decimal(s: &str, decimals: u32) -> Option<u128> {
    let s = s.trim();
    let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };

    // Digits past `decimals` are truncated
    let mut frac_digits: String = fraction.chars().take(decimals as usize).collect();
    while frac_digits.len() < decimals as usize {
        frac_digits.push('0');
    }
    let frac: u128 = if frac_digits.is_empty() { 0 } else { frac_digits.parse().ok()? };

    whole
        .checked_mul(10u128.pow(decimals))?
        .checked_add(frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quantities() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(1024), "0x400");
        assert_eq!(parse_quantity("0x400").unwrap(), 1024);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_amount_from_json() {
        assert_eq!(amount_from_json(&json!(42)), Some(42));
        assert_eq!(amount_from_json(&json!("1000000000000000000000")), Some(10u128.pow(21)));
        assert_eq!(amount_from_json(&json!("0x10")), Some(16));
        assert_eq!(amount_from_json(&json!(null)), None);
    }

    #[test]
    fn test_parse_decimal_gwei() {
        assert_eq!(parse_decimal("1.5", 9), Some(1_500_000_000));
        assert_eq!(parse_decimal("16", 9), Some(16_000_000_000));
        assert_eq!(parse_decimal("0.0000000019", 9), Some(1));
        assert_eq!(parse_decimal(".5", 9), Some(500_000_000));
        assert_eq!(parse_decimal("abc", 9), None);
    }

    #[test]
    fn test_parse_decimal_checks_every_digit() {
        assert_eq!(parse_decimal("1.0000000001", 9), Some(1_000_000_000));
        assert_eq!(parse_decimal("1.0000000001zz", 9), None);
        assert_eq!(parse_decimal("1.5.1", 9), None);
        assert_eq!(parse_decimal("+1", 9), None);
        assert_eq!(parse_decimal("1.-5", 9), None);
    }

    #[test]
    fn test_secret_parsing() {
        let key = "0x".to_string() + &"11".repeat(32);
        assert_eq!(parse_secret_32(&key).unwrap()[0], 0x11);
        assert!(matches!(parse_secret_32("abcd"), Err(Error::InvalidPrivateKey(_))));
        assert!(matches!(parse_secret_32("zz"), Err(Error::InvalidPrivateKey(_))));
    }

    #[test]
    fn test_message_bytes() {
        assert_eq!(message_bytes("0x6869"), b"hi".to_vec());
        assert_eq!(message_bytes("hi"), b"hi".to_vec());
        assert_eq!(message_bytes("0xnothex"), b"0xnothex".to_vec());
    }
}
