//! ERC-20 call data

use crate::encoding::decode_hex;
use teller_core::{Error, Result};

/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

fn word_from_address(address: &[u8; 20]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

fn word_from_u128(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Call data for `balanceOf(owner)`
pub fn balance_of_data(owner: &[u8; 20]) -> Vec<u8> {
    let mut data = BALANCE_OF_SELECTOR.to_vec();
    data.extend_from_slice(&word_from_address(owner));
    data
}

/// Call data for `transfer(to, amount)`
pub fn transfer_data(to: &[u8; 20], amount: u128) -> Vec<u8> {
    let mut data = TRANSFER_SELECTOR.to_vec();
    data.extend_from_slice(&word_from_address(to));
    data.extend_from_slice(&word_from_u128(amount));
    data
}

/// First uint256 word of an `eth_call` result
pub fn decode_uint256(result: &str) -> Result<u128> {
    let bytes = decode_hex(result)
        .map_err(|e| Error::NetworkRequestFailed(format!("eth_call result is not hex: {}", e)))?;
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() < 32 {
        return Err(Error::NetworkRequestFailed(format!(
            "eth_call result too short: {} bytes",
            bytes.len()
        )));
    }
    let word = &bytes[..32];
    if word[..16].iter().any(|b| *b != 0) {
        return Err(Error::NetworkRequestFailed(
            "token balance exceeds 128 bits".to_string(),
        ));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_layout() {
        let data = transfer_data(&[0x11; 20], 1000);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(hex::encode(&data[..4]), "a9059cbb");
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], &[0x11; 20]);
        assert_eq!(hex::encode(&data[36..]), format!("{:064x}", 1000));
    }

    #[test]
    fn test_balance_of_layout() {
        let data = balance_of_data(&[0x22; 20]);
        assert_eq!(hex::encode(&data[..4]), "70a08231");
        assert_eq!(data.len(), 36);
    }

    #[test]
    fn test_decode_uint256() {
        assert_eq!(decode_uint256(&format!("0x{:064x}", 42)).unwrap(), 42);
        assert_eq!(decode_uint256("0x").unwrap(), 0);
        assert!(decode_uint256("0x01").is_err());
        assert!(decode_uint256(&format!("0x01{}", "0".repeat(62))).is_err());
    }
}
