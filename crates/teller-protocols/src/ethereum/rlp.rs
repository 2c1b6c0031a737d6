//! Recursive length prefix encoding

/// Byte string
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        return vec![bytes[0]];
    }
    let mut out = encode_length(bytes.len(), 0x80);
    out.extend_from_slice(bytes);
    out
}

/// Unsigned integer, minimal big-endian
pub fn encode_uint(value: u128) -> Vec<u8> {
    encode_bytes(trim_leading_zeros(&value.to_be_bytes()))
}

/// Big-endian integer bytes with leading zeros stripped (signature `r`, `s`)
pub fn encode_uint_bytes(bytes: &[u8]) -> Vec<u8> {
    encode_bytes(trim_leading_zeros(bytes))
}

/// List of already-encoded items
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len = items.iter().map(Vec::len).sum();
    let mut out = encode_length(payload_len, 0xc0);
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

fn encode_length(len: usize, offset: u8) -> Vec<u8> {
    if len < 56 {
        return vec![offset + len as u8];
    }
    let len_bytes = len.to_be_bytes();
    let trimmed = trim_leading_zeros(&len_bytes);
    let mut out = Vec::with_capacity(1 + trimmed.len() + len);
    out.push(offset + 55 + trimmed.len() as u8);
    out.extend_from_slice(trimmed);
    out
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
