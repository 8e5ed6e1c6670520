//! Minimal Base32 (RFC 4648 alphabet, no padding) for TOTP secrets.

use thiserror::Error;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid base32 character: {0:?}")]
    InvalidCharacter(char),
}

/// Encode bytes as unpadded Base32.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits_left = 0u32;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits_left += 8;

        while bits_left >= 5 {
            let index = (buffer >> (bits_left - 5)) & 0x1f;
            out.push(ALPHABET[index as usize] as char);
            bits_left -= 5;
        }
    }

    if bits_left > 0 {
        let index = (buffer << (5 - bits_left)) & 0x1f;
        out.push(ALPHABET[index as usize] as char);
    }

    out
}

/// Decode unpadded Base32. Lowercase input is accepted; anything outside
/// the alphabet is an error.
pub fn decode(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(encoded.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits_left = 0u32;

    for ch in encoded.chars() {
        let upper = ch.to_ascii_uppercase();
        let value = match upper {
            'A'..='Z' => upper as u32 - 'A' as u32,
            '2'..='7' => upper as u32 - '2' as u32 + 26,
            _ => return Err(DecodeError::InvalidCharacter(ch)),
        };

        buffer = (buffer << 5) | value;
        bits_left += 5;

        if bits_left >= 8 {
            out.push(((buffer >> (bits_left - 8)) & 0xff) as u8);
            bits_left -= 8;
        }
    }

    Ok(out)
}
