//! Byte encodings used on the wire: base32 for addresses and transaction
//! ids, base64 for opaque byte fields.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Unpadded RFC 4648 base32.
pub mod base32 {
    const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

    pub fn encode(bytes: &[u8]) -> String {
        let mut out = String::with_capacity((bytes.len() * 8 + 4) / 5);
        let mut buffer: u32 = 0;
        let mut bits: u32 = 0;

        for &byte in bytes {
            buffer = ((buffer << 8) | u32::from(byte)) & 0xffff;
            bits += 8;
            while bits >= 5 {
                bits -= 5;
                out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
            }
        }
        if bits > 0 {
            out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
        }
        out
    }

    /// Decode, rejecting characters outside the alphabet and non-zero
    /// trailing bits.
    pub fn decode(input: &str) -> Option<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len() * 5 / 8);
        let mut buffer: u32 = 0;
        let mut bits: u32 = 0;

        for c in input.bytes() {
            let value = match c {
                b'A'..=b'Z' => c - b'A',
                b'2'..=b'7' => c - b'2' + 26,
                _ => return None,
            };
            buffer = ((buffer << 5) | u32::from(value)) & 0xffff;
            bits += 5;
            if bits >= 8 {
                bits -= 8;
                out.push(((buffer >> bits) & 0xff) as u8);
            }
        }
        if bits > 0 && buffer & ((1 << bits) - 1) != 0 {
            return None;
        }
        Some(out)
    }
}

pub fn encode_base64(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(input: &str) -> Option<Vec<u8>> {
    STANDARD.decode(input.trim()).ok()
}

/// serde adapter for `Vec<u8>` fields carried as base64 strings.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(bytes: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// serde adapter for `Option<Vec<u8>>` fields carried as base64 strings.
pub mod base64_opt {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| {
                STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base32_known_vector() {
        assert_eq!(base32::encode(b"foobar"), "MZXW6YTBOI");
        assert_eq!(base32::decode("MZXW6YTBOI").unwrap(), b"foobar");
    }

    #[test]
    fn test_base32_rejects_bad_input() {
        assert!(base32::decode("mzxw6").is_none());
        assert!(base32::decode("MZXW1").is_none());
        // "MZ" leaves two set trailing bits after the first byte
        assert!(base32::decode("MZ").is_none());
    }

    #[test]
    fn test_base32_lengths() {
        assert_eq!(base32::encode(&[0u8; 36]).len(), 58);
        assert_eq!(base32::encode(&[0u8; 32]).len(), 52);
    }

    #[test]
    fn test_base64_helpers() {
        let encoded = encode_base64(b"note");
        assert_eq!(decode_base64(&encoded).unwrap(), b"note");
        assert!(decode_base64("***").is_none());
    }
}
