//! Ledger account addresses.
//!
//! The text form is the unpadded base32 encoding of the 32-byte public key
//! followed by a 4-byte checksum (the last four bytes of its SHA-512/256
//! digest), always 58 characters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};

use crate::encoding::base32;
use crate::error::{IntentError, Result};

/// Length of an encoded address.
pub const ADDRESS_LENGTH: usize = 58;

const PUBLIC_KEY_LENGTH: usize = 32;
const CHECKSUM_LENGTH: usize = 4;

/// A checksum-validated ledger account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; PUBLIC_KEY_LENGTH]);

impl Address {
    /// Address for a raw ed25519 public key.
    pub fn from_public_key(key: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(key)
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Parse an address, naming `field` in the error.
    pub fn parse_field(field: &str, value: &str) -> Result<Self> {
        let invalid = || IntentError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        };

        let trimmed = value.trim();
        if trimmed.len() != ADDRESS_LENGTH {
            return Err(invalid());
        }

        let decoded = base32::decode(trimmed).ok_or_else(invalid)?;
        if decoded.len() != PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH {
            return Err(invalid());
        }

        let (key_bytes, checksum) = decoded.split_at(PUBLIC_KEY_LENGTH);
        let mut key = [0u8; PUBLIC_KEY_LENGTH];
        key.copy_from_slice(key_bytes);

        if checksum != Self::checksum(&key) {
            return Err(invalid());
        }

        Ok(Self(key))
    }

    /// Returns true if `value` is a well-formed address.
    pub fn is_valid(value: &str) -> bool {
        Self::parse_field("address", value).is_ok()
    }

    fn checksum(key: &[u8; PUBLIC_KEY_LENGTH]) -> [u8; CHECKSUM_LENGTH] {
        let digest = Sha512_256::digest(key);
        let mut checksum = [0u8; CHECKSUM_LENGTH];
        checksum.copy_from_slice(&digest[digest.len() - CHECKSUM_LENGTH..]);
        checksum
    }

    /// Abbreviated form for logs and summaries.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[ADDRESS_LENGTH - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = Vec::with_capacity(PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH);
        bytes.extend_from_slice(&self.0);
        bytes.extend_from_slice(&Self::checksum(&self.0));
        f.write_str(&base32::encode(&bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = IntentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_field("address", s)
    }
}

impl TryFrom<String> for Address {
    type Error = IntentError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_key_address() {
        // Well-known encoding of the all-zero public key.
        let address = Address::from_public_key([0u8; 32]);
        assert_eq!(
            address.to_string(),
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ"
        );
    }

    #[test]
    fn test_address_roundtrip() {
        let address = Address::from_public_key([7u8; 32]);
        let text = address.to_string();
        assert_eq!(text.len(), ADDRESS_LENGTH);
        assert_eq!(text.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_address_rejects_bad_checksum() {
        let mut text = Address::from_public_key([9u8; 32]).to_string();
        // Flip the first character of the key part.
        let replacement = if text.starts_with('B') { "C" } else { "B" };
        text.replace_range(0..1, replacement);
        let err = Address::parse_field("recipient", &text).unwrap_err();
        assert!(matches!(err, IntentError::InvalidAddress { ref field, .. } if field == "recipient"));
    }

    #[test]
    fn test_address_rejects_wrong_shape() {
        assert!(!Address::is_valid("ADDR1"));
        assert!(!Address::is_valid(&"a".repeat(58)));
        assert!(!Address::is_valid(&"A".repeat(59)));
    }

    #[test]
    fn test_address_serde() {
        let address = Address::from_public_key([3u8; 32]);
        let json = serde_json::to_string(&address).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
        assert!(serde_json::from_str::<Address>("\"NOTANADDRESS\"").is_err());
    }
}
