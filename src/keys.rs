//! Pre-shared key material for frame encryption and authentication.

use std::fmt;

use crate::types::{RemoteError, Result, ENCRYPTION_KEY_SIZE, IV_SIZE, MAC_KEY_SIZE};

/// Symmetric secrets shared between the transmitter and its receiver.
///
/// Key material is fixed at provisioning time; there is no rotation.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    encryption_key: [u8; ENCRYPTION_KEY_SIZE],
    mac_key: [u8; MAC_KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl KeyMaterial {
    /// Creates key material from fixed-size arrays.
    pub const fn new(
        encryption_key: [u8; ENCRYPTION_KEY_SIZE],
        mac_key: [u8; MAC_KEY_SIZE],
        iv: [u8; IV_SIZE],
    ) -> Self {
        Self {
            encryption_key,
            mac_key,
            iv,
        }
    }

    /// Creates key material from byte slices, checking every length.
    pub fn from_slices(encryption_key: &[u8], mac_key: &[u8], iv: &[u8]) -> Result<Self> {
        Ok(Self {
            encryption_key: to_array(encryption_key, "encryption key")?,
            mac_key: to_array(mac_key, "MAC key")?,
            iv: to_array(iv, "IV")?,
        })
    }

    /// Creates key material from hex strings.
    pub fn from_hex(encryption_key: &str, mac_key: &str, iv: &str) -> Result<Self> {
        Self::from_slices(
            &decode_hex(encryption_key, "encryption key")?,
            &decode_hex(mac_key, "MAC key")?,
            &decode_hex(iv, "IV")?,
        )
    }

    /// Returns the AES-128 key.
    pub fn encryption_key(&self) -> &[u8; ENCRYPTION_KEY_SIZE] {
        &self.encryption_key
    }

    /// Returns the HMAC-SHA256 key.
    pub fn mac_key(&self) -> &[u8; MAC_KEY_SIZE] {
        &self.mac_key
    }

    /// Returns the CTR initial counter block.
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("encryption_key", &"<redacted>")
            .field("mac_key", &"<redacted>")
            .field("iv", &"<redacted>")
            .finish()
    }
}

pub(crate) fn decode_hex(value: &str, what: &'static str) -> Result<Vec<u8>> {
    hex::decode(value.trim())
        .map_err(|e| RemoteError::InvalidConfig(format!("{} is not valid hex: {}", what, e)))
}

pub(crate) fn to_array<const N: usize>(bytes: &[u8], what: &'static str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| RemoteError::InvalidKeyLength {
        what,
        expected: N,
        got: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const AES_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f";
    const HMAC_KEY_HEX: &str = "202122232425262728292a2b2c2d2e2f303132333435363738393a3b3c3d3e3f";
    const IV_HEX: &str = "f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff";

    #[test]
    fn test_from_hex() {
        let keys = KeyMaterial::from_hex(AES_KEY_HEX, HMAC_KEY_HEX, IV_HEX).unwrap();
        assert_eq!(keys.encryption_key()[15], 0x0f);
        assert_eq!(keys.mac_key()[0], 0x20);
        assert_eq!(keys.iv()[0], 0xf0);
    }

    #[test]
    fn test_wrong_key_length() {
        let result = KeyMaterial::from_hex("0001", HMAC_KEY_HEX, IV_HEX);
        assert!(matches!(
            result,
            Err(RemoteError::InvalidKeyLength {
                what: "encryption key",
                expected: 16,
                got: 2
            })
        ));
    }

    #[test]
    fn test_invalid_hex() {
        let result = KeyMaterial::from_hex(AES_KEY_HEX, "zz", IV_HEX);
        assert!(matches!(result, Err(RemoteError::InvalidConfig(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let keys = KeyMaterial::from_hex(AES_KEY_HEX, HMAC_KEY_HEX, IV_HEX).unwrap();
        let debug = format!("{:?}", keys);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("0f"));
    }
}
