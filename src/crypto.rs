//! Cryptographic primitives for the command frame.
//!
//! Frames use encrypt-then-MAC: AES-128-CTR for confidentiality and
//! HMAC-SHA256 over the ciphertext for integrity. The IV is the full 128-bit
//! big-endian initial counter block.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::keys::KeyMaterial;
use crate::types::TAG_SIZE;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// XORs `data` in place with the AES-CTR keystream.
///
/// Encryption and decryption are the same operation.
pub fn apply_keystream(keys: &KeyMaterial, data: &mut [u8]) {
    let mut cipher = Aes128Ctr::new(keys.encryption_key().into(), keys.iv().into());
    cipher.apply_keystream(data);
}

/// Computes the HMAC-SHA256 tag over `ciphertext`.
pub fn compute_tag(keys: &KeyMaterial, ciphertext: &[u8]) -> [u8; TAG_SIZE] {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(keys.mac_key())
        .expect("HMAC accepts keys of any length");
    mac.update(ciphertext);

    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

/// Checks `received_tag` against the tag of `ciphertext` in constant time.
pub fn verify_tag(keys: &KeyMaterial, ciphertext: &[u8], received_tag: &[u8]) -> bool {
    let expected = compute_tag(keys, ciphertext);
    ct_eq_bytes(&expected, received_tag)
}

/// Constant-time byte comparison; slices of different length never match.
pub fn ct_eq_bytes(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keys() -> KeyMaterial {
        KeyMaterial::new([0x11; 16], [0x22; 32], [0x33; 16])
    }

    #[test]
    fn test_keystream_roundtrip() {
        let keys = test_keys();
        let plaintext = b"0102030405060708 open".to_vec();

        let mut buffer = plaintext.clone();
        apply_keystream(&keys, &mut buffer);
        assert_ne!(buffer, plaintext);
        assert_eq!(buffer.len(), plaintext.len());

        apply_keystream(&keys, &mut buffer);
        assert_eq!(buffer, plaintext);
    }

    #[test]
    fn test_aes128_ctr_nist_vector() {
        // NIST SP 800-38A F.5.1 CTR-AES128.Encrypt, first block
        let keys = KeyMaterial::new(
            hex::decode("2b7e151628aed2a6abf7158809cf4f3c")
                .unwrap()
                .try_into()
                .unwrap(),
            [0u8; 32],
            hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff")
                .unwrap()
                .try_into()
                .unwrap(),
        );
        let mut block = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        apply_keystream(&keys, &mut block);
        assert_eq!(hex::encode(block), "874d6191b620e3261bef6864990db6ce");
    }

    #[test]
    fn test_random_keys_keystream_roundtrip() {
        use rand::RngCore;

        let mut rng = rand::thread_rng();
        let mut enc = [0u8; 16];
        let mut mac = [0u8; 32];
        let mut iv = [0u8; 16];
        rng.fill_bytes(&mut enc);
        rng.fill_bytes(&mut mac);
        rng.fill_bytes(&mut iv);
        let keys = KeyMaterial::new(enc, mac, iv);

        let mut plaintext = vec![0u8; 48];
        rng.fill_bytes(&mut plaintext);

        let mut buffer = plaintext.clone();
        apply_keystream(&keys, &mut buffer);
        let tag = compute_tag(&keys, &buffer);
        assert!(verify_tag(&keys, &buffer, &tag));

        apply_keystream(&keys, &mut buffer);
        assert_eq!(buffer, plaintext);
    }

    #[test]
    fn test_tag_is_deterministic() {
        let keys = test_keys();
        assert_eq!(compute_tag(&keys, b"abc"), compute_tag(&keys, b"abc"));
        assert_ne!(compute_tag(&keys, b"abc"), compute_tag(&keys, b"abd"));
    }

    #[test]
    fn test_verify_tag() {
        let keys = test_keys();
        let tag = compute_tag(&keys, b"ciphertext");
        assert!(verify_tag(&keys, b"ciphertext", &tag));

        let mut bad = tag;
        bad[31] ^= 0x01;
        assert!(!verify_tag(&keys, b"ciphertext", &bad));
        assert!(!verify_tag(&keys, b"ciphertext", &tag[..16]));
    }

    #[test]
    fn test_ct_eq_bytes() {
        assert!(ct_eq_bytes(&[1, 2, 3], &[1, 2, 3]));
        assert!(!ct_eq_bytes(&[1, 2, 3], &[1, 2, 4]));
        assert!(!ct_eq_bytes(&[1, 2, 3], &[1, 2]));
    }
}
