//! Secure command frame encoding and decoding.
//!
//! Wire format (ciphertext + 32-byte tag):
//! - \[0..N\]:     AES-128-CTR ciphertext of the plaintext command block
//! - \[N..N+32\]:  HMAC-SHA256 over the ciphertext
//!
//! Plaintext command block:
//! - \[0..8\]:   sender identity
//! - \[8..16\]:  replay counter (big-endian)
//! - \[16..\]:   command bytes (no terminator)

use crate::counter::ReplayCounter;
use crate::crypto::{apply_keystream, compute_tag, verify_tag};
use crate::keys::KeyMaterial;
use crate::types::{
    Identity, RemoteError, Result, COUNTER_SIZE, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE,
    IDENTITY_SIZE, MIN_FRAME_SIZE, TAG_SIZE,
};

/// Decoded contents of a secure frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBlock {
    /// Identity of the sender.
    pub identity: Identity,
    /// Replay counter the frame was issued under.
    pub counter: ReplayCounter,
    /// Command payload.
    pub command: Vec<u8>,
}

impl CommandBlock {
    /// Creates a new command block.
    pub fn new(identity: Identity, counter: ReplayCounter, command: impl Into<Vec<u8>>) -> Self {
        Self {
            identity,
            counter,
            command: command.into(),
        }
    }

    /// Serializes the block as identity || counter || command.
    pub fn to_plaintext(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(HEADER_SIZE + self.command.len());
        data.extend_from_slice(&self.identity);
        data.extend_from_slice(&self.counter.to_bytes());
        data.extend_from_slice(&self.command);
        data
    }

    /// Returns the command as text if it is valid UTF-8.
    pub fn command_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.command).ok()
    }
}

/// Builds and validates secure frames under a fixed set of keys.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    keys: KeyMaterial,
    max_frame_size: usize,
}

impl FrameCodec {
    /// Creates a codec with the default maximum frame size.
    pub fn new(keys: KeyMaterial) -> Self {
        Self::with_max_frame_size(keys, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates a codec that rejects frames longer than `max_frame_size`.
    pub fn with_max_frame_size(keys: KeyMaterial, max_frame_size: usize) -> Self {
        Self {
            keys,
            max_frame_size,
        }
    }

    /// Maximum secure frame size in bytes (ciphertext plus tag).
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Longest command that still fits in a frame.
    pub fn max_command_size(&self) -> usize {
        self.max_frame_size.saturating_sub(MIN_FRAME_SIZE)
    }

    /// Encrypts and authenticates a command.
    ///
    /// Fails only with `FrameTooLarge`, before any cryptographic work.
    pub fn encode(
        &self,
        identity: &Identity,
        counter: ReplayCounter,
        command: &[u8],
    ) -> Result<Vec<u8>> {
        let frame_size = HEADER_SIZE + command.len() + TAG_SIZE;
        if frame_size > self.max_frame_size {
            return Err(RemoteError::FrameTooLarge {
                size: frame_size,
                max: self.max_frame_size,
            });
        }

        let mut data = CommandBlock::new(*identity, counter, command).to_plaintext();
        apply_keystream(&self.keys, &mut data);

        let tag = compute_tag(&self.keys, &data);
        data.extend_from_slice(&tag);

        debug_assert_eq!(data.len(), frame_size);
        Ok(data)
    }

    /// Verifies and decrypts a received frame.
    ///
    /// The tag is checked before anything is decrypted; a frame that fails
    /// authentication yields no plaintext at all.
    pub fn decode(&self, data: &[u8]) -> Result<CommandBlock> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(RemoteError::FrameTooShort(data.len()));
        }

        if data.len() > self.max_frame_size {
            return Err(RemoteError::FrameTooLarge {
                size: data.len(),
                max: self.max_frame_size,
            });
        }

        let (ciphertext, received_tag) = data.split_at(data.len() - TAG_SIZE);

        if !verify_tag(&self.keys, ciphertext, received_tag) {
            return Err(RemoteError::AuthenticationFailed);
        }

        let mut plaintext = ciphertext.to_vec();
        apply_keystream(&self.keys, &mut plaintext);

        if plaintext.len() < HEADER_SIZE {
            return Err(RemoteError::MalformedFrame(plaintext.len()));
        }

        let mut identity = [0u8; IDENTITY_SIZE];
        identity.copy_from_slice(&plaintext[..IDENTITY_SIZE]);

        let mut counter = [0u8; COUNTER_SIZE];
        counter.copy_from_slice(&plaintext[IDENTITY_SIZE..HEADER_SIZE]);

        let command = plaintext[HEADER_SIZE..].to_vec();
        if command.is_empty() {
            return Err(RemoteError::EmptyCommand);
        }

        Ok(CommandBlock {
            identity,
            counter: ReplayCounter::from_bytes(counter),
            command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: Identity = [1, 2, 3, 4, 5, 6, 7, 8];

    fn test_codec() -> FrameCodec {
        FrameCodec::new(KeyMaterial::new([0x5A; 16], [0xC3; 32], [0x0F; 16]))
    }

    #[test]
    fn test_open_command_layout() {
        let codec = test_codec();
        let frame = codec
            .encode(&IDENTITY, ReplayCounter::INITIAL, b"open")
            .unwrap();
        assert_eq!(frame.len(), 52);

        let block = codec.decode(&frame).unwrap();
        assert_eq!(block.identity, IDENTITY);
        assert_eq!(block.counter, ReplayCounter::INITIAL);
        assert_eq!(block.command, b"open");
        assert_eq!(block.command_text(), Some("open"));
    }

    #[test]
    fn test_last_tag_byte_flipped() {
        let codec = test_codec();
        let mut frame = codec
            .encode(&IDENTITY, ReplayCounter::INITIAL, b"open")
            .unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0x01;

        assert!(matches!(
            codec.decode(&frame),
            Err(RemoteError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_ciphertext_bit_flip() {
        let codec = test_codec();
        let mut frame = codec
            .encode(&IDENTITY, ReplayCounter::from_value(9), b"close")
            .unwrap();
        frame[10] ^= 0x80;

        assert!(matches!(
            codec.decode(&frame),
            Err(RemoteError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_ciphertext_is_not_plaintext() {
        let codec = test_codec();
        let frame = codec
            .encode(&IDENTITY, ReplayCounter::INITIAL, b"open")
            .unwrap();
        let block = CommandBlock::new(IDENTITY, ReplayCounter::INITIAL, b"open".to_vec());
        assert_ne!(&frame[..20], block.to_plaintext().as_slice());
    }

    #[test]
    fn test_decode_too_short() {
        let codec = test_codec();
        let result = codec.decode(&[0u8; MIN_FRAME_SIZE - 1]);
        assert!(matches!(result, Err(RemoteError::FrameTooShort(47))));
    }

    #[test]
    fn test_decode_empty_command() {
        let codec = test_codec();
        let frame = codec.encode(&IDENTITY, ReplayCounter::INITIAL, b"").unwrap();
        assert_eq!(frame.len(), MIN_FRAME_SIZE);
        assert!(matches!(codec.decode(&frame), Err(RemoteError::EmptyCommand)));
    }

    #[test]
    fn test_encode_too_large() {
        let codec = test_codec();
        let command = vec![b'A'; codec.max_command_size() + 1];
        let result = codec.encode(&IDENTITY, ReplayCounter::INITIAL, &command);
        assert!(matches!(
            result,
            Err(RemoteError::FrameTooLarge { size: 65, max: 64 })
        ));
    }

    #[test]
    fn test_max_command_fits() {
        let codec = test_codec();
        let command = vec![b'A'; codec.max_command_size()];
        let frame = codec
            .encode(&IDENTITY, ReplayCounter::INITIAL, &command)
            .unwrap();
        assert_eq!(frame.len(), codec.max_frame_size());
        assert_eq!(codec.decode(&frame).unwrap().command, command);
    }

    #[test]
    fn test_decode_too_large() {
        let codec = test_codec();
        let result = codec.decode(&[0u8; DEFAULT_MAX_FRAME_SIZE + 1]);
        assert!(matches!(result, Err(RemoteError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_wrong_keys_fail_authentication() {
        let codec = test_codec();
        let other = FrameCodec::new(KeyMaterial::new([0x5A; 16], [0xC4; 32], [0x0F; 16]));
        let frame = codec
            .encode(&IDENTITY, ReplayCounter::INITIAL, b"open")
            .unwrap();
        assert!(matches!(
            other.decode(&frame),
            Err(RemoteError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_counter_is_big_endian() {
        let block = CommandBlock::new(IDENTITY, ReplayCounter::from_value(0x0102), b"x".to_vec());
        let plaintext = block.to_plaintext();
        assert_eq!(&plaintext[8..16], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(plaintext[16], b'x');
    }
}
