//! Type definitions and protocol constants for the remote command protocol.

use thiserror::Error;

/// Size of the sender identity in bytes.
pub const IDENTITY_SIZE: usize = 8;

/// Size of the replay counter in bytes.
pub const COUNTER_SIZE: usize = 8;

/// Size of the plaintext header (identity + counter).
pub const HEADER_SIZE: usize = IDENTITY_SIZE + COUNTER_SIZE;

/// Size of the HMAC-SHA256 authentication tag in bytes.
pub const TAG_SIZE: usize = 32;

/// Size of the AES-128 encryption key in bytes.
pub const ENCRYPTION_KEY_SIZE: usize = 16;

/// Size of the HMAC key in bytes.
pub const MAC_KEY_SIZE: usize = 32;

/// Size of the AES-CTR initialization vector in bytes.
pub const IV_SIZE: usize = 16;

/// Smallest secure frame a receiver will look at (empty command plus tag).
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + TAG_SIZE;

/// Default maximum secure frame size (the radio payload buffer).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64;

/// Offset of the counter in the storage medium.
pub const COUNTER_OFFSET: u16 = 0x00;

/// Offset of the initialization marker, directly after the counter.
pub const INIT_MARKER_OFFSET: u16 = COUNTER_OFFSET + COUNTER_SIZE as u16;

/// Marker value meaning "counter storage is valid".
pub const INIT_MARKER_VALID: u8 = 0xAA;

/// Number of bytes of the storage medium used by the counter store.
pub const STORE_FOOTPRINT: usize = COUNTER_SIZE + 1;

/// Sender identity, fixed for the lifetime of the device.
pub type Identity = [u8; IDENTITY_SIZE];

/// Errors that can occur during remote command operations.
#[derive(Error, Debug)]
pub enum RemoteError {
    // Codec Errors
    /// Frame would exceed the configured maximum size.
    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Received frame is shorter than header plus tag.
    #[error("Frame too short: {0} bytes (minimum {MIN_FRAME_SIZE})")]
    FrameTooShort(usize),

    /// Tag did not match the ciphertext.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Decrypted content cannot hold identity and counter.
    #[error("Malformed frame: decrypted {0} bytes (minimum {HEADER_SIZE})")]
    MalformedFrame(usize),

    /// Frame carries identity and counter but no command.
    #[error("Empty command")]
    EmptyCommand,

    // Storage Errors
    /// Storage medium did not answer the readiness probe.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Read from the storage medium failed.
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Write to the storage medium failed.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    // Transport Errors
    /// Transport dropped the completion signal without reporting an outcome.
    #[error("Transport disconnected before reporting an outcome")]
    TransportDisconnected,

    /// A send was requested on a rendezvous that is not idle.
    #[error("Rendezvous busy: not idle")]
    RendezvousBusy,

    // Verifier Errors
    /// Frame authenticated but was issued by a different sender.
    #[error("Unknown sender: {0}")]
    UnknownSender(String),

    /// Counter is not newer than the last accepted one.
    #[error("Replayed counter: received {received}, last seen {last_seen}")]
    ReplayedCounter { received: u64, last_seen: u64 },

    // Configuration Errors
    /// Key material has the wrong length.
    #[error("Invalid {what} length: expected {expected} bytes, got {got}")]
    InvalidKeyLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Configuration could not be parsed or is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;
