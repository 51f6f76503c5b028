//! Known-answer tests for the secure frame format.
//!
//! Vectors were produced by an independent AES-128-CTR / HMAC-SHA256
//! implementation using the provisioning record below.

use remote_command::{
    DeviceConfig, FrameCodec, RemoteError, ReplayCounter, HEADER_SIZE, TAG_SIZE,
};

const RECORD_JSON: &str = r#"{
    "name": "gate-remote-1",
    "remote_id": "0102030405060708",
    "aes_key": "000102030405060708090a0b0c0d0e0f",
    "hmac_key": "202122232425262728292a2b2c2d2e2f303132333435363738393a3b3c3d3e3f",
    "iv": "f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff"
}"#;

/// identity 01..08, counter 1, command "open"
const OPEN_COUNTER_1: &str = "67a5c4ec315436409751de073316adacddf1b26e\
                              3db9219229b26b60dd272071eb421d9eb17e0dc95be737e1fa04cb8287bbc865";

/// identity 01..08, counter 2, command "open"
const OPEN_COUNTER_2: &str = "67a5c4ec315436409751de073316adafddf1b26e\
                              4d24ef6a79ee22cadb6d2b53a15c9675d5cb54137418d0d06715e1575edc9d2c";

fn codec() -> (DeviceConfig, FrameCodec) {
    let config = DeviceConfig::from_json(RECORD_JSON).unwrap();
    let codec = FrameCodec::with_max_frame_size(config.keys.clone(), config.max_frame_size);
    (config, codec)
}

#[test]
fn test_encode_matches_vector() {
    let (config, codec) = codec();

    let frame = codec
        .encode(&config.identity, ReplayCounter::INITIAL, b"open")
        .unwrap();
    assert_eq!(frame.len(), HEADER_SIZE + 4 + TAG_SIZE);
    assert_eq!(hex::encode(&frame), OPEN_COUNTER_1);

    let frame = codec
        .encode(&config.identity, ReplayCounter::from_value(2), b"open")
        .unwrap();
    assert_eq!(hex::encode(&frame), OPEN_COUNTER_2);
}

#[test]
fn test_decode_vector() {
    let (config, codec) = codec();
    let frame = hex::decode(OPEN_COUNTER_1).unwrap();

    let block = codec.decode(&frame).unwrap();
    assert_eq!(block.identity, config.identity);
    assert_eq!(block.counter, ReplayCounter::INITIAL);
    assert_eq!(block.command_text(), Some("open"));
}

#[test]
fn test_tampered_vector_rejected() {
    let (_, codec) = codec();
    let mut frame = hex::decode(OPEN_COUNTER_1).unwrap();
    let last = frame.len() - 1;
    frame[last] ^= 0x01;

    assert!(matches!(
        codec.decode(&frame),
        Err(RemoteError::AuthenticationFailed)
    ));
}

#[test]
fn test_fixed_iv_shares_keystream() {
    // Consecutive counters differ only in the last counter byte.
    let a = hex::decode(OPEN_COUNTER_1).unwrap();
    let b = hex::decode(OPEN_COUNTER_2).unwrap();

    let differing: Vec<usize> = (0..HEADER_SIZE + 4).filter(|&i| a[i] != b[i]).collect();
    assert_eq!(differing, vec![HEADER_SIZE - 1]);
    assert_eq!(a[HEADER_SIZE - 1] ^ b[HEADER_SIZE - 1], 0x01 ^ 0x02);
}

#[test]
fn test_truncated_vector_too_short() {
    let (_, codec) = codec();
    let frame = hex::decode(OPEN_COUNTER_1).unwrap();

    assert!(matches!(
        codec.decode(&frame[..47]),
        Err(RemoteError::FrameTooShort(47))
    ));
}
