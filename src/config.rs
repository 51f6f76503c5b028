//! Device configuration and provisioning records.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::keys::{decode_hex, to_array, KeyMaterial};
use crate::types::{
    Identity, RemoteError, Result, DEFAULT_MAX_FRAME_SIZE, MIN_FRAME_SIZE,
};

/// Timing and retry settings for the counter store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Readiness probes attempted by `initialize`.
    pub probe_trials: u32,
    /// Upper bound on a single probe, read or write.
    pub io_timeout: Duration,
    /// Internal write-commit time of the medium.
    pub write_settle: Duration,
    /// Readiness probes attempted after a write has settled.
    pub reprobe_trials: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            probe_trials: 5,
            io_timeout: Duration::from_millis(100),
            write_settle: Duration::from_millis(5),
            reprobe_trials: 2,
        }
    }
}

impl StoreConfig {
    /// Configuration without settle delays, for fast media and tests.
    pub fn immediate() -> Self {
        Self {
            write_settle: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Everything a transmitter needs to know about itself.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Human-readable device name, if provisioned with one.
    pub name: Option<String>,
    /// Sender identity.
    pub identity: Identity,
    /// Pre-shared secrets.
    pub keys: KeyMaterial,
    /// Maximum secure frame size (radio payload limit).
    pub max_frame_size: usize,
    /// Counter store settings.
    pub store: StoreConfig,
}

impl DeviceConfig {
    /// Creates a configuration with default limits.
    pub fn new(identity: Identity, keys: KeyMaterial) -> Self {
        Self {
            name: None,
            identity,
            keys,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            store: StoreConfig::default(),
        }
    }

    /// Sets the maximum secure frame size.
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Result<Self> {
        if max_frame_size <= MIN_FRAME_SIZE {
            return Err(RemoteError::InvalidConfig(format!(
                "max frame size {} leaves no room for a command (minimum {})",
                max_frame_size,
                MIN_FRAME_SIZE + 1
            )));
        }
        self.max_frame_size = max_frame_size;
        Ok(self)
    }

    /// Sets the counter store settings.
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Builds a configuration from a provisioning record.
    pub fn from_record(record: &ProvisioningRecord) -> Result<Self> {
        let identity: Identity =
            to_array(&decode_hex(&record.remote_id, "remote ID")?, "remote ID")?;
        let keys = KeyMaterial::from_hex(&record.aes_key, &record.hmac_key, &record.iv)?;

        let mut config = Self::new(identity, keys);
        config.name = record.name.clone();
        Ok(config)
    }

    /// Parses a JSON provisioning record.
    pub fn from_json(json: &str) -> Result<Self> {
        let record: ProvisioningRecord = serde_json::from_str(json)
            .map_err(|e| RemoteError::InvalidConfig(format!("invalid provisioning JSON: {}", e)))?;
        Self::from_record(&record)
    }
}

/// Per-remote record as kept by the central server, all secrets hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRecord {
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 8-byte sender identity.
    pub remote_id: String,
    /// 16-byte AES key.
    pub aes_key: String,
    /// 32-byte HMAC key.
    pub hmac_key: String,
    /// 16-byte CTR initial counter block.
    pub iv: String,
}

impl ProvisioningRecord {
    /// Serializes the record as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::InvalidConfig(format!("cannot serialize record: {}", e)))
    }
}
