//! Persistent anti-replay counter store.
//!
//! Layout on the medium:
//! - \[0x00..0x08\]: counter (8 bytes, big-endian)
//! - \[0x08\]:       initialization marker (0xAA when the counter is valid)
//!
//! Every operation is bounded by the configured I/O timeout. Writes wait
//! for the medium's commit time and then re-probe readiness; a failed
//! re-probe is logged but does not undo an acknowledged write.

use std::future::Future;

use crate::config::StoreConfig;
use crate::counter::ReplayCounter;
use crate::medium::StorageMedium;
use crate::types::{
    RemoteError, Result, COUNTER_OFFSET, COUNTER_SIZE, INIT_MARKER_OFFSET, INIT_MARKER_VALID,
};

/// How the working counter was obtained at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Marker was valid; the counter was read from storage.
    Loaded,
    /// Storage was virgin; counter and marker were written.
    Initialized,
    /// Storage was virgin; the counter was written but the marker was not.
    /// The counter is usable for this invocation only.
    MarkerNotPersisted,
}

/// Counter obtained by [`CounterStore::bootstrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bootstrap {
    /// Counter to use for the next frame.
    pub counter: ReplayCounter,
    /// How it was obtained.
    pub outcome: BootstrapOutcome,
}

/// Counter store over a byte-addressable medium.
pub struct CounterStore<M: StorageMedium> {
    medium: M,
    config: StoreConfig,
    ready: bool,
}

impl<M: StorageMedium> CounterStore<M> {
    /// Creates a store; [`initialize`](Self::initialize) must succeed before use.
    pub fn new(medium: M, config: StoreConfig) -> Self {
        Self {
            medium,
            config,
            ready: false,
        }
    }

    /// Returns the underlying medium.
    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Returns true once the medium has answered a readiness probe.
    pub fn is_initialized(&self) -> bool {
        self.ready
    }

    /// Probes the medium until it answers or the trials run out.
    pub async fn initialize(&mut self) -> Result<()> {
        tracing::debug!(trials = self.config.probe_trials, "Probing storage medium");

        if self.probe(self.config.probe_trials).await {
            self.ready = true;
            tracing::debug!("Storage medium ready");
            Ok(())
        } else {
            tracing::error!(
                trials = self.config.probe_trials,
                "Storage medium did not answer readiness probe"
            );
            Err(RemoteError::StoreUnavailable(format!(
                "no answer after {} probes",
                self.config.probe_trials
            )))
        }
    }

    /// Reads the initialization marker.
    pub async fn read_init_marker(&self) -> Result<u8> {
        let data = self.read(INIT_MARKER_OFFSET, 1).await?;
        Ok(data[0])
    }

    /// Writes the initialization marker.
    pub async fn write_init_marker(&self, value: u8) -> Result<()> {
        self.write(INIT_MARKER_OFFSET, &[value]).await
    }

    /// Reads the persisted counter.
    pub async fn read_counter(&self) -> Result<ReplayCounter> {
        let data = self.read(COUNTER_OFFSET, COUNTER_SIZE).await?;
        let mut bytes = [0u8; COUNTER_SIZE];
        bytes.copy_from_slice(&data);

        let counter = ReplayCounter::from_bytes(bytes);
        tracing::debug!(counter = %counter, "Read counter");
        Ok(counter)
    }

    /// Persists a counter.
    pub async fn write_counter(&self, counter: ReplayCounter) -> Result<()> {
        tracing::debug!(counter = %counter, "Writing counter");
        self.write(COUNTER_OFFSET, &counter.to_bytes()).await
    }

    /// Loads the counter, initializing virgin storage to 1 first.
    ///
    /// Storage is virgin when the marker cannot be read or holds anything
    /// but the valid sentinel. A failed counter write is fatal; a failed
    /// marker write after it degrades to [`BootstrapOutcome::MarkerNotPersisted`].
    pub async fn bootstrap(&self) -> Result<Bootstrap> {
        let virgin = match self.read_init_marker().await {
            Ok(INIT_MARKER_VALID) => false,
            Ok(marker) => {
                tracing::info!(
                    marker = %format!("0x{:02X}", marker),
                    expected = %format!("0x{:02X}", INIT_MARKER_VALID),
                    "Init marker invalid, storage needs bootstrap"
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Init marker unreadable, assuming virgin storage");
                true
            }
        };

        if !virgin {
            let counter = self.read_counter().await?;
            return Ok(Bootstrap {
                counter,
                outcome: BootstrapOutcome::Loaded,
            });
        }

        let counter = ReplayCounter::INITIAL;
        self.write_counter(counter).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to write initial counter");
            e
        })?;

        let outcome = match self.write_init_marker(INIT_MARKER_VALID).await {
            Ok(()) => {
                tracing::info!(counter = %counter, "Storage bootstrapped");
                BootstrapOutcome::Initialized
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to write init marker, continuing with in-memory counter"
                );
                BootstrapOutcome::MarkerNotPersisted
            }
        };

        Ok(Bootstrap { counter, outcome })
    }

    async fn probe(&self, trials: u32) -> bool {
        for _ in 0..trials {
            if let Ok(true) = tokio::time::timeout(self.config.io_timeout, self.medium.is_ready()).await
            {
                return true;
            }
        }
        false
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.ready {
            Ok(())
        } else {
            Err(RemoteError::StoreUnavailable(
                "store used before initialize".to_string(),
            ))
        }
    }

    async fn read(&self, offset: u16, len: usize) -> Result<Vec<u8>> {
        self.ensure_ready()?;

        let data = bounded(self.config.io_timeout, self.medium.read(offset, len), || {
            RemoteError::ReadFailed(format!("read at 0x{:02X} timed out", offset))
        })
        .await?;

        if data.len() != len {
            return Err(RemoteError::ReadFailed(format!(
                "short read at 0x{:02X}: {} of {} bytes",
                offset,
                data.len(),
                len
            )));
        }
        Ok(data)
    }

    async fn write(&self, offset: u16, data: &[u8]) -> Result<()> {
        self.ensure_ready()?;

        bounded(self.config.io_timeout, self.medium.write(offset, data), || {
            RemoteError::WriteFailed(format!("write at 0x{:02X} timed out", offset))
        })
        .await?;

        if !self.config.write_settle.is_zero() {
            tokio::time::sleep(self.config.write_settle).await;
        }

        if !self.probe(self.config.reprobe_trials).await {
            tracing::warn!(
                offset = %format!("0x{:02X}", offset),
                "Medium not ready after write commit time"
            );
        }
        Ok(())
    }
}

async fn bounded<T, F>(
    limit: std::time::Duration,
    operation: F,
    on_timeout: impl FnOnce() -> RemoteError,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}
