//! Command transmitter for a single-shot remote.
//!
//! Each invocation runs a fixed pipeline:
//! 1. bring up the counter store (bootstrap on first use)
//! 2. read the counter
//! 3. encode the secure frame
//! 4. send it through a fresh [`Rendezvous`]
//! 5. advance and persist the counter, only if the send was confirmed
//!
//! Nothing is retried; retry decisions belong to the caller.

use crate::config::DeviceConfig;
use crate::counter::ReplayCounter;
use crate::frame::FrameCodec;
use crate::medium::StorageMedium;
use crate::rendezvous::Rendezvous;
use crate::store::{BootstrapOutcome, CounterStore};
use crate::transport::{TransmissionOutcome, Transport};
use crate::types::{RemoteError, Result};

/// Result of one command invocation that reached the transport.
#[derive(Debug)]
pub enum Invocation {
    /// Frame confirmed and the advanced counter persisted.
    Delivered {
        /// Counter the frame carried.
        counter: ReplayCounter,
        /// Counter the next frame will carry.
        next: ReplayCounter,
    },
    /// Frame confirmed but the advanced counter could not be persisted.
    ///
    /// The next invocation will reuse `counter`.
    DeliveredCounterNotAdvanced {
        /// Counter the frame carried.
        counter: ReplayCounter,
        /// Why the counter write failed.
        error: RemoteError,
    },
    /// Transport timed out; the counter is unchanged.
    TimedOut {
        /// Counter the frame carried.
        counter: ReplayCounter,
    },
}

impl Invocation {
    /// Returns true when the frame was confirmed by the transport.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::TimedOut { .. })
    }

    /// Counter the transmitted frame carried.
    pub fn counter(&self) -> ReplayCounter {
        match self {
            Self::Delivered { counter, .. }
            | Self::DeliveredCounterNotAdvanced { counter, .. }
            | Self::TimedOut { counter } => *counter,
        }
    }
}

/// Sends authenticated commands over a transport, one at a time.
pub struct Transmitter<M: StorageMedium, T: Transport> {
    config: DeviceConfig,
    codec: FrameCodec,
    store: CounterStore<M>,
    transport: T,
    bootstrap: Option<BootstrapOutcome>,
}

impl<M: StorageMedium, T: Transport> Transmitter<M, T> {
    /// Creates a transmitter; storage is not touched until the first send.
    pub fn new(config: DeviceConfig, medium: M, transport: T) -> Self {
        let codec = FrameCodec::with_max_frame_size(config.keys.clone(), config.max_frame_size);
        let store = CounterStore::new(medium, config.store.clone());

        Self {
            config,
            codec,
            store,
            transport,
            bootstrap: None,
        }
    }

    /// Device configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Counter store.
    pub fn store(&self) -> &CounterStore<M> {
        &self.store
    }

    /// Transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// How counter storage was brought up, once the first send has run.
    ///
    /// [`BootstrapOutcome::MarkerNotPersisted`] means the counter in use is
    /// valid for this process only; the next cold start bootstraps again.
    pub fn bootstrap_outcome(&self) -> Option<BootstrapOutcome> {
        self.bootstrap
    }

    /// Longest command this transmitter can send.
    pub fn max_command_size(&self) -> usize {
        self.codec.max_command_size()
    }

    /// Sends one command.
    ///
    /// Returns an error when the invocation is aborted before or during
    /// transmission: storage unavailable, counter unreadable, command too
    /// large, or transport gone. In those cases the counter is untouched.
    /// Degraded storage bootstrap is not an error; it is reported through
    /// [`bootstrap_outcome`](Self::bootstrap_outcome) and logged.
    pub async fn send_command(&mut self, command: &[u8]) -> Result<Invocation> {
        let counter = self.current_counter().await?;

        let frame = self
            .codec
            .encode(&self.config.identity, counter, command)
            .map_err(|e| {
                tracing::error!(error = %e, "Command rejected, nothing transmitted");
                e
            })?;

        tracing::info!(counter = %counter, size = frame.len(), "Sending command frame");

        let outcome = Rendezvous::new(&self.transport).send(frame).await?;

        match outcome {
            TransmissionOutcome::Confirmed => {
                let next = counter.increment();
                match self.store.write_counter(next).await {
                    Ok(()) => {
                        tracing::info!(counter = %counter, next = %next, "Command delivered");
                        Ok(Invocation::Delivered { counter, next })
                    }
                    Err(error) => {
                        tracing::warn!(
                            counter = %counter,
                            error = %error,
                            "Command delivered but counter not advanced"
                        );
                        Ok(Invocation::DeliveredCounterNotAdvanced { counter, error })
                    }
                }
            }
            TransmissionOutcome::TimedOut => {
                tracing::warn!(counter = %counter, "Command timed out, counter unchanged");
                Ok(Invocation::TimedOut { counter })
            }
        }
    }

    async fn current_counter(&mut self) -> Result<ReplayCounter> {
        if !self.store.is_initialized() {
            self.store.initialize().await?;
        }

        if self.bootstrap.is_some() {
            return self.store.read_counter().await;
        }

        let bootstrap = self.store.bootstrap().await?;
        if bootstrap.outcome == BootstrapOutcome::MarkerNotPersisted {
            tracing::warn!(
                counter = %bootstrap.counter,
                "Counter storage marker not persisted, storage will bootstrap again next start"
            );
        }
        self.bootstrap = Some(bootstrap.outcome);
        Ok(bootstrap.counter)
    }
}
