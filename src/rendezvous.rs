//! Single-outstanding send rendezvous.
//!
//! A [`Rendezvous`] drives one frame from `Idle` through `Sending` to a
//! terminal outcome. Each send gets a fresh completion channel, so an
//! outcome left over from an earlier attempt can never be observed.

use crate::transport::{CompletionSignal, TransmissionOutcome, Transport};
use crate::types::{RemoteError, Result};

/// State of a rendezvous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousState {
    /// Nothing sent yet.
    Idle,
    /// A frame is with the transport.
    Sending,
    /// The transport confirmed the frame.
    Confirmed,
    /// The transport timed out and was put into idle.
    TimedOut,
}

impl RendezvousState {
    /// Returns true for `Confirmed` and `TimedOut`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::TimedOut)
    }
}

/// Waits for the transport to report the outcome of one send.
pub struct Rendezvous<'a, T: Transport> {
    transport: &'a T,
    state: RendezvousState,
}

impl<'a, T: Transport> Rendezvous<'a, T> {
    /// Creates an idle rendezvous over `transport`.
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            state: RendezvousState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> RendezvousState {
        self.state
    }

    /// Hands `frame` to the transport and waits for its outcome.
    ///
    /// Only valid from `Idle`. On timeout the transport is put into idle
    /// before the outcome is returned. There is no cancellation and no
    /// overall deadline; a transport that never reports blocks the caller.
    pub async fn send(&mut self, frame: Vec<u8>) -> Result<TransmissionOutcome> {
        if self.state != RendezvousState::Idle {
            tracing::error!(state = ?self.state, "Send requested on non-idle rendezvous");
            return Err(RemoteError::RendezvousBusy);
        }

        let (signal, completion) = CompletionSignal::channel();
        self.state = RendezvousState::Sending;
        tracing::debug!(size = frame.len(), "Frame handed to transport");
        self.transport.send(frame, signal).await;

        match completion.await {
            Ok(TransmissionOutcome::Confirmed) => {
                self.state = RendezvousState::Confirmed;
                tracing::debug!("Transmission confirmed");
                Ok(TransmissionOutcome::Confirmed)
            }
            Ok(TransmissionOutcome::TimedOut) => {
                self.transport.enter_idle().await;
                self.state = RendezvousState::TimedOut;
                tracing::warn!("Transmission timed out, transport idled");
                Ok(TransmissionOutcome::TimedOut)
            }
            Err(_) => {
                // Never reached a terminal state; stay in Sending so the
                // rendezvous cannot be reused.
                self.transport.enter_idle().await;
                tracing::error!("Transport dropped completion signal");
                Err(RemoteError::TransportDisconnected)
            }
        }
    }
}
