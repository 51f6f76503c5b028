//! Transport abstraction for the radio link.
//!
//! A transport accepts one frame at a time and later reports exactly one
//! terminal outcome through the [`CompletionSignal`] it was handed. The
//! signal is consumed when fired, so a transport cannot report twice.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, RwLock};

/// Terminal result of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransmissionOutcome {
    /// The link reported the frame as transmitted.
    Confirmed,
    /// The link gave up on the frame.
    TimedOut,
}

/// Single-use handle a transport fires when a send reaches its outcome.
#[derive(Debug)]
pub struct CompletionSignal {
    sender: oneshot::Sender<TransmissionOutcome>,
}

/// Receiving side of a [`CompletionSignal`].
pub type Completion = oneshot::Receiver<TransmissionOutcome>;

impl CompletionSignal {
    /// Creates a fresh signal and the completion it resolves.
    pub fn channel() -> (Self, Completion) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    /// Reports that the frame was transmitted.
    pub fn confirm(self) {
        self.fire(TransmissionOutcome::Confirmed);
    }

    /// Reports that the transmission timed out.
    pub fn time_out(self) {
        self.fire(TransmissionOutcome::TimedOut);
    }

    /// Reports `outcome`.
    pub fn fire(self, outcome: TransmissionOutcome) {
        // The waiting side may already be gone; nothing to report to then.
        let _ = self.sender.send(outcome);
    }
}

/// Abstract radio transport.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Starts transmitting `frame` and returns without waiting for delivery.
    ///
    /// The transport must fire `signal` at most once. Dropping it unfired is
    /// reported to the waiter as a disconnected transport.
    async fn send(&self, frame: Vec<u8>, signal: CompletionSignal);

    /// Puts the transport into its low-power idle posture.
    async fn enter_idle(&self);
}

// ============================================================================
// Simulated transport
// ============================================================================

/// Scripted behavior of a [`SimTransport`] for one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimBehavior {
    /// Confirm after the delay.
    Confirm(Duration),
    /// Time out after the delay.
    TimeOut(Duration),
    /// Drop the signal without reporting.
    Vanish,
}

impl SimBehavior {
    /// Confirm without delay.
    pub const CONFIRM: Self = Self::Confirm(Duration::ZERO);
    /// Time out without delay.
    pub const TIME_OUT: Self = Self::TimeOut(Duration::ZERO);
}

/// In-process transport that records frames and reports scripted outcomes.
///
/// Outcomes are fired from a spawned task, like a radio interrupt would.
/// Clones share the same script and recordings.
#[derive(Debug, Clone)]
pub struct SimTransport {
    script: Arc<RwLock<VecDeque<SimBehavior>>>,
    fallback: SimBehavior,
    sent: Arc<RwLock<Vec<Vec<u8>>>>,
    idle_entries: Arc<AtomicUsize>,
}

impl SimTransport {
    /// Creates a transport that applies `fallback` once the script is empty.
    pub fn new(fallback: SimBehavior) -> Self {
        Self {
            script: Arc::new(RwLock::new(VecDeque::new())),
            fallback,
            sent: Arc::new(RwLock::new(Vec::new())),
            idle_entries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a transport that confirms every frame immediately.
    pub fn confirming() -> Self {
        Self::new(SimBehavior::CONFIRM)
    }

    /// Creates a transport that times out every frame immediately.
    pub fn timing_out() -> Self {
        Self::new(SimBehavior::TIME_OUT)
    }

    /// Queues behaviors for the next sends, in order.
    pub async fn script(&self, behaviors: impl IntoIterator<Item = SimBehavior>) {
        self.script.write().await.extend(behaviors);
    }

    /// Returns every frame handed to the transport, oldest first.
    pub async fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.read().await.clone()
    }

    /// Returns how many times the transport was put into idle.
    pub fn idle_entries(&self) -> usize {
        self.idle_entries.load(Ordering::SeqCst)
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::confirming()
    }
}

#[async_trait::async_trait]
impl Transport for SimTransport {
    async fn send(&self, frame: Vec<u8>, signal: CompletionSignal) {
        let behavior = self
            .script
            .write()
            .await
            .pop_front()
            .unwrap_or(self.fallback);

        tracing::debug!(size = frame.len(), ?behavior, "Simulated transmission started");
        self.sent.write().await.push(frame);

        tokio::spawn(async move {
            match behavior {
                SimBehavior::Confirm(delay) => {
                    tokio::time::sleep(delay).await;
                    signal.confirm();
                }
                SimBehavior::TimeOut(delay) => {
                    tokio::time::sleep(delay).await;
                    signal.time_out();
                }
                SimBehavior::Vanish => drop(signal),
            }
        });
    }

    async fn enter_idle(&self) {
        self.idle_entries.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_fires_once() {
        let (signal, completion) = CompletionSignal::channel();
        signal.confirm();
        assert_eq!(completion.await.unwrap(), TransmissionOutcome::Confirmed);
    }

    #[tokio::test]
    async fn test_dropped_signal_closes_completion() {
        let (signal, completion) = CompletionSignal::channel();
        drop(signal);
        assert!(completion.await.is_err());
    }

    #[tokio::test]
    async fn test_sim_transport_script_then_fallback() {
        let transport = SimTransport::confirming();
        transport.script([SimBehavior::TIME_OUT]).await;

        let (signal, completion) = CompletionSignal::channel();
        transport.send(vec![1, 2, 3], signal).await;
        assert_eq!(completion.await.unwrap(), TransmissionOutcome::TimedOut);

        let (signal, completion) = CompletionSignal::channel();
        transport.send(vec![4], signal).await;
        assert_eq!(completion.await.unwrap(), TransmissionOutcome::Confirmed);

        assert_eq!(transport.sent_frames().await, vec![vec![1, 2, 3], vec![4]]);
    }

    #[tokio::test]
    async fn test_sim_transport_vanish() {
        let transport = SimTransport::new(SimBehavior::Vanish);
        let (signal, completion) = CompletionSignal::channel();
        transport.send(vec![0], signal).await;
        assert!(completion.await.is_err());
    }
}
