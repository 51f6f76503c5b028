//! Receiver-side frame verification with replay protection.
//!
//! A verifier accepts frames from exactly one sender. A frame is accepted
//! when it authenticates, carries the expected identity and has a counter
//! strictly greater than the last accepted one.

use crate::counter::ReplayCounter;
use crate::frame::{CommandBlock, FrameCodec};
use crate::types::{Identity, RemoteError, Result};

/// Verifies frames from a single sender.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    codec: FrameCodec,
    expected_identity: Identity,
    last_seen: Option<ReplayCounter>,
}

impl CommandVerifier {
    /// Creates a verifier that has not accepted any frame yet.
    pub fn new(codec: FrameCodec, expected_identity: Identity) -> Self {
        Self {
            codec,
            expected_identity,
            last_seen: None,
        }
    }

    /// Resumes from a previously accepted counter.
    pub fn with_last_seen(mut self, counter: ReplayCounter) -> Self {
        self.last_seen = Some(counter);
        self
    }

    /// Highest accepted counter, if any.
    pub fn last_seen(&self) -> Option<ReplayCounter> {
        self.last_seen
    }

    /// Checks a counter against the last accepted one without recording it.
    pub fn validate_counter(&self, counter: ReplayCounter) -> Result<()> {
        match self.last_seen {
            Some(last_seen) if counter <= last_seen => Err(RemoteError::ReplayedCounter {
                received: counter.value(),
                last_seen: last_seen.value(),
            }),
            _ => Ok(()),
        }
    }

    /// Decodes `data` and accepts it if it is fresh.
    ///
    /// State changes only on acceptance; a rejected frame leaves the
    /// verifier exactly as it was.
    pub fn verify(&mut self, data: &[u8]) -> Result<CommandBlock> {
        let block = self.codec.decode(data)?;

        if block.identity != self.expected_identity {
            tracing::warn!(
                identity = %hex::encode(block.identity),
                "Frame from unexpected sender"
            );
            return Err(RemoteError::UnknownSender(hex::encode(block.identity)));
        }

        if let Err(e) = self.validate_counter(block.counter) {
            tracing::warn!(counter = %block.counter, "Replayed frame rejected");
            return Err(e);
        }

        self.last_seen = Some(block.counter);
        tracing::debug!(counter = %block.counter, "Frame accepted");
        Ok(block)
    }
}
