//! Remote command - authenticated one-shot commands for a radio remote
//!
//! Frames are AES-128-CTR encrypted and HMAC-SHA256 authenticated
//! (encrypt-then-MAC), and carry a persistent anti-replay counter that
//! only advances once the transport confirms delivery.

mod types;
mod counter;
mod keys;
mod crypto;
mod frame;
mod config;
mod medium;
mod store;
mod transport;
mod rendezvous;
mod transmitter;
mod verifier;

pub use types::*;
pub use counter::*;
pub use keys::*;
pub use crypto::*;
pub use frame::*;
pub use config::*;
pub use medium::*;
pub use store::*;
pub use transport::*;
pub use rendezvous::*;
pub use transmitter::*;
pub use verifier::*;
