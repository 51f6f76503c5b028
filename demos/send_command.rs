//! Send one command from a provisioned remote and verify it as the receiver.
//!
//! Usage: send_command [COMMAND] [STORAGE_IMAGE]
//!
//! The storage image is created erased on first run, so running the demo
//! repeatedly shows the counter advancing across restarts.

use remote_command::{
    CommandVerifier, DeviceConfig, FileMedium, FrameCodec, Invocation, ProvisioningRecord,
    SimTransport, Transmitter, STORE_FOOTPRINT,
};
use tracing_subscriber::EnvFilter;

const RECORD_JSON: &str = r#"{
    "name": "gate-remote-1",
    "remote_id": "0102030405060708",
    "aes_key": "000102030405060708090a0b0c0d0e0f",
    "hmac_key": "202122232425262728292a2b2c2d2e2f303132333435363738393a3b3c3d3e3f",
    "iv": "f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff"
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "open".to_string());
    let image = args
        .next()
        .unwrap_or_else(|| std::env::temp_dir().join("remote-eeprom.bin").display().to_string());

    let record: ProvisioningRecord = serde_json::from_str(RECORD_JSON)?;
    let config = DeviceConfig::from_record(&record)?;
    println!(
        "Remote {} ({})",
        config.name.as_deref().unwrap_or("unnamed"),
        record.remote_id
    );

    let medium = FileMedium::open(&image, STORE_FOOTPRINT).await?;
    println!("Counter storage at {}", medium.path().display());
    let mut transmitter = Transmitter::new(config, medium, SimTransport::confirming());

    match transmitter.send_command(command.as_bytes()).await? {
        Invocation::Delivered { counter, next } => {
            println!("Delivered with counter {}, next is {}", counter, next)
        }
        Invocation::DeliveredCounterNotAdvanced { counter, error } => {
            println!("Delivered with counter {}, but counter not advanced: {}", counter, error)
        }
        Invocation::TimedOut { counter } => println!("Timed out with counter {}", counter),
    }

    if let Some(outcome) = transmitter.bootstrap_outcome() {
        println!("Counter storage: {:?}", outcome);
    }

    let config = transmitter.config();
    let codec = FrameCodec::with_max_frame_size(config.keys.clone(), config.max_frame_size);
    let mut verifier = CommandVerifier::new(codec, config.identity);

    for frame in transmitter.transport().sent_frames().await {
        println!("Frame ({} bytes): {}", frame.len(), hex::encode(&frame));
        let block = verifier.verify(&frame)?;
        println!(
            "Receiver accepted {:?} at counter {}",
            block.command_text().unwrap_or("<binary>"),
            block.counter
        );
    }

    Ok(())
}
