//! Byte-addressable persistent storage media.
//!
//! The counter store only needs three operations from its medium: a
//! readiness probe, a bounded read and a bounded write. Implementations
//! decide what "durable" means for them.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::RwLock;

use crate::types::{RemoteError, Result};

/// Value of an erased storage cell.
pub const ERASED_BYTE: u8 = 0xFF;

/// Trait for byte-addressable persistent storage.
#[async_trait::async_trait]
pub trait StorageMedium: Send + Sync {
    /// Performs a single readiness probe.
    async fn is_ready(&self) -> bool;

    /// Reads `len` bytes starting at `offset`.
    async fn read(&self, offset: u16, len: usize) -> Result<Vec<u8>>;

    /// Writes `data` starting at `offset`.
    async fn write(&self, offset: u16, data: &[u8]) -> Result<()>;
}

fn check_bounds(offset: u16, len: usize, size: usize) -> std::result::Result<(), String> {
    match (offset as usize).checked_add(len) {
        Some(end) if end <= size => Ok(()),
        Some(end) => Err(format!(
            "range 0x{:02X}..0x{:02X} exceeds medium size {}",
            offset, end, size
        )),
        None => Err(format!(
            "length {} at 0x{:02X} overflows the address space",
            len, offset
        )),
    }
}

// ============================================================================
// In-memory medium
// ============================================================================

/// Faults an [`InMemoryMedium`] can be told to produce.
#[derive(Debug, Clone, Default)]
pub struct MediumFaults {
    /// Every readiness probe fails.
    pub unavailable: bool,
    /// Every read fails.
    pub fail_reads: bool,
    /// Reads starting at this offset fail.
    pub fail_reads_at: Option<u16>,
    /// Every write fails.
    pub fail_writes: bool,
    /// Writes starting at this offset fail.
    pub fail_writes_at: Option<u16>,
    /// Readiness probes fail once any write has been committed.
    pub busy_after_write: bool,
}

/// In-memory implementation of StorageMedium (for testing).
///
/// Clones share the same cells, so a test can keep a handle while the
/// store owns another.
#[derive(Debug, Clone)]
pub struct InMemoryMedium {
    cells: Arc<RwLock<Vec<u8>>>,
    faults: Arc<RwLock<MediumFaults>>,
    writes: Arc<RwLock<Vec<(u16, Vec<u8>)>>>,
}

impl InMemoryMedium {
    /// Creates an erased medium of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self::with_contents(vec![ERASED_BYTE; size])
    }

    /// Creates a medium holding `contents`.
    pub fn with_contents(contents: Vec<u8>) -> Self {
        Self {
            cells: Arc::new(RwLock::new(contents)),
            faults: Arc::new(RwLock::new(MediumFaults::default())),
            writes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Replaces the active fault set.
    pub async fn set_faults(&self, faults: MediumFaults) {
        *self.faults.write().await = faults;
    }

    /// Returns a copy of the raw cells.
    pub async fn snapshot(&self) -> Vec<u8> {
        self.cells.read().await.clone()
    }

    /// Returns every committed write as (offset, data), oldest first.
    pub async fn write_log(&self) -> Vec<(u16, Vec<u8>)> {
        self.writes.read().await.clone()
    }
}

#[async_trait::async_trait]
impl StorageMedium for InMemoryMedium {
    async fn is_ready(&self) -> bool {
        let faults = self.faults.read().await;
        if faults.unavailable {
            return false;
        }
        !(faults.busy_after_write && !self.writes.read().await.is_empty())
    }

    async fn read(&self, offset: u16, len: usize) -> Result<Vec<u8>> {
        {
            let faults = self.faults.read().await;
            if faults.fail_reads || faults.fail_reads_at == Some(offset) {
                return Err(RemoteError::ReadFailed(format!(
                    "injected read fault at 0x{:02X}",
                    offset
                )));
            }
        }

        let cells = self.cells.read().await;
        check_bounds(offset, len, cells.len()).map_err(RemoteError::ReadFailed)?;

        let start = offset as usize;
        Ok(cells[start..start + len].to_vec())
    }

    async fn write(&self, offset: u16, data: &[u8]) -> Result<()> {
        {
            let faults = self.faults.read().await;
            if faults.fail_writes || faults.fail_writes_at == Some(offset) {
                return Err(RemoteError::WriteFailed(format!(
                    "injected write fault at 0x{:02X}",
                    offset
                )));
            }
        }

        let mut cells = self.cells.write().await;
        check_bounds(offset, data.len(), cells.len()).map_err(RemoteError::WriteFailed)?;

        let start = offset as usize;
        cells[start..start + data.len()].copy_from_slice(data);
        self.writes.write().await.push((offset, data.to_vec()));
        Ok(())
    }
}

// ============================================================================
// File-backed medium
// ============================================================================

/// Storage medium backed by a fixed-size image file.
///
/// Every write is flushed to disk before it is acknowledged.
#[derive(Debug, Clone)]
pub struct FileMedium {
    path: PathBuf,
    size: usize,
}

impl FileMedium {
    /// Opens the image at `path`, creating an erased image of `size` bytes
    /// if the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if tokio::fs::metadata(&path).await.is_err() {
            tokio::fs::write(&path, vec![ERASED_BYTE; size])
                .await
                .map_err(|e| {
                    RemoteError::StoreUnavailable(format!(
                        "cannot create {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            tracing::info!(path = %path.display(), size, "Created erased storage image");
        }

        Ok(Self { path, size })
    }

    /// Path of the backing image.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl StorageMedium for FileMedium {
    async fn is_ready(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn read(&self, offset: u16, len: usize) -> Result<Vec<u8>> {
        check_bounds(offset, len, self.size).map_err(RemoteError::ReadFailed)?;

        let mut file = OpenOptions::new()
            .read(true)
            .open(&self.path)
            .await
            .map_err(|e| RemoteError::ReadFailed(format!("open failed: {}", e)))?;

        file.seek(SeekFrom::Start(offset as u64))
            .await
            .map_err(|e| RemoteError::ReadFailed(format!("seek failed: {}", e)))?;

        let mut data = vec![0u8; len];
        file.read_exact(&mut data)
            .await
            .map_err(|e| RemoteError::ReadFailed(format!("read failed: {}", e)))?;
        Ok(data)
    }

    async fn write(&self, offset: u16, data: &[u8]) -> Result<()> {
        check_bounds(offset, data.len(), self.size).map_err(RemoteError::WriteFailed)?;

        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await
            .map_err(|e| RemoteError::WriteFailed(format!("open failed: {}", e)))?;

        file.seek(SeekFrom::Start(offset as u64))
            .await
            .map_err(|e| RemoteError::WriteFailed(format!("seek failed: {}", e)))?;
        file.write_all(data)
            .await
            .map_err(|e| RemoteError::WriteFailed(format!("write failed: {}", e)))?;
        file.sync_data()
            .await
            .map_err(|e| RemoteError::WriteFailed(format!("sync failed: {}", e)))?;
        Ok(())
    }
}
