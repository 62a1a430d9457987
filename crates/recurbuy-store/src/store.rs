//! Allocation store implementations.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use recurbuy_core::AllocationSettings;
use tracing::{debug, info};

use crate::error::StoreResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Durable home of the settings document.
pub trait AllocationStore: Send + Sync {
    /// Latest settings. A missing or empty document yields defaults.
    fn load(&self) -> BoxFuture<'_, StoreResult<AllocationSettings>>;

    /// Replace the whole document.
    fn save<'a>(&'a self, settings: &'a AllocationSettings) -> BoxFuture<'a, StoreResult<()>>;
}

/// Arc wrapper for store trait objects.
pub type DynStore = Arc<dyn AllocationStore>;

/// Serialize settings for storage: negative floor clamped, indented camelCase JSON.
pub fn encode_settings(settings: &AllocationSettings) -> StoreResult<String> {
    let normalized = settings.clone().normalized();
    Ok(serde_json::to_string_pretty(&normalized)?)
}

// =============================================================================
// File store
// =============================================================================

/// Settings document stored as a JSON file.
///
/// Writes go to a sibling temp file which is then renamed over the target, so a
/// reader never sees a partially written document.
#[derive(Debug, Clone)]
pub struct FileAllocationStore {
    path: PathBuf,
}

impl FileAllocationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "allocations.json".to_string());
        self.path
            .with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()))
    }

    async fn read_document(&self) -> StoreResult<AllocationSettings> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Settings document missing, using defaults");
                return Ok(AllocationSettings::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(AllocationSettings::from_document(&text)?)
    }

    async fn write_document(&self, settings: &AllocationSettings) -> StoreResult<()> {
        let body = encode_settings(settings)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        if let Err(e) = tokio::fs::write(&temp, body.as_bytes()).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        info!(
            path = %self.path.display(),
            allocations = settings.allocations.len(),
            "Settings document written"
        );
        Ok(())
    }
}

impl AllocationStore for FileAllocationStore {
    fn load(&self) -> BoxFuture<'_, StoreResult<AllocationSettings>> {
        Box::pin(self.read_document())
    }

    fn save<'a>(&'a self, settings: &'a AllocationSettings) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(self.write_document(settings))
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Settings document held in memory, with the same parsing as the file store.
#[derive(Debug, Default)]
pub struct InMemoryAllocationStore {
    document: parking_lot::Mutex<String>,
}

impl InMemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw document text (object or legacy array form).
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: parking_lot::Mutex::new(document.into()),
        }
    }

    /// Current raw document text.
    pub fn document(&self) -> String {
        self.document.lock().clone()
    }
}

impl AllocationStore for InMemoryAllocationStore {
    fn load(&self) -> BoxFuture<'_, StoreResult<AllocationSettings>> {
        Box::pin(async move {
            let text = self.document.lock().clone();
            Ok(AllocationSettings::from_document(&text)?)
        })
    }

    fn save<'a>(&'a self, settings: &'a AllocationSettings) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let body = encode_settings(settings)?;
            *self.document.lock() = body;
            Ok(())
        })
    }
}
