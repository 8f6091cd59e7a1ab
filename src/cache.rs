//! Per-type cache of remote inventory.
//!
//! Each resource type's inventory is fetched at most once per
//! [`RemoteInventory`]. Concurrent first requests for a type wait on the same
//! fetch. Different types fetch independently, and a failed fetch leaves only
//! that type's slot empty.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::providers::{Provider, ProviderError, RemoteEntry};

/// Inventory as written to disk: resource type to entries.
pub type InventorySnapshot = BTreeMap<String, Vec<RemoteEntry>>;

type Slot = Arc<OnceCell<Arc<Vec<RemoteEntry>>>>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("inventory snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("inventory snapshot {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default)]
pub struct RemoteInventory {
    slots: Mutex<HashMap<String, Slot>>,
}

impl RemoteInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the cache with inventory fetched out-of-band. Seeded types are
    /// never fetched.
    pub fn from_snapshot(snapshot: InventorySnapshot) -> Self {
        let slots = snapshot
            .into_iter()
            .map(|(resource_type, entries)| {
                let slot = Arc::new(OnceCell::new_with(Some(Arc::new(entries))));
                (resource_type, slot)
            })
            .collect();
        Self {
            slots: Mutex::new(slots),
        }
    }

    /// The inventory for `resource_type`, fetching it from `provider` on
    /// first use.
    pub async fn entries(
        &self,
        resource_type: &str,
        provider: &dyn Provider,
    ) -> Result<Arc<Vec<RemoteEntry>>, ProviderError> {
        let slot = self.slot(resource_type);

        let entries = slot
            .get_or_try_init(|| async {
                tracing::info!(
                    resource_type,
                    provider = provider.name(),
                    "fetching remote inventory"
                );
                let entries = provider.fetch_remote(resource_type).await?;
                tracing::info!(resource_type, count = entries.len(), "remote inventory cached");
                Ok::<_, ProviderError>(Arc::new(entries))
            })
            .await
            .inspect_err(|e| tracing::warn!(resource_type, error = %e, "remote fetch failed"))?;

        Ok(Arc::clone(entries))
    }

    /// Already-fetched inventory for `resource_type`, without fetching.
    pub fn cached(&self, resource_type: &str) -> Option<Arc<Vec<RemoteEntry>>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(resource_type)
            .and_then(|slot| slot.get())
            .map(Arc::clone)
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .iter()
            .filter_map(|(resource_type, slot)| {
                slot.get()
                    .map(|entries| (resource_type.clone(), entries.as_ref().clone()))
            })
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let text = std::fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: InventorySnapshot =
            serde_json::from_str(&text).map_err(|source| CacheError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(
            path = %path.display(),
            types = snapshot.len(),
            "loaded inventory snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let io_err = |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot()).map_err(|source| {
            CacheError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// `<user cache dir>/geoengineer/inventory.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("geoengineer").join("inventory.json"))
    }

    fn slot(&self, resource_type: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(resource_type.to_string()).or_default())
    }
}
