//! Backend selection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{StoreResult, UnknownStorageKind};
use crate::memory::{InMemoryContentStore, StoreOptions};
use crate::traits::ContentStore;

/// Which storage backend to run against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process-lifetime, in-memory tables.
    #[default]
    Memory,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = UnknownStorageKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            other => Err(UnknownStorageKind(other.to_string())),
        }
    }
}

/// Open a fresh store of the given kind behind the storage contract.
pub fn open_store(kind: StorageKind, options: StoreOptions) -> StoreResult<Arc<dyn ContentStore>> {
    match kind {
        StorageKind::Memory => {
            tracing::info!(
                backend = %kind,
                enforce_references = options.enforce_references,
                "opening content store"
            );
            Ok(Arc::new(InMemoryContentStore::with_options(options)))
        }
    }
}
