//! Process-wide schema holder with atomic snapshot replacement.
//!
//! Readers take an `Arc` snapshot and keep it for the whole request; a reload
//! builds the new registry completely before swapping the pointer, so no
//! reader ever sees a partially built schema.

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use tracing::{info, warn};

use crate::{SchemaRegistry, SiftConfig};

#[derive(Debug)]
pub struct SchemaHandle {
    current: RwLock<Arc<SchemaRegistry>>,
}

impl SchemaHandle {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// Builds a handle from the manifests named in `config`.
    pub fn from_config(config: &SiftConfig) -> Result<Self> {
        Ok(Self::new(SchemaRegistry::from_manifest_files(&config.manifests, config.output_naming)?))
    }

    /// Current snapshot. The returned `Arc` stays valid across reloads.
    pub fn snapshot(&self) -> Arc<SchemaRegistry> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Swaps in a new snapshot and returns the previous one.
    pub fn replace(&self, registry: Arc<SchemaRegistry>) -> Arc<SchemaRegistry> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, registry)
    }

    /// Rebuilds the registry from `config` and swaps it in.
    ///
    /// On failure the current snapshot stays in place and the error is returned.
    pub fn reload(&self, config: &SiftConfig) -> Result<()> {
        match SchemaRegistry::from_manifest_files(&config.manifests, config.output_naming) {
            Ok(registry) => {
                let actions = registry.actions().count();
                self.replace(Arc::new(registry));
                info!(actions, "schema registry reloaded");
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "schema reload failed; keeping current snapshot");
                Err(error)
            }
        }
    }
}
