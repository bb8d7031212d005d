//! In-memory document store with injectable read and write faults.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::dst::{FaultConfig, FaultInjector, FaultType, SimConfig};

use super::backend::{validate_user_id, Document, DocumentBackend};
use super::error::{StorageError, StorageResult};

type DocumentKey = (String, Document);

// =============================================================================
// SimStorageBackend
// =============================================================================

/// Documents held in a map keyed by user and document.
///
/// Clones share the map and the fault injector, so a test can keep a handle
/// for [`SimStorageBackend::snapshot`] after handing one to a session.
#[derive(Debug, Clone)]
pub struct SimStorageBackend {
    documents: Arc<RwLock<HashMap<DocumentKey, Vec<u8>>>>,
    fault_injector: Arc<FaultInjector>,
}

impl SimStorageBackend {
    /// Empty store whose fault rolls derive from `config`'s seed.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let mut rng = config.rng();
        Self::with_fault_injector(Arc::new(FaultInjector::new(rng.fork())))
    }

    /// Create a backend sharing an external fault injector (e.g. the one
    /// handed to `SimLLMProvider`).
    #[must_use]
    pub fn with_fault_injector(fault_injector: Arc<FaultInjector>) -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            fault_injector,
        }
    }

    /// Register a fault.
    ///
    /// # Panics
    /// Panics if the fault injector is already shared.
    #[must_use]
    pub fn with_faults(mut self, config: FaultConfig) -> Self {
        Arc::get_mut(&mut self.fault_injector)
            .expect("cannot add faults after backend is shared")
            .register(config);
        self
    }

    /// Get fault injector for inspection.
    #[must_use]
    pub fn fault_injector(&self) -> &Arc<FaultInjector> {
        &self.fault_injector
    }

    /// Raw bytes of a stored document, bypassing faults.
    #[must_use]
    pub fn snapshot(&self, user_id: &str, document: Document) -> Option<Vec<u8>> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(user_id.to_string(), document))
            .cloned()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn maybe_inject_fault(&self, operation: &str) -> StorageResult<Option<FaultType>> {
        match self.fault_injector.should_inject(operation) {
            Some(FaultType::StorageCorruption) => Ok(Some(FaultType::StorageCorruption)),
            Some(fault) => Err(StorageError::Injected {
                fault,
                operation: operation.to_string(),
            }),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DocumentBackend for SimStorageBackend {
    async fn read(&self, user_id: &str, document: Document) -> StorageResult<Option<Vec<u8>>> {
        validate_user_id(user_id)?;
        let fault = self.maybe_inject_fault(&format!("storage_read:{}", document.file_name()))?;

        let stored = self.snapshot(user_id, document);
        if fault == Some(FaultType::StorageCorruption) {
            return Ok(stored.map(|mut bytes| {
                bytes.truncate(bytes.len() / 2);
                bytes
            }));
        }
        Ok(stored)
    }

    async fn write(&self, user_id: &str, document: Document, bytes: &[u8]) -> StorageResult<()> {
        validate_user_id(user_id)?;
        // Corruption only applies to reads.
        let _ = self.maybe_inject_fault(&format!("storage_write:{}", document.file_name()))?;

        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((user_id.to_string(), document), bytes.to_vec());
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
