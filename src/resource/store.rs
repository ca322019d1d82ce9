//! Resource Store
//!
//! Client-side cache of one resource type's records. All record set
//! mutations go through here, and only after the transport has confirmed
//! them, so a failed call never leaves the list half-updated.
//!
//! Update and delete hold a per-id in-flight marker for the duration of
//! the transport call; a second call for the same id fails fast with
//! [`StoreError::Busy`] instead of racing the first one.

use super::record::{Record, RecordId};
use crate::transport::{Transport, TransportError};
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Default bound on a single transport call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("record {0} already has an operation in flight")]
    Busy(RecordId),

    #[error("record has no id")]
    MissingId,

    #[error("record {0} is not in the list")]
    UnknownRecord(RecordId),
}

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<Record>,
    in_flight: HashSet<RecordId>,
}

/// Cheap to clone; clones share the same record set
#[derive(Debug, Clone)]
pub struct ResourceStore {
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<StoreState>>,
    timeout: Duration,
}

/// Clears the in-flight marker when the operation finishes, however it finishes
struct InFlight {
    state: Arc<Mutex<StoreState>>,
    id: RecordId,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.state).in_flight.remove(&self.id);
    }
}

fn lock(state: &Mutex<StoreState>) -> MutexGuard<'_, StoreState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ResourceStore {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(StoreState::default())),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the current record set
    pub fn records(&self) -> Vec<Record> {
        lock(&self.state).records.clone()
    }

    pub fn get(&self, id: &RecordId) -> Option<Record> {
        lock(&self.state)
            .records
            .iter()
            .find(|r| r.id.as_ref() == Some(id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_pending(&self, id: &RecordId) -> bool {
        lock(&self.state).in_flight.contains(id)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.state).in_flight.len()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Replace the record set with the backend's list
    pub async fn load(&self) -> Result<Vec<Record>, StoreError> {
        let records = self.bounded(self.transport.list()).await?;

        if let Some(bad) = records.iter().find(|r| !r.is_persisted()) {
            tracing::warn!("{} listed a record without id: {}", self.transport.endpoint(), bad.to_json());
            return Err(TransportError::Decode("listed record has no id".to_string()).into());
        }

        tracing::info!("Loaded {} records from {}", records.len(), self.transport.endpoint());
        lock(&self.state).records = records.clone();
        Ok(records)
    }

    /// Create `record` and append the backend's copy
    pub async fn create(&self, record: &Record) -> Result<Record, StoreError> {
        let mut body = record.clone();
        body.id = None;

        let created = self.bounded(self.transport.create(&body)).await?;
        if !created.is_persisted() {
            return Err(TransportError::Decode("created record has no id".to_string()).into());
        }

        tracing::info!(
            "Created {} in {}",
            created.id.as_ref().map(ToString::to_string).unwrap_or_default(),
            self.transport.endpoint()
        );
        lock(&self.state).records.push(created.clone());
        Ok(created)
    }

    /// Replace an existing record in place
    pub async fn update(&self, record: &Record) -> Result<Record, StoreError> {
        let id = match &record.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => return Err(StoreError::MissingId),
        };
        if self.get(&id).is_none() {
            return Err(StoreError::UnknownRecord(id));
        }

        let _in_flight = self.begin(&id)?;
        let returned = self.bounded(self.transport.update(&id, record)).await?;

        // The slot is keyed by the id that was sent, whatever the echo says
        let mut updated = returned.unwrap_or_else(|| record.clone());
        if updated.id.as_ref().is_some_and(|echoed| echoed != &id) {
            tracing::warn!(
                "{} answered update of {} with id {}; keeping {}",
                self.transport.endpoint(),
                id,
                updated.id.as_ref().map(ToString::to_string).unwrap_or_default(),
                id
            );
        }
        updated.id = Some(id.clone());

        let mut state = lock(&self.state);
        match state.records.iter_mut().find(|r| r.id.as_ref() == Some(&id)) {
            Some(slot) => *slot = updated.clone(),
            None => tracing::warn!("Record {} vanished from the list during update", id),
        }
        drop(state);

        tracing::info!("Updated {} in {}", id, self.transport.endpoint());
        Ok(updated)
    }

    /// Delete a record. Unknown ids still go to the backend so it can
    /// report them as not found.
    pub async fn remove(&self, id: &RecordId) -> Result<(), StoreError> {
        let _in_flight = self.begin(id)?;
        self.bounded(self.transport.delete(id)).await?;

        lock(&self.state)
            .records
            .retain(|r| r.id.as_ref() != Some(id));

        tracing::info!("Deleted {} from {}", id, self.transport.endpoint());
        Ok(())
    }

    /// Option list served below this store's endpoint
    pub async fn fetch_options(&self, path: &str) -> Result<Vec<Value>, StoreError> {
        let options = self.bounded(self.transport.options(path)).await?;
        tracing::debug!("Fetched {} options from {}/{}", options.len(), self.transport.endpoint(), path);
        Ok(options)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn begin(&self, id: &RecordId) -> Result<InFlight, StoreError> {
        let mut state = lock(&self.state);
        if !state.in_flight.insert(id.clone()) {
            tracing::debug!("Rejected operation on busy record {}", id);
            return Err(StoreError::Busy(id.clone()));
        }
        Ok(InFlight {
            state: Arc::clone(&self.state),
            id: id.clone(),
        })
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "Request to {} timed out after {:?}",
                    self.transport.endpoint(),
                    self.timeout
                );
                Err(TransportError::Timeout(self.timeout))
            },
        }
    }
}
