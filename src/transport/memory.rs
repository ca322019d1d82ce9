//! In-memory transport
//!
//! Behaves like the REST backend (sequential integer ids, 404 for unknown
//! ids) without a network. Backs `--offline` and the controller tests.

use super::{Transport, TransportError};
use crate::resource::{Record, RecordId};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<Record>,
    next_id: i64,
    options: HashMap<String, Vec<Value>>,
}

#[derive(Debug)]
pub struct MemoryTransport {
    endpoint: String,
    state: Mutex<MemoryState>,
}

impl MemoryTransport {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            state: Mutex::new(MemoryState {
                next_id: 1,
                ..MemoryState::default()
            }),
        }
    }

    /// Start with existing records; ids already present are kept
    pub fn with_records(endpoint: &str, records: Vec<Record>) -> Self {
        let next_id = records
            .iter()
            .filter_map(|r| match r.id {
                Some(RecordId::Int(n)) => Some(n),
                _ => None,
            })
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            endpoint: endpoint.to_string(),
            state: Mutex::new(MemoryState {
                records,
                next_id,
                options: HashMap::new(),
            }),
        }
    }

    /// Serve `values` as the option list at `path`
    pub fn with_options(self, path: &str, values: Vec<Value>) -> Self {
        self.state().options.insert(path.to_string(), values);
        self
    }

    /// Number of records currently held by the "backend"
    pub fn len(&self) -> usize {
        self.state().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn not_found(&self, id: &RecordId) -> TransportError {
        TransportError::NotFound(format!("{}/{}", self.endpoint, id))
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn list(&self) -> Result<Vec<Record>, TransportError> {
        Ok(self.state().records.clone())
    }

    async fn create(&self, record: &Record) -> Result<Record, TransportError> {
        let mut state = self.state();
        let mut created = record.clone();
        created.id = Some(RecordId::Int(state.next_id));
        state.next_id += 1;
        state.records.push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: &RecordId,
        record: &Record,
    ) -> Result<Option<Record>, TransportError> {
        let mut state = self.state();
        let Some(slot) = state.records.iter_mut().find(|r| r.id.as_ref() == Some(id)) else {
            return Err(self.not_found(id));
        };
        let mut updated = record.clone();
        updated.id = Some(id.clone());
        *slot = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: &RecordId) -> Result<(), TransportError> {
        let mut state = self.state();
        let before = state.records.len();
        state.records.retain(|r| r.id.as_ref() != Some(id));
        if state.records.len() == before {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    async fn options(&self, path: &str) -> Result<Vec<Value>, TransportError> {
        Ok(self.state().options.get(path).cloned().unwrap_or_default())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
