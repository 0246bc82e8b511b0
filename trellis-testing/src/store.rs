// In-memory data access for tests

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use trellis_core::{DataAccess, Error, Record};

/// A [`DataAccess`] backed by a map, recording every lookup
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<(String, String), Record>>>,
    lookups: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + Sync + 'static>(&self, model: &str, pk: impl ToString, object: T) -> &Self {
        self.records
            .lock()
            .insert((model.to_string(), pk.to_string()), Arc::new(object));
        self
    }

    pub fn remove(&self, model: &str, pk: &str) -> bool {
        self.records
            .lock()
            .remove(&(model.to_string(), pk.to_string()))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// `(model, pk)` of every fetch so far, in order
    pub fn lookups(&self) -> Vec<(String, String)> {
        self.lookups.lock().clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().len()
    }

    pub fn into_data_access(self) -> Arc<dyn DataAccess> {
        Arc::new(self)
    }
}

impl DataAccess for MemoryStore {
    fn fetch(&self, model: &str, pk: &str) -> Result<Option<Record>, Error> {
        self.lookups.lock().push((model.to_string(), pk.to_string()));
        Ok(self
            .records
            .lock()
            .get(&(model.to_string(), pk.to_string()))
            .cloned())
    }
}

/// Records named events, e.g. the order hooks ran in
#[derive(Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn was_called(&self, call: &str) -> bool {
        self.calls.lock().iter().any(|c| c == call)
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}
