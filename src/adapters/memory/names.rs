//! In-memory name-identity registry.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::market::ServerId;
use crate::ports::repository::{NameRegistryPort, RepositoryError};

/// Lookup-or-create (name, server) mapping. Ids are created lazily on first
/// sighting and never change afterwards.
#[derive(Debug, Default)]
pub struct MemoryNameRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    ids: HashMap<(ServerId, String), String>,
    next: u64,
}

impl MemoryNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().ids.is_empty()
    }
}

#[async_trait]
impl NameRegistryPort for MemoryNameRegistry {
    async fn resolve(
        &self,
        server: ServerId,
        name: &str,
    ) -> Result<Option<String>, RepositoryError> {
        if name.is_empty() {
            return Ok(None);
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some(id) = inner.ids.get(&(server, name.to_string())) {
            return Ok(Some(id.clone()));
        }

        inner.next += 1;
        let id = format!("{:08x}", inner.next);
        inner.ids.insert((server, name.to_string()), id.clone());
        Ok(Some(id))
    }
}
