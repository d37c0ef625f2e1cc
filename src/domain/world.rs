//! Server Registry
//!
//! Maps server ids to names and data centers. Manual update requests fan out
//! to every server in the target's data center, and exception records carry
//! the (server, data center) context for inspection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::market::{ItemId, ServerId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub id: ServerId,
    pub name: String,
    pub data_center: String,
}

/// Immutable lookup table of tracked game servers, built from config.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    servers: HashMap<ServerId, ServerInfo>,
}

impl ServerRegistry {
    pub fn new(servers: Vec<ServerInfo>) -> Self {
        Self {
            servers: servers.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    pub fn get(&self, id: ServerId) -> Option<&ServerInfo> {
        self.servers.get(&id)
    }

    pub fn name(&self, id: ServerId) -> &str {
        self.servers.get(&id).map_or("unknown", |s| s.name.as_str())
    }

    pub fn data_center(&self, id: ServerId) -> &str {
        self.servers
            .get(&id)
            .map_or("unknown", |s| s.data_center.as_str())
    }

    /// All server ids sharing the given server's data center, the server
    /// itself included. Unknown servers fan out to themselves only.
    pub fn data_center_servers(&self, id: ServerId) -> Vec<ServerId> {
        match self.servers.get(&id) {
            Some(info) => {
                let mut ids: Vec<ServerId> = self
                    .servers
                    .values()
                    .filter(|s| s.data_center == info.data_center)
                    .map(|s| s.id)
                    .collect();
                ids.sort_unstable();
                ids
            }
            None => vec![id],
        }
    }

    /// Context string recorded with exceptions:
    /// "{item} : ({server}) {name} - {data center}".
    pub fn exception_context(&self, item: ItemId, server: ServerId) -> String {
        format!(
            "{} : ({}) {} - {}",
            item,
            server,
            self.name(server),
            self.data_center(server)
        )
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
