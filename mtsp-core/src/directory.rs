//! Capability directory boundary
//!
//! Agents advertise themselves under a service type on start and withdraw on
//! shutdown. The protocol itself never looks anything up here; the directory
//! exists for discovery by outside observers.

use crate::error::{MtspError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default service type advertised by every agent
pub const SERVICE_TYPE: &str = "travelling-salesman";

/// Default service name advertised by every agent
pub const SERVICE_NAME: &str = "mtsp-agent";

/// Advertised capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub service_type: String,
    pub name: String,
}

impl Default for ServiceDescription {
    fn default() -> Self {
        Self {
            service_type: SERVICE_TYPE.to_string(),
            name: SERVICE_NAME.to_string(),
        }
    }
}

/// Registration and lookup contract
#[async_trait]
pub trait Directory: Send + Sync + std::fmt::Debug {
    /// Advertise `services` for an agent, replacing any earlier entry
    async fn register(&self, agent: &str, services: Vec<ServiceDescription>) -> Result<()>;

    /// Withdraw an agent
    async fn deregister(&self, agent: &str) -> Result<()>;

    /// Agents advertising a service type, sorted by name
    async fn search(&self, service_type: &str) -> Result<Vec<String>>;
}

/// In-memory directory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    entries: Arc<RwLock<BTreeMap<String, Vec<ServiceDescription>>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn register(&self, agent: &str, services: Vec<ServiceDescription>) -> Result<()> {
        if agent.is_empty() {
            return Err(MtspError::Directory("agent name cannot be empty".to_string()));
        }
        self.entries.write().await.insert(agent.to_string(), services);
        Ok(())
    }

    async fn deregister(&self, agent: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .remove(agent)
            .map(|_| ())
            .ok_or_else(|| MtspError::Directory(format!("{} is not registered", agent)))
    }

    async fn search(&self, service_type: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|(_, services)| services.iter().any(|s| s.service_type == service_type))
            .map(|(agent, _)| agent.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_search_deregister() {
        let directory = InMemoryDirectory::new();
        directory.register("Salesman-1", vec![ServiceDescription::default()]).await.unwrap();
        directory.register("Salesman-0", vec![ServiceDescription::default()]).await.unwrap();
        directory
            .register(
                "Observer",
                vec![ServiceDescription {
                    service_type: "viewer".to_string(),
                    name: "console".to_string(),
                }],
            )
            .await
            .unwrap();

        assert_eq!(
            directory.search(SERVICE_TYPE).await.unwrap(),
            vec!["Salesman-0".to_string(), "Salesman-1".to_string()]
        );

        directory.deregister("Salesman-0").await.unwrap();
        assert_eq!(directory.search(SERVICE_TYPE).await.unwrap(), vec!["Salesman-1".to_string()]);
        assert!(directory.deregister("Salesman-0").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let directory = InMemoryDirectory::new();
        assert!(directory.register("", vec![]).await.is_err());
    }
}
