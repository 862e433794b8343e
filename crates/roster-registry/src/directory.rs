//! Client directory
//!
//! TigerStyle: One owner per client record.
//!
//! The directory owns every [`Client`] in a single table keyed by id. The
//! tenant index maps tenant names to the ids they own and never holds client
//! data, so the two views cannot disagree about a client's contents.
//!
//! The directory is not synchronized; callers wrap it in a lock.

use crate::client::{Client, ClientId};
use crate::error::{RegistryError, RegistryResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Default)]
pub struct Directory {
    clients: HashMap<ClientId, Client>,
    tenants: BTreeMap<String, BTreeSet<ClientId>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn get_mut(&mut self, id: &ClientId) -> Option<&mut Client> {
        self.clients.get_mut(id)
    }

    /// Insert or replace a client, creating its tenant if needed
    pub fn insert(&mut self, client: Client) {
        let id = client.client_id().clone();
        let tenant = client.tenant().to_string();

        if let Some(previous) = self.clients.get(&id) {
            if previous.tenant() != tenant {
                let previous_tenant = previous.tenant().to_string();
                if let Some(ids) = self.tenants.get_mut(&previous_tenant) {
                    ids.remove(&id);
                }
            }
        }

        self.tenants.entry(tenant).or_default().insert(id.clone());
        self.clients.insert(id, client);
    }

    /// Remove a client from the table and from whichever tenant holds it
    ///
    /// The tenant itself is kept even when it becomes empty.
    pub fn remove(&mut self, id: &ClientId) -> Option<Client> {
        let client = self.clients.remove(id)?;
        if let Some(ids) = self.tenants.get_mut(client.tenant()) {
            ids.remove(id);
        }
        Some(client)
    }

    /// All clients, unordered
    pub fn list(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Ids owned by a tenant
    pub fn tenant_ids(&self, tenant: &str) -> RegistryResult<&BTreeSet<ClientId>> {
        self.tenants
            .get(tenant)
            .ok_or_else(|| RegistryError::tenant_not_found(tenant))
    }

    /// Clients owned by a tenant, in id order
    pub fn tenant_clients(&self, tenant: &str) -> RegistryResult<Vec<&Client>> {
        let ids = self.tenant_ids(tenant)?;
        Ok(ids.iter().filter_map(|id| self.clients.get(id)).collect())
    }

    /// Known tenant names, sorted
    pub fn tenant_names(&self) -> impl Iterator<Item = &str> {
        self.tenants.keys().map(String::as_str)
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    /// Flag every client of a tenant as dirty
    pub fn mark_tenant_dirty(&mut self, tenant: &str) {
        let Some(ids) = self.tenants.get(tenant) else {
            return;
        };
        for id in ids {
            if let Some(client) = self.clients.get_mut(id) {
                client.set_dirty(true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Metadata;

    fn client(id: &str, tenant: &str) -> Client {
        Client::new(ClientId::new(id), "SVC", tenant, vec![], Metadata::new(), 0)
    }

    #[test]
    fn test_insert_creates_tenant_lazily() {
        let mut dir = Directory::new();
        assert!(matches!(
            dir.tenant_ids("acme"),
            Err(RegistryError::TenantNotFound { .. })
        ));

        dir.insert(client("a", "acme"));
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.tenant_ids("acme").unwrap().len(), 1);
        assert_eq!(dir.tenant_names().collect::<Vec<_>>(), vec!["acme"]);
    }

    #[test]
    fn test_remove_keeps_empty_tenant() {
        let mut dir = Directory::new();
        dir.insert(client("a", "acme"));
        let removed = dir.remove(&ClientId::new("a")).unwrap();
        assert_eq!(removed.client_id().as_str(), "a");
        assert!(dir.is_empty());
        assert!(dir.tenant_ids("acme").unwrap().is_empty());
        assert_eq!(dir.tenant_count(), 1);
        assert!(dir.remove(&ClientId::new("a")).is_none());
    }

    #[test]
    fn test_views_stay_consistent() {
        let mut dir = Directory::new();
        dir.insert(client("a", "acme"));
        dir.insert(client("b", "acme"));
        dir.insert(client("c", "globex"));
        dir.remove(&ClientId::new("b"));

        // Every table entry is indexed exactly once, every index entry resolves
        let indexed: usize = dir
            .tenant_names()
            .map(|t| dir.tenant_ids(t).unwrap().len())
            .sum();
        assert_eq!(indexed, dir.len());
        for tenant in dir.tenant_names() {
            for id in dir.tenant_ids(tenant).unwrap() {
                assert_eq!(dir.get(id).unwrap().tenant(), tenant);
            }
        }
    }

    #[test]
    fn test_reinsert_moves_between_tenants() {
        let mut dir = Directory::new();
        dir.insert(client("a", "acme"));
        dir.insert(client("a", "globex"));
        assert_eq!(dir.len(), 1);
        assert!(dir.tenant_ids("acme").unwrap().is_empty());
        assert_eq!(dir.tenant_clients("globex").unwrap().len(), 1);
    }

    #[test]
    fn test_mark_tenant_dirty_is_scoped() {
        let mut dir = Directory::new();
        dir.insert(client("a", "acme"));
        dir.insert(client("b", "globex"));
        for id in ["a", "b"] {
            dir.get_mut(&ClientId::new(id)).unwrap().set_dirty(false);
        }

        dir.mark_tenant_dirty("acme");
        assert!(dir.get(&ClientId::new("a")).unwrap().is_dirty());
        assert!(!dir.get(&ClientId::new("b")).unwrap().is_dirty());

        // Unknown tenant is a no-op
        dir.mark_tenant_dirty("initech");
    }
}
