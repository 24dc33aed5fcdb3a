//! In-process [`Datastore`] used by the adapter and seeder tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::Datastore;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Client, ClientPatch, NewClient, NewProject, Profile, ProfileUpdate, Project, ProjectPatch,
};

#[derive(Default)]
struct Tables {
    users: BTreeSet<String>,
    clients: Vec<Client>,
    projects: Vec<Project>,
    profiles: BTreeMap<String, Profile>,
}

#[derive(Default)]
pub(crate) struct MemoryDatastore {
    tables: Mutex<Tables>,
    fail_client_inserts: AtomicBool,
    fail_project_inserts: AtomicBool,
}

impl MemoryDatastore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_client_inserts(&self, fail: bool) {
        self.fail_client_inserts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_project_inserts(&self, fail: bool) {
        self.fail_project_inserts.store(fail, Ordering::SeqCst);
    }

    pub(crate) async fn guest_identities(&self) -> usize {
        self.tables.lock().await.users.len()
    }

    pub(crate) async fn total_rows(&self) -> (usize, usize) {
        let tables = self.tables.lock().await;
        (tables.clients.len(), tables.projects.len())
    }
}

fn newest_first<T>(mut rows: Vec<T>, created: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    rows.sort_by(|a, b| created(b).cmp(&created(a)));
    rows
}

fn check_client_ref(tables: &Tables, owner_id: &str, client_id: Option<&str>) -> StoreResult<()> {
    match client_id.filter(|id| !id.is_empty()) {
        Some(client_id)
            if !tables
                .clients
                .iter()
                .any(|c| c.id == client_id && c.owner_id.as_deref() == Some(owner_id)) =>
        {
            Err(StoreError::validation(format!("unknown client {client_id}")))
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn list_clients(&self, owner_id: &str) -> StoreResult<Vec<Client>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .clients
            .iter()
            .filter(|c| c.owner_id.as_deref() == Some(owner_id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |c: &Client| c.created_at))
    }

    async fn create_client(&self, owner_id: &str, client: &NewClient) -> StoreResult<Client> {
        Ok(self
            .insert_clients(owner_id, std::slice::from_ref(client))
            .await?
            .remove(0))
    }

    async fn update_client(
        &self,
        owner_id: &str,
        id: &str,
        patch: &ClientPatch,
    ) -> StoreResult<Client> {
        let mut tables = self.tables.lock().await;
        let slot = tables
            .clients
            .iter_mut()
            .find(|c| c.id == id && c.owner_id.as_deref() == Some(owner_id))
            .ok_or_else(|| StoreError::not_found("client", id))?;
        let mut updated = slot.clone();
        patch.apply(&mut updated, Utc::now())?;
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete_client(&self, owner_id: &str, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.clients.len();
        tables
            .clients
            .retain(|c| !(c.id == id && c.owner_id.as_deref() == Some(owner_id)));
        let removed = tables.clients.len() != before;
        if removed {
            for project in tables.projects.iter_mut() {
                if project.client_id.as_deref() == Some(id) {
                    project.client_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn count_clients(&self, owner_id: &str) -> StoreResult<u64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .clients
            .iter()
            .filter(|c| c.owner_id.as_deref() == Some(owner_id))
            .count() as u64)
    }

    async fn insert_clients(&self, owner_id: &str, clients: &[NewClient]) -> StoreResult<Vec<Client>> {
        if self.fail_client_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("insert into clients failed".into()));
        }
        for client in clients {
            client.validate()?;
        }
        let now = Utc::now();
        let created: Vec<Client> = clients
            .iter()
            .cloned()
            .map(|c| c.into_client(Uuid::new_v4().to_string(), Some(owner_id.to_string()), now))
            .collect();
        self.tables.lock().await.clients.extend(created.iter().cloned());
        Ok(created)
    }

    async fn list_projects(&self, owner_id: &str) -> StoreResult<Vec<Project>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .projects
            .iter()
            .filter(|p| p.owner_id.as_deref() == Some(owner_id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Project| p.created_at))
    }

    async fn create_project(&self, owner_id: &str, project: &NewProject) -> StoreResult<Project> {
        Ok(self
            .insert_projects(owner_id, std::slice::from_ref(project))
            .await?
            .remove(0))
    }

    async fn update_project(
        &self,
        owner_id: &str,
        id: &str,
        patch: &ProjectPatch,
    ) -> StoreResult<Project> {
        let mut tables = self.tables.lock().await;
        let mut updated = tables
            .projects
            .iter()
            .find(|p| p.id == id && p.owner_id.as_deref() == Some(owner_id))
            .cloned()
            .ok_or_else(|| StoreError::not_found("project", id))?;
        patch.apply(&mut updated, Utc::now())?;
        check_client_ref(&tables, owner_id, patch.assigned_client(&updated))?;
        if let Some(slot) = tables.projects.iter_mut().find(|p| p.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    async fn delete_project(&self, owner_id: &str, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.projects.len();
        tables
            .projects
            .retain(|p| !(p.id == id && p.owner_id.as_deref() == Some(owner_id)));
        Ok(tables.projects.len() != before)
    }

    async fn count_projects(&self, owner_id: &str) -> StoreResult<u64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .projects
            .iter()
            .filter(|p| p.owner_id.as_deref() == Some(owner_id))
            .count() as u64)
    }

    async fn insert_projects(
        &self,
        owner_id: &str,
        projects: &[NewProject],
    ) -> StoreResult<Vec<Project>> {
        if self.fail_project_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("insert into projects failed".into()));
        }
        let mut tables = self.tables.lock().await;
        for project in projects {
            project.validate()?;
            check_client_ref(&tables, owner_id, project.client_id.as_deref())?;
        }
        let now = Utc::now();
        let created: Vec<Project> = projects
            .iter()
            .cloned()
            .map(|p| p.into_project(Uuid::new_v4().to_string(), Some(owner_id.to_string()), now))
            .collect();
        tables.projects.extend(created.iter().cloned());
        Ok(created)
    }

    async fn get_profile(&self, owner_id: &str) -> StoreResult<Option<Profile>> {
        Ok(self.tables.lock().await.profiles.get(owner_id).cloned())
    }

    async fn upsert_profile(&self, owner_id: &str, update: &ProfileUpdate) -> StoreResult<Profile> {
        let mut tables = self.tables.lock().await;
        let mut profile = tables
            .profiles
            .get(owner_id)
            .cloned()
            .unwrap_or_else(|| Profile::empty(owner_id));
        update.apply(&mut profile, Utc::now())?;
        tables.profiles.insert(owner_id.to_string(), profile.clone());
        Ok(profile)
    }

    async fn provision_guest_identity(&self) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        self.tables.lock().await.users.insert(id.clone());
        Ok(id)
    }

    async fn remove_guest_identity(&self, id: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.users.remove(id);
        tables.clients.retain(|c| c.owner_id.as_deref() != Some(id));
        tables.projects.retain(|p| p.owner_id.as_deref() != Some(id));
        tables.profiles.remove(id);
        Ok(())
    }
}
