use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{KeyValueStore, Store, StoreMode};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Client, ClientPatch, NewClient, NewProject, Profile, ProfileUpdate, Project, ProjectPatch,
};

pub const GUEST_CLIENTS_KEY: &str = "freelancehub_guest_clients";
pub const GUEST_PROJECTS_KEY: &str = "freelancehub_guest_projects";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Guest-session adapter. Each entity type is one JSON array under a fixed key.
pub struct GuestStore {
    kv: Arc<dyn KeyValueStore>,
}

impl GuestStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Drops both namespaces.
    pub fn clear_all(&self) -> StoreResult<()> {
        self.kv.remove(GUEST_CLIENTS_KEY)?;
        self.kv.remove(GUEST_PROJECTS_KEY)?;
        info!("guest data cleared");
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Vec<T>> {
        match self.kv.get(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save<T: Serialize>(&self, key: &str, rows: &[T]) -> StoreResult<()> {
        self.kv.set(key, &serde_json::to_string(rows)?)
    }
}

/// `guest_<entity>_<unix millis>_<9 base36 chars>`
pub(crate) fn guest_id(entity: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("guest_{entity}_{}_{suffix}", Utc::now().timestamp_millis())
}

#[async_trait]
impl Store for GuestStore {
    fn mode(&self) -> StoreMode {
        StoreMode::GuestLocal
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        self.load(GUEST_CLIENTS_KEY)
    }

    async fn create_client(&self, client: NewClient) -> StoreResult<Client> {
        client.validate()?;
        let mut clients: Vec<Client> = self.load(GUEST_CLIENTS_KEY)?;
        let created = client.into_client(guest_id("client"), None, Utc::now());
        clients.push(created.clone());
        self.save(GUEST_CLIENTS_KEY, &clients)?;
        debug!(id = %created.id, "guest client created");
        Ok(created)
    }

    async fn update_client(&self, id: &str, patch: ClientPatch) -> StoreResult<Client> {
        let mut clients: Vec<Client> = self.load(GUEST_CLIENTS_KEY)?;
        let slot = clients
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found("client", id))?;
        let mut updated = slot.clone();
        patch.apply(&mut updated, Utc::now())?;
        *slot = updated.clone();
        self.save(GUEST_CLIENTS_KEY, &clients)?;
        Ok(updated)
    }

    async fn delete_client(&self, id: &str) -> StoreResult<bool> {
        let clients: Vec<Client> = self.load(GUEST_CLIENTS_KEY)?;
        let before = clients.len();
        let remaining: Vec<Client> = clients.into_iter().filter(|c| c.id != id).collect();
        if remaining.len() == before {
            return Ok(false);
        }
        self.save(GUEST_CLIENTS_KEY, &remaining)?;

        let mut projects: Vec<Project> = self.load(GUEST_PROJECTS_KEY)?;
        let mut unassigned = 0;
        for project in projects.iter_mut().filter(|p| p.client_id.as_deref() == Some(id)) {
            project.client_id = None;
            unassigned += 1;
        }
        if unassigned > 0 {
            self.save(GUEST_PROJECTS_KEY, &projects)?;
            debug!(client_id = id, unassigned, "projects unassigned from deleted client");
        }
        Ok(true)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.load(GUEST_PROJECTS_KEY)
    }

    async fn create_project(&self, project: NewProject) -> StoreResult<Project> {
        project.validate()?;
        let mut projects: Vec<Project> = self.load(GUEST_PROJECTS_KEY)?;
        let created = project.into_project(guest_id("project"), None, Utc::now());
        projects.push(created.clone());
        self.save(GUEST_PROJECTS_KEY, &projects)?;
        debug!(id = %created.id, "guest project created");
        Ok(created)
    }

    async fn update_project(&self, id: &str, patch: ProjectPatch) -> StoreResult<Project> {
        let mut projects: Vec<Project> = self.load(GUEST_PROJECTS_KEY)?;
        let slot = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("project", id))?;
        let mut updated = slot.clone();
        patch.apply(&mut updated, Utc::now())?;
        *slot = updated.clone();
        self.save(GUEST_PROJECTS_KEY, &projects)?;
        Ok(updated)
    }

    async fn delete_project(&self, id: &str) -> StoreResult<bool> {
        let projects: Vec<Project> = self.load(GUEST_PROJECTS_KEY)?;
        let before = projects.len();
        let remaining: Vec<Project> = projects.into_iter().filter(|p| p.id != id).collect();
        if remaining.len() == before {
            return Ok(false);
        }
        self.save(GUEST_PROJECTS_KEY, &remaining)?;
        Ok(true)
    }

    // Profiles belong to accounts; a local guest has none.
    async fn get_profile(&self) -> StoreResult<Option<Profile>> {
        Err(StoreError::Unauthorized)
    }

    async fn update_profile(&self, _update: ProfileUpdate) -> StoreResult<Profile> {
        Err(StoreError::Unauthorized)
    }
}
