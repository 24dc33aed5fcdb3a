//! Data access for clients and projects.
//!
//! Two adapters share the [`Store`] contract: [`RemoteStore`] for identities
//! backed by the datastore and [`GuestStore`] for guest sessions that live only
//! in the local key-value store. [`open_store`] is the one place that picks
//! between them.

mod guest;
pub mod kv;
#[cfg(test)]
pub(crate) mod memory;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::identity::Identity;
use crate::models::{
    Client, ClientPatch, NewClient, NewProject, Profile, ProfileUpdate, Project, ProjectPatch,
};

pub use guest::{GUEST_CLIENTS_KEY, GUEST_PROJECTS_KEY, GuestStore};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use remote::RemoteStore;

/// Key under which a seeded guest's backing identity id is remembered.
pub const GUEST_USER_ID_KEY: &str = "guestUserId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreMode {
    Remote { owner_id: String },
    GuestLocal,
}

/// Client/project CRUD for the current session.
///
/// `update_*` on a missing id is `NotFound`; `delete_*` on a missing id is
/// `Ok(false)`.
#[async_trait]
pub trait Store: Send + Sync {
    fn mode(&self) -> StoreMode;

    async fn list_clients(&self) -> StoreResult<Vec<Client>>;
    async fn create_client(&self, client: NewClient) -> StoreResult<Client>;
    async fn update_client(&self, id: &str, patch: ClientPatch) -> StoreResult<Client>;
    async fn delete_client(&self, id: &str) -> StoreResult<bool>;

    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    async fn create_project(&self, project: NewProject) -> StoreResult<Project>;
    async fn update_project(&self, id: &str, patch: ProjectPatch) -> StoreResult<Project>;
    async fn delete_project(&self, id: &str) -> StoreResult<bool>;

    /// `None` until the first save. Guest-local sessions are `Unauthorized`.
    async fn get_profile(&self) -> StoreResult<Option<Profile>>;
    async fn update_profile(&self, update: ProfileUpdate) -> StoreResult<Profile>;
}

/// Owner-scoped persistence. Every row operation filters on `owner_id`.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn list_clients(&self, owner_id: &str) -> StoreResult<Vec<Client>>;
    async fn create_client(&self, owner_id: &str, client: &NewClient) -> StoreResult<Client>;
    async fn update_client(
        &self,
        owner_id: &str,
        id: &str,
        patch: &ClientPatch,
    ) -> StoreResult<Client>;
    async fn delete_client(&self, owner_id: &str, id: &str) -> StoreResult<bool>;
    async fn count_clients(&self, owner_id: &str) -> StoreResult<u64>;
    /// Inserts all rows or none.
    async fn insert_clients(&self, owner_id: &str, clients: &[NewClient]) -> StoreResult<Vec<Client>>;

    async fn list_projects(&self, owner_id: &str) -> StoreResult<Vec<Project>>;
    async fn create_project(&self, owner_id: &str, project: &NewProject) -> StoreResult<Project>;
    async fn update_project(
        &self,
        owner_id: &str,
        id: &str,
        patch: &ProjectPatch,
    ) -> StoreResult<Project>;
    async fn delete_project(&self, owner_id: &str, id: &str) -> StoreResult<bool>;
    async fn count_projects(&self, owner_id: &str) -> StoreResult<u64>;
    /// Inserts all rows or none.
    async fn insert_projects(
        &self,
        owner_id: &str,
        projects: &[NewProject],
    ) -> StoreResult<Vec<Project>>;

    async fn get_profile(&self, owner_id: &str) -> StoreResult<Option<Profile>>;
    /// Creates the profile row on first save and overwrites the form fields after that.
    async fn upsert_profile(&self, owner_id: &str, update: &ProfileUpdate) -> StoreResult<Profile>;

    /// Creates the backing identity record for a new guest and returns its id.
    async fn provision_guest_identity(&self) -> StoreResult<String>;
    async fn remove_guest_identity(&self, id: &str) -> StoreResult<()>;
}

/// Picks the adapter for `identity`.
pub fn open_store(
    identity: Option<&Identity>,
    datastore: Option<Arc<dyn Datastore>>,
    kv: Arc<dyn KeyValueStore>,
) -> StoreResult<Box<dyn Store>> {
    match identity {
        None => Err(StoreError::Unauthorized),
        Some(Identity::Authenticated { user_id }) => {
            let datastore = datastore
                .ok_or_else(|| StoreError::Backend("datastore not configured".into()))?;
            debug!(%user_id, "using remote store");
            Ok(Box::new(RemoteStore::new(datastore, user_id.clone())))
        }
        Some(Identity::Guest) => {
            let seeded = kv.get(GUEST_USER_ID_KEY)?.filter(|id| !id.is_empty());
            match (seeded, datastore) {
                (Some(guest_id), Some(datastore)) => {
                    debug!(%guest_id, "using remote store for seeded guest");
                    Ok(Box::new(RemoteStore::new(datastore, guest_id)))
                }
                _ => {
                    debug!("using guest-local store");
                    Ok(Box::new(GuestStore::new(kv)))
                }
            }
        }
    }
}
