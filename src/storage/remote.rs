use std::sync::Arc;

use async_trait::async_trait;

use super::{Datastore, Store, StoreMode};
use crate::error::StoreResult;
use crate::models::{
    Client, ClientPatch, NewClient, NewProject, Profile, ProfileUpdate, Project, ProjectPatch,
};

/// Authenticated adapter: a [`Datastore`] bound to one owner.
pub struct RemoteStore {
    datastore: Arc<dyn Datastore>,
    owner_id: String,
}

impl RemoteStore {
    pub fn new(datastore: Arc<dyn Datastore>, owner_id: impl Into<String>) -> Self {
        Self {
            datastore,
            owner_id: owner_id.into(),
        }
    }
}

#[async_trait]
impl Store for RemoteStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Remote {
            owner_id: self.owner_id.clone(),
        }
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        self.datastore.list_clients(&self.owner_id).await
    }

    async fn create_client(&self, client: NewClient) -> StoreResult<Client> {
        self.datastore.create_client(&self.owner_id, &client).await
    }

    async fn update_client(&self, id: &str, patch: ClientPatch) -> StoreResult<Client> {
        self.datastore.update_client(&self.owner_id, id, &patch).await
    }

    async fn delete_client(&self, id: &str) -> StoreResult<bool> {
        self.datastore.delete_client(&self.owner_id, id).await
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.datastore.list_projects(&self.owner_id).await
    }

    async fn create_project(&self, project: NewProject) -> StoreResult<Project> {
        self.datastore.create_project(&self.owner_id, &project).await
    }

    async fn update_project(&self, id: &str, patch: ProjectPatch) -> StoreResult<Project> {
        self.datastore.update_project(&self.owner_id, id, &patch).await
    }

    async fn delete_project(&self, id: &str) -> StoreResult<bool> {
        self.datastore.delete_project(&self.owner_id, id).await
    }

    async fn get_profile(&self) -> StoreResult<Option<Profile>> {
        self.datastore.get_profile(&self.owner_id).await
    }

    async fn update_profile(&self, update: ProfileUpdate) -> StoreResult<Profile> {
        self.datastore.upsert_profile(&self.owner_id, &update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::ProjectStatus;
    use crate::storage::memory::MemoryDatastore;

    #[tokio::test]
    async fn owners_never_see_each_other() {
        let datastore: Arc<dyn Datastore> = Arc::new(MemoryDatastore::new());
        let alice = RemoteStore::new(datastore.clone(), "alice");
        let bob = RemoteStore::new(datastore.clone(), "bob");

        let created = alice
            .create_client(NewClient::new("Acme", "ops@acme.test"))
            .await
            .unwrap();

        assert!(bob.list_clients().await.unwrap().is_empty());
        assert_eq!(alice.list_clients().await.unwrap(), vec![created.clone()]);
        assert_eq!(created.owner_id.as_deref(), Some("alice"));

        // Bob can neither change nor remove Alice's row.
        let err = bob
            .update_client(&created.id, ClientPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(!bob.delete_client(&created.id).await.unwrap());
        assert_eq!(alice.list_clients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn project_cannot_reference_another_owners_client() {
        let datastore: Arc<dyn Datastore> = Arc::new(MemoryDatastore::new());
        let alice = RemoteStore::new(datastore.clone(), "alice");
        let bob = RemoteStore::new(datastore, "bob");

        let client = alice
            .create_client(NewClient::new("Acme", "ops@acme.test"))
            .await
            .unwrap();
        let project = NewProject {
            client_id: Some(client.id.clone()),
            ..NewProject::new("Site", 100.0, ProjectStatus::Planning)
        };

        assert!(matches!(
            bob.create_project(project.clone()).await,
            Err(StoreError::Validation(_))
        ));
        let created = alice.create_project(project).await.unwrap();
        assert_eq!(created.client_id, Some(client.id));
    }

    #[tokio::test]
    async fn deleting_a_client_unassigns_its_projects() {
        let datastore: Arc<dyn Datastore> = Arc::new(MemoryDatastore::new());
        let store = RemoteStore::new(datastore, "alice");

        let client = store
            .create_client(NewClient::new("Acme", "ops@acme.test"))
            .await
            .unwrap();
        store
            .create_project(NewProject {
                client_id: Some(client.id.clone()),
                ..NewProject::new("Site", 100.0, ProjectStatus::Planning)
            })
            .await
            .unwrap();

        assert!(store.delete_client(&client.id).await.unwrap());
        let projects = store.list_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].client_id, None);
    }

    #[tokio::test]
    async fn blank_client_id_in_a_patch_unassigns() {
        let datastore: Arc<dyn Datastore> = Arc::new(MemoryDatastore::new());
        let store = RemoteStore::new(datastore, "alice");

        let client = store
            .create_client(NewClient::new("Acme", "ops@acme.test"))
            .await
            .unwrap();
        let project = store
            .create_project(NewProject {
                client_id: Some(client.id.clone()),
                ..NewProject::new("Site", 100.0, ProjectStatus::Planning)
            })
            .await
            .unwrap();

        let patch = ProjectPatch {
            client_id: Some(Some(String::new())),
            ..ProjectPatch::default()
        };
        let updated = store.update_project(&project.id, patch).await.unwrap();
        assert_eq!(updated.client_id, None);

        let foreign = ProjectPatch {
            client_id: Some(Some("someone-elses".into())),
            ..ProjectPatch::default()
        };
        assert!(matches!(
            store.update_project(&project.id, foreign).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn profile_upsert_round_trips() {
        let datastore: Arc<dyn Datastore> = Arc::new(MemoryDatastore::new());
        let store = RemoteStore::new(datastore, "alice");
        assert_eq!(store.get_profile().await.unwrap(), None);

        let saved = store
            .update_profile(ProfileUpdate {
                full_name: "Alice Example".into(),
                username: "alice".into(),
                website: "https://alice.dev".into(),
            })
            .await
            .unwrap();
        assert_eq!(saved.id, "alice");
        assert!(saved.updated_at.is_some());
        assert_eq!(store.get_profile().await.unwrap(), Some(saved.clone()));

        // A second save overwrites, and blanks clear.
        let cleared = store
            .update_profile(ProfileUpdate {
                full_name: "Alice E.".into(),
                ..ProfileUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(cleared.full_name.as_deref(), Some("Alice E."));
        assert_eq!(cleared.username, None);
        assert_eq!(cleared.website, None);

        let invalid = ProfileUpdate {
            website: "alice.dev".into(),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            store.update_profile(invalid).await,
            Err(StoreError::Validation(_))
        ));
        assert_eq!(store.get_profile().await.unwrap(), Some(cleared));
    }

    #[tokio::test]
    async fn profiles_are_owner_scoped() {
        let datastore: Arc<dyn Datastore> = Arc::new(MemoryDatastore::new());
        let alice = RemoteStore::new(datastore.clone(), "alice");
        let bob = RemoteStore::new(datastore, "bob");

        alice
            .update_profile(ProfileUpdate {
                full_name: "Alice".into(),
                ..ProfileUpdate::default()
            })
            .await
            .unwrap();

        assert_eq!(bob.get_profile().await.unwrap(), None);
        bob.update_profile(ProfileUpdate {
            full_name: "Bob".into(),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();

        let alice_profile = alice.get_profile().await.unwrap().unwrap();
        assert_eq!(alice_profile.full_name.as_deref(), Some("Alice"));
    }
}
