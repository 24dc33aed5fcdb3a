use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Client, ClientPatch, NewClient, NewProject, Profile, ProfileUpdate, Project, ProjectPatch,
};
use crate::storage::Datastore;

const CLIENT_COLUMNS: &str = "id, user_id AS owner_id, name, email, company, phone, notes, \
                              status, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, user_id AS owner_id, title, description, budget, status, \
                               client_id, deadline, start_date, actual_end_date, \
                               created_at, updated_at";

const PROFILE_COLUMNS: &str = "id, full_name, username, website, avatar_url, updated_at";

/// Database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let url = config
            .database_url()
            .context("DATABASE_URL is not set")?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(self.get_pool()).await?;
        Ok(())
    }

    async fn insert_client(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: &str,
        client: &NewClient,
    ) -> StoreResult<Client> {
        client.validate()?;
        let row = client
            .clone()
            .into_client(Uuid::new_v4().to_string(), Some(owner_id.to_string()), Utc::now());

        let sql = format!(
            r#"
            INSERT INTO clients (id, user_id, name, email, company, phone, notes, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(&row.id)
            .bind(owner_id)
            .bind(&row.name)
            .bind(&row.email)
            .bind(&row.company)
            .bind(&row.phone)
            .bind(&row.notes)
            .bind(row.status.as_str())
            .bind(row.created_at)
            .bind(row.updated_at)
            .fetch_one(&mut **tx)
            .await?;

        Ok(client)
    }

    async fn insert_project(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: &str,
        project: &NewProject,
    ) -> StoreResult<Project> {
        project.validate()?;
        let row = project
            .clone()
            .into_project(Uuid::new_v4().to_string(), Some(owner_id.to_string()), Utc::now());
        Self::check_client_ref(tx, owner_id, row.client_id.as_deref()).await?;

        let sql = format!(
            r#"
            INSERT INTO projects (id, user_id, title, description, budget, status, client_id,
                                  deadline, start_date, actual_end_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {PROJECT_COLUMNS}
            "#
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(&row.id)
            .bind(owner_id)
            .bind(&row.title)
            .bind(&row.description)
            .bind(row.budget)
            .bind(row.status.as_str())
            .bind(&row.client_id)
            .bind(row.deadline)
            .bind(row.start_date)
            .bind(row.actual_end_date)
            .bind(row.created_at)
            .bind(row.updated_at)
            .fetch_one(&mut **tx)
            .await?;

        Ok(project)
    }

    /// Signed-in users are managed elsewhere; make sure their row exists so
    /// the owner foreign keys hold.
    async fn ensure_owner(tx: &mut Transaction<'_, Postgres>, owner_id: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO app_users (id, email)
            VALUES ($1, $1 || '@users.local')
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(owner_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// A project may only point at a client of the same owner.
    async fn check_client_ref(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: &str,
        client_id: Option<&str>,
    ) -> StoreResult<()> {
        let Some(client_id) = client_id else {
            return Ok(());
        };
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1 AND user_id = $2)",
        )
        .bind(client_id)
        .bind(owner_id)
        .fetch_one(&mut **tx)
        .await?;

        if exists {
            Ok(())
        } else {
            Err(StoreError::validation(format!("unknown client {client_id}")))
        }
    }
}

#[async_trait]
impl Datastore for Database {
    // Client operations
    async fn list_clients(&self, owner_id: &str) -> StoreResult<Vec<Client>> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(owner_id)
            .fetch_all(self.get_pool())
            .await?;

        debug!(%owner_id, count = clients.len(), "clients fetched");
        Ok(clients)
    }

    async fn create_client(&self, owner_id: &str, client: &NewClient) -> StoreResult<Client> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_owner(&mut tx, owner_id).await?;
        let client = Self::insert_client(&mut tx, owner_id, client).await?;
        tx.commit().await?;

        Ok(client)
    }

    async fn update_client(
        &self,
        owner_id: &str,
        id: &str,
        patch: &ClientPatch,
    ) -> StoreResult<Client> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND user_id = $2 FOR UPDATE"
        );
        let mut client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("client", id))?;

        patch.apply(&mut client, Utc::now())?;

        let sql = format!(
            r#"
            UPDATE clients
            SET name = $3, email = $4, company = $5, phone = $6, notes = $7, status = $8, updated_at = $9
            WHERE id = $1 AND user_id = $2
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(&client.name)
            .bind(&client.email)
            .bind(&client.company)
            .bind(&client.phone)
            .bind(&client.notes)
            .bind(client.status.as_str())
            .bind(client.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(client)
    }

    async fn delete_client(&self, owner_id: &str, id: &str) -> StoreResult<bool> {
        // Projects keep their rows; the foreign key nulls their client_id.
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_clients(&self, owner_id: &str) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE user_id = $1")
            .bind(owner_id)
            .fetch_one(self.get_pool())
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn insert_clients(&self, owner_id: &str, clients: &[NewClient]) -> StoreResult<Vec<Client>> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_owner(&mut tx, owner_id).await?;

        let mut inserted = Vec::with_capacity(clients.len());
        for client in clients {
            inserted.push(Self::insert_client(&mut tx, owner_id, client).await?);
        }

        tx.commit().await?;

        Ok(inserted)
    }

    // Project operations
    async fn list_projects(&self, owner_id: &str) -> StoreResult<Vec<Project>> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let projects = sqlx::query_as::<_, Project>(&sql)
            .bind(owner_id)
            .fetch_all(self.get_pool())
            .await?;

        debug!(%owner_id, count = projects.len(), "projects fetched");
        Ok(projects)
    }

    async fn create_project(&self, owner_id: &str, project: &NewProject) -> StoreResult<Project> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_owner(&mut tx, owner_id).await?;
        let project = Self::insert_project(&mut tx, owner_id, project).await?;
        tx.commit().await?;

        Ok(project)
    }

    async fn update_project(
        &self,
        owner_id: &str,
        id: &str,
        patch: &ProjectPatch,
    ) -> StoreResult<Project> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND user_id = $2 FOR UPDATE"
        );
        let mut project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("project", id))?;

        patch.apply(&mut project, Utc::now())?;
        Self::check_client_ref(&mut tx, owner_id, patch.assigned_client(&project)).await?;

        let sql = format!(
            r#"
            UPDATE projects
            SET title = $3, description = $4, budget = $5, status = $6, client_id = $7,
                deadline = $8, updated_at = $9
            WHERE id = $1 AND user_id = $2
            RETURNING {PROJECT_COLUMNS}
            "#
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(&project.title)
            .bind(&project.description)
            .bind(project.budget)
            .bind(project.status.as_str())
            .bind(&project.client_id)
            .bind(project.deadline)
            .bind(project.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(project)
    }

    async fn delete_project(&self, owner_id: &str, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_projects(&self, owner_id: &str) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE user_id = $1")
            .bind(owner_id)
            .fetch_one(self.get_pool())
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn insert_projects(
        &self,
        owner_id: &str,
        projects: &[NewProject],
    ) -> StoreResult<Vec<Project>> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_owner(&mut tx, owner_id).await?;

        let mut inserted = Vec::with_capacity(projects.len());
        for project in projects {
            inserted.push(Self::insert_project(&mut tx, owner_id, project).await?);
        }

        tx.commit().await?;

        Ok(inserted)
    }

    // Profiles
    async fn get_profile(&self, owner_id: &str) -> StoreResult<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(owner_id)
            .fetch_optional(self.get_pool())
            .await?;

        Ok(profile)
    }

    async fn upsert_profile(&self, owner_id: &str, update: &ProfileUpdate) -> StoreResult<Profile> {
        let mut row = Profile::empty(owner_id);
        update.apply(&mut row, Utc::now())?;

        let mut tx = self.pool.begin().await?;
        Self::ensure_owner(&mut tx, owner_id).await?;

        let sql = format!(
            r#"
            INSERT INTO profiles (id, full_name, username, website, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                username = EXCLUDED.username,
                website = EXCLUDED.website,
                updated_at = EXCLUDED.updated_at
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(owner_id)
            .bind(&row.full_name)
            .bind(&row.username)
            .bind(&row.website)
            .bind(row.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(%owner_id, "profile saved");
        Ok(profile)
    }

    // Guest identities
    async fn provision_guest_identity(&self) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO app_users (id, email, full_name, is_guest)
            VALUES ($1, $2, 'Demo Guest User', TRUE)
            "#,
        )
        .bind(&id)
        .bind(format!("guest-{id}@demo.local"))
        .execute(self.get_pool())
        .await?;

        info!(guest_id = %id, "guest identity provisioned");
        Ok(id)
    }

    async fn remove_guest_identity(&self, id: &str) -> StoreResult<()> {
        // Owned clients and projects go with it (ON DELETE CASCADE).
        sqlx::query("DELETE FROM app_users WHERE id = $1 AND is_guest")
            .bind(id)
            .execute(self.get_pool())
            .await?;

        Ok(())
    }
}

/// Initialize the database connection pool
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;
    info!("database connection established");

    if config.run_migrations {
        db.migrate().await?;
        info!("migrations applied");
    }

    Ok(db)
}
