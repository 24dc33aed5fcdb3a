//! Demo data: a fixed catalog of clients and projects for a fresh owner.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::identity::Identity;
use crate::models::{ClientStatus, NewClient, NewProject, ProjectStatus};
use crate::storage::Datastore;

const DEMO_NOTES: &str = "Demo client data for portfolio showcase";

struct DemoClient {
    name: &'static str,
    email: &'static str,
    company: &'static str,
    status: ClientStatus,
}

struct DemoProject {
    title: &'static str,
    description: &'static str,
    budget: f64,
    status: ProjectStatus,
    deadline: (i32, u32, u32),
    start: (i32, u32, u32),
    end: Option<(i32, u32, u32)>,
}

const DEMO_CLIENTS: [DemoClient; 5] = [
    DemoClient {
        name: "TechCorp Solutions",
        email: "contact@techcorp.com",
        company: "TechCorp Solutions Inc.",
        status: ClientStatus::Active,
    },
    DemoClient {
        name: "Digital Marketing Agency",
        email: "hello@dma.co",
        company: "DMA Digital",
        status: ClientStatus::Active,
    },
    DemoClient {
        name: "Startup Ventures",
        email: "projects@startup.io",
        company: "Startup Ventures LLC",
        status: ClientStatus::Active,
    },
    DemoClient {
        name: "E-commerce Plus",
        email: "info@ecommerceplus.com",
        company: "E-commerce Plus",
        status: ClientStatus::Prospect,
    },
    DemoClient {
        name: "Financial Services Co",
        email: "tech@finserv.net",
        company: "Financial Services Co",
        status: ClientStatus::Active,
    },
];

const DEMO_PROJECTS: [DemoProject; 10] = [
    DemoProject {
        title: "E-commerce Website Redesign",
        description: "Complete redesign of the company e-commerce platform with modern UI/UX",
        budget: 15000.0,
        status: ProjectStatus::Completed,
        deadline: (2025, 10, 15),
        start: (2025, 8, 1),
        end: Some((2025, 10, 12)),
    },
    DemoProject {
        title: "Mobile App Development",
        description: "Native iOS and Android app for customer engagement",
        budget: 25000.0,
        status: ProjectStatus::Completed,
        deadline: (2025, 9, 30),
        start: (2025, 6, 15),
        end: Some((2025, 9, 28)),
    },
    DemoProject {
        title: "API Integration Project",
        description: "Third-party payment gateway and CRM integration",
        budget: 8500.0,
        status: ProjectStatus::Completed,
        deadline: (2025, 11, 20),
        start: (2025, 10, 1),
        end: Some((2025, 11, 18)),
    },
    DemoProject {
        title: "Content Management System",
        description: "Custom CMS for blog and content management",
        budget: 12000.0,
        status: ProjectStatus::Completed,
        deadline: (2025, 12, 28),
        start: (2025, 10, 20),
        end: Some((2025, 12, 28)),
    },
    DemoProject {
        title: "SEO Optimization Campaign",
        description: "Comprehensive SEO audit and implementation",
        budget: 6500.0,
        status: ProjectStatus::Completed,
        deadline: (2026, 1, 8),
        start: (2025, 11, 1),
        end: Some((2026, 1, 8)),
    },
    DemoProject {
        title: "Database Migration Service",
        description: "Legacy database migration to cloud infrastructure",
        budget: 18000.0,
        status: ProjectStatus::Completed,
        deadline: (2025, 8, 30),
        start: (2025, 7, 1),
        end: Some((2025, 8, 25)),
    },
    DemoProject {
        title: "Social Media Dashboard",
        description: "Analytics dashboard for social media management",
        budget: 9500.0,
        status: ProjectStatus::InProgress,
        deadline: (2026, 3, 15),
        start: (2025, 12, 1),
        end: None,
    },
    DemoProject {
        title: "Cloud Infrastructure Setup",
        description: "AWS deployment and infrastructure configuration",
        budget: 22000.0,
        status: ProjectStatus::Completed,
        deadline: (2025, 12, 15),
        start: (2025, 11, 1),
        end: Some((2025, 12, 15)),
    },
    DemoProject {
        title: "Payment Gateway Integration",
        description: "Stripe and PayPal payment processing integration",
        budget: 7500.0,
        status: ProjectStatus::Completed,
        deadline: (2026, 1, 5),
        start: (2025, 12, 10),
        end: Some((2026, 1, 5)),
    },
    DemoProject {
        title: "Security Audit & Compliance",
        description: "Comprehensive security review and GDPR compliance implementation",
        budget: 11000.0,
        status: ProjectStatus::Completed,
        deadline: (2025, 12, 20),
        start: (2025, 11, 15),
        end: Some((2025, 12, 20)),
    },
];

fn date((y, m, d): (i32, u32, u32)) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// The demo clients, ready to insert.
pub fn demo_clients() -> Vec<NewClient> {
    DEMO_CLIENTS
        .iter()
        .map(|c| NewClient {
            name: c.name.to_string(),
            email: c.email.to_string(),
            company: Some(c.company.to_string()),
            phone: None,
            notes: Some(DEMO_NOTES.to_string()),
            status: c.status,
        })
        .collect()
}

/// The demo projects, assigned round-robin to `client_ids`.
///
/// Completed projects are dated at their actual end date, the rest at their
/// start date, so the revenue chart has history to show.
pub fn demo_projects(client_ids: &[String]) -> Vec<NewProject> {
    DEMO_PROJECTS
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let start_date = date(p.start);
            let actual_end_date = p.end.and_then(date);
            let dated = match (p.status, actual_end_date) {
                (ProjectStatus::Completed, Some(end)) => Some(end),
                _ => start_date,
            };
            NewProject {
                title: p.title.to_string(),
                description: Some(p.description.to_string()),
                budget: p.budget,
                status: p.status,
                client_id: (!client_ids.is_empty())
                    .then(|| client_ids[i % client_ids.len()].clone()),
                deadline: date(p.deadline),
                start_date,
                actual_end_date,
                created_at: dated.map(midnight_utc),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedMode {
    /// Seed the signed-in user's account.
    Authenticated,
    /// Seed a guest. A remembered backing identity is reused; otherwise a
    /// throwaway one is provisioned.
    Guest { backing_id: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub clients_created: usize,
    pub projects_created: usize,
    /// Backing identity of a seeded guest.
    pub guest_user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DemoDataStatus {
    pub clients: u64,
    pub projects: u64,
}

impl DemoDataStatus {
    pub fn has_data(&self) -> bool {
        self.clients > 0 || self.projects > 0
    }
}

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Please log in first or use guest mode")]
    Unauthorized,

    #[error("Demo data already exists. You have {clients} clients.")]
    AlreadyExists { clients: u64 },

    #[error("Failed to create guest user: {0}")]
    GuestProvisioning(#[source] StoreError),

    #[error("Failed to check existing data: {0}")]
    Lookup(#[source] StoreError),

    #[error("Failed to insert demo clients: {0}")]
    InsertClients(#[source] StoreError),

    #[error("Failed to insert demo projects: {0}")]
    InsertProjects(#[source] StoreError),
}

pub struct DemoSeeder {
    datastore: Arc<dyn Datastore>,
}

impl DemoSeeder {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    pub async fn seed(
        &self,
        mode: SeedMode,
        identity: Option<&Identity>,
    ) -> Result<SeedSummary, SeedError> {
        let (owner_id, guest, provisioned) = match mode {
            SeedMode::Authenticated => match identity {
                Some(Identity::Authenticated { user_id }) => (user_id.clone(), false, false),
                _ => return Err(SeedError::Unauthorized),
            },
            SeedMode::Guest {
                backing_id: Some(id),
            } if !id.is_empty() => (id, true, false),
            SeedMode::Guest { .. } => {
                let id = self
                    .datastore
                    .provision_guest_identity()
                    .await
                    .map_err(SeedError::GuestProvisioning)?;
                (id, true, true)
            }
        };
        info!(%owner_id, guest = provisioned, "seeding demo data");

        match self.seed_owner(&owner_id, provisioned).await {
            Ok((clients_created, projects_created)) => {
                info!(%owner_id, clients_created, projects_created, "demo data seeded");
                Ok(SeedSummary {
                    clients_created,
                    projects_created,
                    guest_user_id: guest.then_some(owner_id),
                })
            }
            Err(err) => {
                if provisioned {
                    self.discard_guest(&owner_id).await;
                }
                Err(err)
            }
        }
    }

    async fn seed_owner(&self, owner_id: &str, fresh: bool) -> Result<(usize, usize), SeedError> {
        if !fresh {
            let existing = self
                .datastore
                .count_clients(owner_id)
                .await
                .map_err(SeedError::Lookup)?;
            if existing > 0 {
                return Err(SeedError::AlreadyExists { clients: existing });
            }
        }

        let clients = self
            .datastore
            .insert_clients(owner_id, &demo_clients())
            .await
            .map_err(SeedError::InsertClients)?;
        let client_ids: Vec<String> = clients.iter().map(|c| c.id.clone()).collect();

        match self
            .datastore
            .insert_projects(owner_id, &demo_projects(&client_ids))
            .await
        {
            Ok(projects) => Ok((clients.len(), projects.len())),
            Err(err) => {
                self.discard_clients(owner_id, &client_ids).await;
                Err(SeedError::InsertProjects(err))
            }
        }
    }

    /// Removes clients inserted by a seeding run that failed later on.
    async fn discard_clients(&self, owner_id: &str, client_ids: &[String]) {
        for id in client_ids {
            if let Err(err) = self.datastore.delete_client(owner_id, id).await {
                warn!(%owner_id, client_id = %id, error = %err, "could not remove partial demo client");
            }
        }
    }

    async fn discard_guest(&self, guest_id: &str) {
        if let Err(err) = self.datastore.remove_guest_identity(guest_id).await {
            warn!(%guest_id, error = %err, "could not remove guest identity after failed seed");
        }
    }

    pub async fn has_demo_data(&self, owner_id: &str) -> Result<DemoDataStatus, StoreError> {
        Ok(DemoDataStatus {
            clients: self.datastore.count_clients(owner_id).await?,
            projects: self.datastore.count_projects(owner_id).await?,
        })
    }
}
