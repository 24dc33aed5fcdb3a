mod client;
mod profile;
mod project;

pub use client::{Client, ClientPatch, ClientStatus, NewClient};
pub use profile::{Profile, ProfileUpdate};
pub use project::{NewProject, Project, ProjectPatch, ProjectStatus};

/// Records addressable by a string id.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Client {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Project {
    fn key(&self) -> &str {
        &self.id
    }
}
