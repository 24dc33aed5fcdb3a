use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::client::non_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ProjectStatus {
    #[default]
    Planning,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 5] = [
        ProjectStatus::Planning,
        ProjectStatus::InProgress,
        ProjectStatus::Completed,
        ProjectStatus::OnHold,
        ProjectStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    /// Human label, e.g. `IN PROGRESS`.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ProjectStatus::Planning | ProjectStatus::InProgress)
    }

    pub fn cycle(self) -> Self {
        let i = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = StoreError;

    /// Case-insensitive; `-` and spaces are accepted in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "planning" => Ok(ProjectStatus::Planning),
            "in_progress" => Ok(ProjectStatus::InProgress),
            "completed" => Ok(ProjectStatus::Completed),
            "on_hold" => Ok(ProjectStatus::OnHold),
            "cancelled" => Ok(ProjectStatus::Cancelled),
            _ => Err(StoreError::validation(format!("unknown project status '{s}'"))),
        }
    }
}

impl TryFrom<String> for ProjectStatus {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProjectStatus> for String {
    fn from(status: ProjectStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub budget: f64,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub client_id: Option<String>,
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub actual_end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_completed(&self) -> bool {
        self.status == ProjectStatus::Completed
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        validate_fields(&self.title, self.budget)
    }
}

/// Payload for creating a project.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub budget: f64,
    pub status: ProjectStatus,
    pub client_id: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    /// Backdates the record instead of stamping it with the write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewProject {
    pub fn new(title: impl Into<String>, budget: f64, status: ProjectStatus) -> Self {
        Self {
            title: title.into(),
            budget,
            status,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        validate_fields(&self.title, self.budget)
    }

    pub fn into_project(self, id: String, owner_id: Option<String>, now: DateTime<Utc>) -> Project {
        Project {
            id,
            owner_id,
            title: self.title.trim().to_string(),
            description: non_blank(self.description),
            budget: self.budget,
            status: self.status,
            client_id: self.client_id.filter(|c| !c.is_empty()),
            deadline: self.deadline,
            start_date: self.start_date,
            actual_end_date: self.actual_end_date,
            created_at: self.created_at.unwrap_or(now),
            updated_at: now,
        }
    }
}

/// Partial update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub budget: Option<f64>,
    pub status: Option<ProjectStatus>,
    pub client_id: Option<Option<String>>,
    pub deadline: Option<Option<NaiveDate>>,
}

impl ProjectPatch {
    pub fn apply(&self, project: &mut Project, now: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(title) = &self.title {
            project.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            project.description = non_blank(description.clone());
        }
        if let Some(budget) = self.budget {
            project.budget = budget;
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(client_id) = &self.client_id {
            project.client_id = client_id.clone().filter(|c| !c.is_empty());
        }
        if let Some(deadline) = self.deadline {
            project.deadline = deadline;
        }
        project.validate()?;
        project.updated_at = now;
        Ok(())
    }

    /// Client reference that must be checked against the owner after
    /// [`apply`](Self::apply). `None` when the patch leaves the client alone
    /// or unassigns it.
    pub fn assigned_client<'a>(&self, patched: &'a Project) -> Option<&'a str> {
        self.client_id.as_ref()?;
        patched.client_id.as_deref()
    }
}

fn validate_fields(title: &str, budget: f64) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::validation("Title is required"));
    }
    if !budget.is_finite() || budget < 0.0 {
        return Err(StoreError::validation("Budget must be a non-negative number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_matches_any_case() {
        for raw in ["completed", "Completed", "COMPLETED", " completed "] {
            assert_eq!(raw.parse::<ProjectStatus>().unwrap(), ProjectStatus::Completed);
        }
        assert_eq!("In Progress".parse::<ProjectStatus>().unwrap(), ProjectStatus::InProgress);
        assert_eq!("on-hold".parse::<ProjectStatus>().unwrap(), ProjectStatus::OnHold);
    }

    #[test]
    fn deserializes_mixed_case_status() {
        let json = r#"{
            "id": "p1", "title": "Site", "description": null, "budget": 100.0,
            "status": "COMPLETED", "client_id": null, "deadline": null,
            "created_at": "2026-01-01T00:00:00Z", "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert!(project.is_completed());
        assert_eq!(project.owner_id, None);
    }

    #[test]
    fn blank_client_id_unassigns_without_a_reference() {
        let now = Utc::now();
        let mut project = NewProject {
            client_id: Some("c1".into()),
            ..NewProject::new("Site", 100.0, ProjectStatus::Planning)
        }
        .into_project("p1".into(), None, now);

        let untouched = ProjectPatch::default();
        untouched.apply(&mut project, now).unwrap();
        assert_eq!(untouched.assigned_client(&project), None);
        assert_eq!(project.client_id.as_deref(), Some("c1"));

        let reassign = ProjectPatch {
            client_id: Some(Some("c2".into())),
            ..ProjectPatch::default()
        };
        reassign.apply(&mut project, now).unwrap();
        assert_eq!(reassign.assigned_client(&project), Some("c2"));

        let blank = ProjectPatch {
            client_id: Some(Some(String::new())),
            ..ProjectPatch::default()
        };
        blank.apply(&mut project, now).unwrap();
        assert_eq!(blank.assigned_client(&project), None);
        assert_eq!(project.client_id, None);
    }

    #[test]
    fn budget_must_be_non_negative() {
        assert!(NewProject::new("Site", 0.0, ProjectStatus::Planning).validate().is_ok());
        assert!(NewProject::new("Site", -1.0, ProjectStatus::Planning).validate().is_err());
        assert!(NewProject::new("Site", f64::NAN, ProjectStatus::Planning).validate().is_err());
        assert!(NewProject::new("  ", 10.0, ProjectStatus::Planning).validate().is_err());
    }

    #[test]
    fn backdated_creation_is_kept() {
        let now = Utc::now();
        let then = now - chrono::Duration::days(90);
        let project = NewProject {
            created_at: Some(then),
            ..NewProject::new("Site", 10.0, ProjectStatus::Completed)
        }
        .into_project("p1".into(), None, now);
        assert_eq!(project.created_at, then);
        assert_eq!(project.updated_at, now);
    }

    #[test]
    fn any_status_may_follow_any_other() {
        let now = Utc::now();
        let mut project = NewProject::new("Site", 10.0, ProjectStatus::Cancelled)
            .into_project("p1".into(), None, now);
        for status in ProjectStatus::ALL {
            let patch = ProjectPatch {
                status: Some(status),
                ..ProjectPatch::default()
            };
            patch.apply(&mut project, now).unwrap();
            assert_eq!(project.status, status);
        }
    }
}
