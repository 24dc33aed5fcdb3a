use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
    Prospect,
}

impl ClientStatus {
    pub const ALL: [ClientStatus; 3] = [
        ClientStatus::Active,
        ClientStatus::Inactive,
        ClientStatus::Prospect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
            ClientStatus::Prospect => "prospect",
        }
    }

    /// Next value in `ALL`, wrapping around. Used by the wizard's status picker.
    pub fn cycle(self) -> Self {
        let i = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ClientStatus::Active),
            "inactive" => Ok(ClientStatus::Inactive),
            "prospect" => Ok(ClientStatus::Prospect),
            other => Err(StoreError::validation(format!(
                "unknown client status '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for ClientStatus {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClientStatus> for String {
    fn from(status: ClientStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_fields(&self.name, &self.email)
    }
}

/// Payload for creating a client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub status: ClientStatus,
}

impl NewClient {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        validate_fields(&self.name, &self.email)
    }

    /// Builds the stored record. Blank optional fields are stored as `None`.
    pub fn into_client(self, id: String, owner_id: Option<String>, now: DateTime<Utc>) -> Client {
        Client {
            id,
            owner_id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            company: non_blank(self.company),
            phone: non_blank(self.phone),
            notes: non_blank(self.notes),
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub status: Option<ClientStatus>,
}

impl ClientPatch {
    /// Merges the patch into `client` and validates the result.
    pub fn apply(&self, client: &mut Client, now: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(name) = &self.name {
            client.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            client.email = email.trim().to_string();
        }
        if let Some(company) = &self.company {
            client.company = non_blank(company.clone());
        }
        if let Some(phone) = &self.phone {
            client.phone = non_blank(phone.clone());
        }
        if let Some(notes) = &self.notes {
            client.notes = non_blank(notes.clone());
        }
        if let Some(status) = self.status {
            client.status = status;
        }
        client.validate()?;
        client.updated_at = now;
        Ok(())
    }
}

fn validate_fields(name: &str, email: &str) -> Result<(), StoreError> {
    if name.trim().chars().count() < 2 {
        return Err(StoreError::validation("Name must be at least 2 characters"));
    }
    if !is_email(email.trim()) {
        return Err(StoreError::validation("Invalid email address"));
    }
    Ok(())
}

fn is_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.contains(char::is_whitespace)
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("ACTIVE".parse::<ClientStatus>().unwrap(), ClientStatus::Active);
        assert_eq!(" Prospect ".parse::<ClientStatus>().unwrap(), ClientStatus::Prospect);
        assert!("archived".parse::<ClientStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ClientStatus::Inactive).unwrap();
        assert_eq!(json, "\"inactive\"");
        let back: ClientStatus = serde_json::from_str("\"Inactive\"").unwrap();
        assert_eq!(back, ClientStatus::Inactive);
    }

    #[test]
    fn new_client_requires_name_and_email() {
        assert!(NewClient::new("Ada", "ada@example.com").validate().is_ok());
        assert!(NewClient::new("A", "ada@example.com").validate().is_err());
        assert!(NewClient::new("Ada", "").validate().is_err());
        assert!(NewClient::new("Ada", "ada@example").validate().is_err());
        assert!(NewClient::new("Ada", "ada @example.com").validate().is_err());
    }

    #[test]
    fn patch_clears_optional_fields_and_revalidates() {
        let now = Utc::now();
        let mut client = NewClient {
            company: Some("Acme".into()),
            ..NewClient::new("Ada", "ada@example.com")
        }
        .into_client("c1".into(), None, now);

        let patch = ClientPatch {
            company: Some(None),
            status: Some(ClientStatus::Inactive),
            ..ClientPatch::default()
        };
        patch.apply(&mut client, now).unwrap();
        assert_eq!(client.company, None);
        assert_eq!(client.status, ClientStatus::Inactive);

        let bad = ClientPatch {
            email: Some("nope".into()),
            ..ClientPatch::default()
        };
        assert!(matches!(bad.apply(&mut client, now), Err(StoreError::Validation(_))));
    }

    #[test]
    fn cycle_wraps() {
        assert_eq!(ClientStatus::Prospect.cycle(), ClientStatus::Active);
    }
}
