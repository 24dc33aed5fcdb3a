use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::client::non_blank;

/// Public details of an account, keyed by the owning identity.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub website: Option<String>,
    /// Set by the identity provider; never written here.
    pub avatar_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: None,
            username: None,
            website: None,
            avatar_url: None,
            updated_at: None,
        }
    }

    /// First letter of the full name, falling back to `fallback`, then `U`.
    pub fn initial(&self, fallback: &str) -> char {
        self.full_name
            .as_deref()
            .and_then(|name| name.trim().chars().next())
            .or_else(|| fallback.trim().chars().next())
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('U')
    }
}

/// Settings form payload. Every field is written; blanks clear the column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub username: String,
    pub website: String,
}

impl ProfileUpdate {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            full_name: profile.full_name.clone().unwrap_or_default(),
            username: profile.username.clone().unwrap_or_default(),
            website: profile.website.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.username.trim().contains(char::is_whitespace) {
            return Err(StoreError::validation("Username cannot contain spaces"));
        }
        let website = self.website.trim();
        if !website.is_empty() {
            let host = website
                .strip_prefix("https://")
                .or_else(|| website.strip_prefix("http://"));
            if !host.is_some_and(|h| !h.is_empty() && !h.contains(char::is_whitespace)) {
                return Err(StoreError::validation(
                    "Website must be a URL starting with http:// or https://",
                ));
            }
        }
        Ok(())
    }

    /// Writes the form over `profile`, keeping fields the form does not own.
    pub fn apply(&self, profile: &mut Profile, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.validate()?;
        profile.full_name = non_blank(Some(self.full_name.clone()));
        profile.username = non_blank(Some(self.username.clone()));
        profile.website = non_blank(Some(self.website.clone()));
        profile.updated_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(full_name: &str, username: &str, website: &str) -> ProfileUpdate {
        ProfileUpdate {
            full_name: full_name.into(),
            username: username.into(),
            website: website.into(),
        }
    }

    #[test]
    fn website_must_be_http() {
        assert!(update("Ada", "ada", "").validate().is_ok());
        assert!(update("Ada", "ada", "https://ada.dev").validate().is_ok());
        assert!(update("Ada", "ada", "ada.dev").validate().is_err());
        assert!(update("Ada", "ada", "https://").validate().is_err());
        assert!(update("Ada", "a b", "").validate().is_err());
    }

    #[test]
    fn apply_clears_blanks_and_keeps_avatar() {
        let now = Utc::now();
        let mut profile = Profile {
            full_name: Some("Old".into()),
            avatar_url: Some("https://cdn/a.png".into()),
            ..Profile::empty("u1")
        };

        update("  Ada Lovelace ", "", "https://ada.dev")
            .apply(&mut profile, now)
            .unwrap();

        assert_eq!(profile.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.username, None);
        assert_eq!(profile.website.as_deref(), Some("https://ada.dev"));
        assert_eq!(profile.avatar_url.as_deref(), Some("https://cdn/a.png"));
        assert_eq!(profile.updated_at, Some(now));
    }

    #[test]
    fn initial_falls_back_to_account() {
        let mut profile = Profile::empty("u1");
        assert_eq!(profile.initial("bob@example.com"), 'B');
        assert_eq!(profile.initial(""), 'U');
        profile.full_name = Some("ada".into());
        assert_eq!(profile.initial("bob@example.com"), 'A');
    }
}
