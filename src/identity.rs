use std::fmt;

/// Who is acting. Produced by the identity provider, never by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated { user_id: String },
    Guest,
}

impl Identity {
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Identity::Authenticated {
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Authenticated { user_id } => write!(f, "user {user_id}"),
            Identity::Guest => f.write_str("guest"),
        }
    }
}

pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;
}

/// Identity resolved once at startup from CLI flags or the environment.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<Identity>);

impl StaticIdentity {
    /// `--guest` wins over a configured user id.
    pub fn from_flags(guest: bool, user_id: Option<String>) -> Self {
        if guest {
            return Self(Some(Identity::Guest));
        }
        Self(
            user_id
                .filter(|id| !id.trim().is_empty())
                .map(Identity::authenticated),
        )
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}
