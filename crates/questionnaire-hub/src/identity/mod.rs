//! Verified principals, their role tiers, and bearer-token verification.

mod jwks;
mod verifier;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::UserId;

pub use jwks::{HttpKeySetFetcher, KeySetCache, KeySetFetcher};
pub use verifier::{DisabledVerifier, JwtVerifier, TokenVerifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    CompanyAdmin,
    Supervisor,
    Employee,
}

impl Role {
    /// Unknown role strings are not an error; they are simply not recognized.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "super_admin" => Some(Self::SuperAdmin),
            "company_admin" => Some(Self::CompanyAdmin),
            "supervisor" => Some(Self::Supervisor),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::CompanyAdmin => "company_admin",
            Self::Supervisor => "supervisor",
            Self::Employee => "employee",
        }
    }

    /// Roles admitted by an endpoint gated at this tier.
    pub const fn admitted(self) -> &'static [Role] {
        match self {
            Self::SuperAdmin => &[Self::SuperAdmin],
            Self::CompanyAdmin => &[Self::SuperAdmin, Self::CompanyAdmin],
            Self::Supervisor => &[Self::SuperAdmin, Self::CompanyAdmin, Self::Supervisor],
            Self::Employee => &[
                Self::SuperAdmin,
                Self::CompanyAdmin,
                Self::Supervisor,
                Self::Employee,
            ],
        }
    }
}

/// Identity established from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: UserId,
    pub roles: BTreeSet<Role>,
    pub email: Option<String>,
}

impl Principal {
    pub fn new(subject: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            subject,
            roles: roles.into_iter().collect(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.roles.contains(role))
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(Role::SuperAdmin)
    }

    pub fn meets(&self, tier: Role) -> bool {
        self.has_any(tier.admitted())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header is required")]
    MissingCredentials,
    #[error("authorization header must use the Bearer scheme")]
    MalformedHeader,
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("token header carries no key id")]
    MissingKeyId,
    #[error("unknown signing key '{0}'")]
    UnknownKey(String),
    #[error("signing algorithm {0:?} is not accepted")]
    DisallowedAlgorithm(jsonwebtoken::Algorithm),
    #[error("token has expired")]
    Expired,
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("signing keys unavailable: {0}")]
    KeySetUnavailable(String),
    #[error("identity provider not configured")]
    NotConfigured,
}
