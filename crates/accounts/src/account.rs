//! Account document and registration profile.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::{AccountId, Document, DomainError, DomainResult};

use crate::Role;

/// Registration profile as received from the outer request layer.
///
/// The password arrives in plaintext and is hashed by the registrar's hashing
/// collaborator before an [`Account`] is ever built. The role is a raw string;
/// parsing it is the registrar's first validation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Account document.
///
/// # Invariants
/// - `email` is unique across all accounts (storage-enforced index).
/// - `roles` is non-empty.
/// - At most one account in the whole system holds [`Role::Admin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    roles: BTreeSet<Role>,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Account {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> DomainResult<Self> {
        let email = email.into();
        if email.trim().is_empty() || !email.contains('@') {
            return Err(DomainError::validation("email is malformed"));
        }
        let password_hash = password_hash.into();
        if password_hash.is_empty() {
            return Err(DomainError::validation("password hash cannot be empty"));
        }
        Ok(Self {
            id: AccountId::new(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email,
            password_hash,
            roles: BTreeSet::from([role]),
            created_at: Utc::now(),
            version: 0,
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Document for Account {
    type Id = AccountId;

    fn id(&self) -> AccountId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
