//! Fixed roster of identities allowed through the door

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Why an identity qualified for a grant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantBasis {
    /// Label is in the authorized set
    Authorized,
    /// Label is only in the admin set
    Admin,
}

/// Authorized and admin identity labels, immutable after construction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Roster {
    authorized: BTreeSet<String>,
    admin: BTreeSet<String>,
}

impl Roster {
    /// Build a roster from label lists; duplicates collapse
    pub fn new<A, B, S, T>(authorized: A, admin: B) -> Self
    where
        A: IntoIterator<Item = S>,
        B: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            authorized: authorized.into_iter().map(Into::into).collect(),
            admin: admin.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_authorized(&self, label: &str) -> bool {
        self.authorized.contains(label)
    }

    pub fn is_admin(&self, label: &str) -> bool {
        self.admin.contains(label)
    }

    /// Authorized membership is checked before admin membership
    pub fn grant_basis(&self, label: &str) -> Option<GrantBasis> {
        if self.is_authorized(label) {
            Some(GrantBasis::Authorized)
        } else if self.is_admin(label) {
            Some(GrantBasis::Admin)
        } else {
            None
        }
    }

    pub fn authorized(&self) -> impl Iterator<Item = &str> {
        self.authorized.iter().map(String::as_str)
    }

    pub fn admin(&self) -> impl Iterator<Item = &str> {
        self.admin.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.authorized.is_empty() && self.admin.is_empty()
    }
}
