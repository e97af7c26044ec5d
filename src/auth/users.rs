// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory directory of credentialed principals.
//!
//! The store is populated once at startup and is read-only while serving.
//! Principal names and secrets are wiped when a principal is dropped.

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::scope::ScopePattern;

/// Errors raised while building the user store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserStoreError {
    #[error("user name must be a non-empty string")]
    EmptyName,
    #[error("user \"{0}\" must have a non-empty secret")]
    EmptySecret(String),
    #[error("duplicate user name \"{0}\"")]
    DuplicateName(String),
    #[error("user \"{0}\" is not configured")]
    NotFound(String),
}

/// A principal allowed to obtain tokens.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Principal {
    name: String,
    secret: String,
    #[zeroize(skip)]
    scope: Vec<ScopePattern>,
}

impl Principal {
    /// Create a principal, compiling each scope pattern.
    ///
    /// Patterns that fail to compile are kept but never match.
    pub fn new<I, S>(
        name: impl Into<String>,
        secret: impl Into<String>,
        scope: I,
    ) -> Result<Self, UserStoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let secret = secret.into();

        if name.is_empty() {
            return Err(UserStoreError::EmptyName);
        }
        if secret.is_empty() {
            return Err(UserStoreError::EmptySecret(name));
        }

        let scope = scope.into_iter().map(ScopePattern::new).collect();

        Ok(Self {
            name,
            secret,
            scope,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scope patterns in configuration order.
    pub fn scope(&self) -> &[ScopePattern] {
        &self.scope
    }

    /// Compare a presented secret in constant time.
    pub fn secret_matches(&self, candidate: &str) -> bool {
        self.secret.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    #[cfg(test)]
    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Principal")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Append-only collection of principals with unique names.
///
/// Lookups are linear; the store is expected to hold tens of entries.
#[derive(Debug, Default)]
pub struct UserStore {
    principals: Vec<Principal>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a principal, rejecting a name that is already present.
    pub fn add(&mut self, principal: Principal) -> Result<(), UserStoreError> {
        if self.lookup(principal.name()).is_some() {
            return Err(UserStoreError::DuplicateName(principal.name().to_string()));
        }
        self.principals.push(principal);
        Ok(())
    }

    /// Swap in a new definition for an existing principal.
    ///
    /// The previous definition is wiped as it is dropped.
    pub fn replace(&mut self, principal: Principal) -> Result<(), UserStoreError> {
        let slot = self
            .principals
            .iter_mut()
            .find(|p| p.name == principal.name)
            .ok_or_else(|| UserStoreError::NotFound(principal.name().to_string()))?;
        *slot = principal;
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Principal> {
        self.principals.iter().find(|p| p.name == name)
    }

    /// Principal named `name` if `secret` matches.
    ///
    /// A miss still runs one constant-time comparison so an unknown name
    /// costs about as much as a wrong secret.
    pub fn verify_credentials(&self, name: &str, secret: &str) -> Option<&Principal> {
        match self.lookup(name) {
            Some(principal) if principal.secret_matches(secret) => Some(principal),
            Some(_) => None,
            None => {
                let candidate = secret.as_bytes();
                std::hint::black_box(bool::from(candidate.ct_eq(candidate)));
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Principal> {
        self.principals.iter()
    }

    /// Wipe and release every principal.
    pub fn destroy(&mut self) {
        for principal in self.principals.iter_mut() {
            principal.zeroize();
        }
        self.principals.clear();
        tracing::trace!("User store destroyed");
    }
}

impl Drop for UserStore {
    fn drop(&mut self) {
        if !self.principals.is_empty() {
            self.destroy();
        }
    }
}
