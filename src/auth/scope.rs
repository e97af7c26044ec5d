// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scope matching.
//!
//! A request is admitted when any of the principal's patterns matches the
//! string `"<VERB> <PATH>"`. Matching uses search semantics: an unanchored
//! pattern such as `GET` admits every GET request, so configurations should
//! anchor their patterns (`^GET /time$`).

use regex::Regex;

use super::users::Principal;

/// Outcome of a scope check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeDecision {
    Permitted,
    Denied,
}

/// A configured scope pattern and its compiled form.
#[derive(Debug, Clone)]
pub struct ScopePattern {
    source: String,
    regex: Option<Regex>,
}

impl ScopePattern {
    /// Compile a pattern. A pattern that fails to compile never matches.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let regex = match Regex::new(&source) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(
                    pattern = %source,
                    error = %e,
                    "Scope pattern does not compile and will never match"
                );
                None
            }
        };
        Self { source, regex }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern compiled.
    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    pub fn matches(&self, required: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(required))
    }
}

/// Build the scope string a request must satisfy.
pub fn required_scope(verb: &str, path: &str) -> String {
    format!("{verb} {path}")
}

/// Test `required` against each of the principal's patterns, in order.
pub fn check_scope(required: &str, principal: &Principal) -> ScopeDecision {
    match principal.scope().iter().find(|pattern| pattern.matches(required)) {
        Some(pattern) => {
            tracing::trace!(
                user = %principal.name(),
                pattern = %pattern.as_str(),
                scope = %required,
                "Scope granted"
            );
            ScopeDecision::Permitted
        }
        None => ScopeDecision::Denied,
    }
}
