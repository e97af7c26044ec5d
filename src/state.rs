// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::SecurityContext;

/// Shared handler state. The security context is immutable once serving
/// starts, so no lock is needed.
#[derive(Clone)]
pub struct AppState {
    pub security: Arc<SecurityContext>,
}

impl AppState {
    pub fn new(security: Arc<SecurityContext>) -> Self {
        Self { security }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(SecurityContext::disabled()))
    }
}
