// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Restserver security layer
//!
//! Token-based access control for the REST front end of an LwM2M server:
//! principals exchange credentials for a signed access token, and every
//! other request is admitted only when the token's principal holds a scope
//! pattern matching `"<VERB> <PATH>"`.
//!
//! ## Modules
//!
//! - `api` - HTTP router and handlers (Axum)
//! - `auth` - User store, token codec, scope gate
//! - `config` - JSON configuration file and defaults
//! - `tls` - TLS key and certificate material

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod tls;
