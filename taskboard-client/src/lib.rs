//! # Taskboard Client Library
//!
//! Data synchronization and role-gated mutation layer of the Taskboard
//! dashboard.
//!
//! ## Modules
//!
//! - `config`: Configuration management
//! - `error`: Error taxonomy and user-facing messages
//! - `http`: Remote data client (bearer auth, status mapping)
//! - `cache`: Tag-based query cache with de-duplication and invalidation
//! - `api`: Typed facade over every backend capability
//! - `upload`: Media host upload collaborator
//! - `role_sync`: Keeps the session role in line with the server

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod role_sync;
pub mod upload;
