//! # Taskboard Shared Library
//!
//! This crate contains the shared types and client-side business rules used by
//! the Taskboard API client and the board view layer.
//!
//! ## Module Organization
//!
//! - `models`: Wire-level data structures (projects, tasks, users, ...)
//! - `auth`: Role-based authorization guard
//! - `session`: Session/preferences store and its persistence
//! - `forms`: Client-side form validation

pub mod auth;
pub mod forms;
pub mod models;
pub mod session;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
