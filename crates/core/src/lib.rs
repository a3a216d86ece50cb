//! Paintstore Core - Shared types library.
//!
//! This crate provides common types used across all Paintstore components:
//! - `storefront` - Multitenant storefront server (tenant resolution, isolation, guards)
//! - `cli` - Command-line tools for migrations, tenant roles and platform reports
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, tenant roles and the permission matrix

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
