//! Vendora Core - Shared types library.
//!
//! This crate provides common types used across all Vendora components:
//! - `storefront` - Multi-tenant storefront engine (catalog, cart, checkout)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and statuses
//! - [`identity`] - Order-invariant variant identity hashing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod identity;
pub mod types;

pub use identity::variant_identity_hash;
pub use types::*;
