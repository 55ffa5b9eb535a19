//! Bazaar Core - Shared types library.
//!
//! This crate provides common types used across all Bazaar components:
//! - `storefront` - REST client, session and shopper state containers
//! - `admin` - Back-office clients and dashboard statistics
//! - `cli` - The `bz` command-line console
//!
//! # Architecture
//!
//! The core crate contains only types and pure arithmetic - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices, statuses, the bearer credential
//!   and the API response envelope

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
