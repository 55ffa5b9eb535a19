//! Bazaar storefront client library.
//!
//! A REST adapter for the Bazaar API plus the session-scoped state a shopper
//! front end keeps: identity, cart, wishlist and notifications. Catalog,
//! order, address and coupon calls are thin resource clients over the same
//! adapter.
//!
//! # Layout
//!
//! - [`api`] - HTTP adapter, envelope handling, 401 redirect signal, retry
//! - [`session`] - identity state machine observed through a `watch` channel
//! - [`cart`], [`wishlist`], [`notifications`] - owner-scoped containers
//! - [`catalog`], [`orders`], [`addresses`], [`checkout`] - resource clients
//! - [`state`] - [`AppState`] wiring everything to one session

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod addresses;
pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod notifications;
pub mod orders;
pub mod scoped;
pub mod session;
pub mod state;
pub mod wishlist;

pub use api::{ApiClient, Redirect, RetryPolicy};
pub use config::{ClientConfig, ConfigError};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::ClientError;
pub use session::{Owner, Session, SessionState, SessionView, SignUpPolicy};
pub use state::AppState;
