//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod email;
pub mod envelope;
pub mod id;
pub mod price;
pub mod status;

pub use credential::BearerToken;
pub use email::{Email, EmailError};
pub use envelope::Envelope;
pub use id::*;
pub use price::{CurrencyCode, Price, ShippingPolicy, discount_percentage, effective_price};
pub use status::*;
