//! Bazaar admin library.
//!
//! Dashboard statistics and the back-office clients. Everything here runs on
//! the same [`Session`](bazaar_storefront::Session) as the shopper
//! containers and refuses to act unless the current identity is an admin.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod error;
pub mod stats;
pub mod types;

pub use client::AdminClient;
pub use error::AdminError;
pub use stats::AdminStatsStore;
pub use types::{
    AdminStats, BrandInput, CategoryInput, Coupon, CouponInput, ManagedUser, ProductInput,
    ReviewFilter, StoreSettings, UserQuery,
};
