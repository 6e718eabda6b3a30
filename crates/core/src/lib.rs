//! DroidShop Core - Shared domain types.
//!
//! This crate provides the value types used by the storefront:
//! store keys for users, products and orders, validated email addresses,
//! decimal prices and the order status enum.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe keys, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
