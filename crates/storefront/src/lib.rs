//! DroidShop storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused.
//!
//! # Architecture
//!
//! - [`realtime`]: the hierarchical store with path subscriptions, backed by
//!   memory or the Firebase Realtime Database REST API
//! - [`db`]: typed repositories for users, products, carts and orders
//! - [`services`]: identity providers, session handles and image hosting
//! - [`routes`]: server-rendered pages, form actions and live SSE fragments

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
mod filters;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::router;
