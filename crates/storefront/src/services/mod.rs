//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Accounts, sign-in and observable session state
//! - `images` - Product image uploads to the image host

pub mod auth;
pub mod images;

pub use images::{ImageHostClient, UploadError};
