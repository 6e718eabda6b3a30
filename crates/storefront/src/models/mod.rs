//! Domain models for the storefront.
//!
//! These mirror the records kept in the realtime store. Field names are
//! camelCase on the wire.

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartEntry};
pub use order::{NewOrder, Order, Orders};
pub use product::{Catalog, Product, ProductPatch};
pub use session::{AuthUser, Profile, SessionState};
pub use user::User;
