//! Tidewater Storefront - cart, customer and wishlist synchronization.
//!
//! This crate is the state layer of a headless storefront: it talks to a
//! Shopify-shaped commerce GraphQL API and mirrors the results into reactive
//! stores that a rendering layer subscribes to. Rendering, routing and page
//! loading live elsewhere; this crate owns the hard part - keeping cart,
//! customer and wishlist state consistent with the remote source of truth
//! across overlapping asynchronous operations.
//!
//! # Layout
//!
//! - [`shopify`] - typed client for the commerce API plus the `CommerceApi`
//!   trait seam the engines are written against
//! - [`store`] - the reactive store layer (subjects + pure projections)
//! - [`session`] - opaque cart-id / customer-token persistence
//! - [`cart`], [`customer`], [`wishlist`] - the synchronization engines
//! - [`feedback`] - auto-expiring operation results for toast-style UI
//! - [`app`] - the composition root wiring all of the above

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod cart;
pub mod config;
pub mod customer;
pub mod feedback;
pub mod session;
pub mod shopify;
pub mod store;
pub mod wishlist;

pub use app::Storefront;
pub use cart::CartEngine;
pub use config::StorefrontConfig;
pub use customer::CustomerEngine;
pub use feedback::Notifier;
pub use session::{CookieIdentityStore, IdentityStore, MemoryIdentityStore};
pub use shopify::{CacheMode, ClientContext, CommerceApi, MetafieldApi, ShopifyError, StorefrontClient};
pub use store::{Store, Subscription};
pub use wishlist::WishlistEngine;
