//! Kicks Core - Shared types library.
//!
//! This crate provides the types and traits shared by the Kicks storefront
//! components:
//! - `storefront` - Cookie endpoints and the client session layer
//! - `integration-tests` - End-to-end tests driving the storefront
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! Storage backends implement [`LocalStorage`] elsewhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, the session record and freshness timestamps
//! - [`storage`] - The durable key/value storage trait and its keys

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod storage;
pub mod types;

pub use storage::{LocalStorage, StorageError, keys};
pub use types::*;
