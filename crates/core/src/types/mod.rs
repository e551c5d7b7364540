//! Core types for the Kicks storefront.
//!
//! This module provides type-safe wrappers for the session layer's domain
//! concepts.

pub mod freshness;
pub mod id;
pub mod session;

pub use freshness::Freshness;
pub use id::*;
pub use session::SessionRecord;
