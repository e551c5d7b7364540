//! Kicks storefront library.
//!
//! Two halves share this crate:
//!
//! - the server side ([`routes`], [`middleware`], [`state`]) exposing the
//!   cookie bridge that mirrors a client login into durable cookies;
//! - the client session layer ([`client`]) with image path resolution,
//!   image freshness tracking, the local session store and the
//!   authorization-failure teardown, backed by a [`storage`] implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod storage;
