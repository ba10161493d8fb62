//! oVirt engine client for vmbatch
//!
//! Implements [`vmbatch_core::ManagementApi`] over the engine's REST API
//! (version 4, JSON). Sessions are authenticated with an SSO bearer token
//! obtained on [`OvirtClient::connect`] and revoked on `close`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod model;

pub use client::OvirtClient;
pub use config::{ConnectionConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
