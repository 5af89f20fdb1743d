//! # surrealkit-client
//!
//! Client library for SurrealDB.
//!
//! This crate provides:
//! - A stateful WebSocket client that authenticates and selects a namespace
//!   on connect, gates commands on that handshake and correlates replies by id
//! - Typed response views for query, record and patch results
//! - A stateless HTTP client for the same record operations
//! - The [`Datastore`] trait implemented by both

pub mod classify;
pub mod client;
pub mod connection;
pub mod correlator;
pub mod datastore;
pub mod error;
pub mod handshake;
pub mod http;
pub mod response;
pub mod state;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig, Session};
pub use datastore::Datastore;
pub use error::ClientError;
pub use http::{HttpClient, HttpConfig};
pub use response::{CrudResponse, PatchResponse, QueryResponse, Record, Records, TypedResponse};
pub use state::{ConnectionState, Readiness};
pub use surrealkit_protocol::{Method, Patch, RecordId};
