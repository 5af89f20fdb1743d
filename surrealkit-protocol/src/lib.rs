//! # surrealkit-protocol
//!
//! Wire protocol types for talking to SurrealDB.
//!
//! This crate provides:
//! - JSON-RPC style request/response envelopes for the WebSocket transport
//! - Statement envelopes returned by the HTTP transport
//! - RPC error codes and the recoverable ("safe") code set
//! - Record id composition (`table:key`)
//! - JSON-Patch operation builders

pub mod codec;
pub mod error;
pub mod message;
pub mod patch;
pub mod record;

pub use codec::{Decoder, Encoder};
pub use error::{ProtocolError, RpcError, SAFE_ERROR_CODES};
pub use message::{
    HttpErrorBody, Method, ResponseKind, RpcRequest, RpcResponse, SigninParams, StatementResult,
};
pub use patch::{Patch, PatchOp};
pub use record::{target, RecordId};

/// Default port for a SurrealDB server.
pub const DEFAULT_PORT: u16 = 8000;

/// Path of the WebSocket RPC endpoint.
pub const RPC_PATH: &str = "/rpc";

/// Path of the raw query endpoint on the HTTP transport.
pub const SQL_PATH: &str = "/sql";

/// Path prefix of the record endpoints on the HTTP transport.
pub const KEY_PATH: &str = "/key";

/// Close codes treated as a graceful shutdown of the WebSocket.
pub const GRACEFUL_CLOSE_CODES: [u16; 2] = [1000, 1002];
