//! Encoder and decoder for RPC messages.
//!
//! The WebSocket layer already frames messages, so each text frame carries
//! exactly one JSON document and no buffering is needed here.

use crate::error::ProtocolError;
use crate::message::{RpcRequest, RpcResponse};

/// Encodes requests and responses into JSON text.
pub struct Encoder;

impl Encoder {
    /// Encodes a request into a text frame payload.
    pub fn encode_request(request: &RpcRequest) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(request)?)
    }

    /// Encodes a response into a text frame payload.
    pub fn encode_response(response: &RpcResponse) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(response)?)
    }
}

/// Decodes JSON text into requests and responses.
pub struct Decoder;

impl Decoder {
    /// Decodes a request from a text payload.
    pub fn decode_request(payload: &str) -> Result<RpcRequest, ProtocolError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Decodes a response from a text payload.
    pub fn decode_response(payload: &str) -> Result<RpcResponse, ProtocolError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Decodes a response from a binary payload holding UTF-8 JSON.
    pub fn decode_response_bytes(payload: &[u8]) -> Result<RpcResponse, ProtocolError> {
        let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
        Self::decode_response(text)
    }
}
