//! The uniform `{success, message}` result envelope.
//!
//! Core services return typed `Result`s; the external request-handling
//! layer forwards them to callers in this envelope. The field names are a
//! wire contract: `success` is a boolean, `message` carries either the
//! payload or an error description.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::fmt;

/// Caller-visible result wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: T,
}

impl<T> Envelope<T> {
    pub fn ok(message: T) -> Self {
        Self {
            success: true,
            message,
        }
    }

    pub fn fail(message: T) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

impl Envelope<Value> {
    /// Adapt a service result to the wire envelope: the payload serialized
    /// as JSON on success, the error's display text on failure.
    pub fn from_result<T, E>(result: Result<T, E>) -> Self
    where
        T: Serialize,
        E: fmt::Display,
    {
        match result {
            Ok(payload) => Self::ok(serde_json::to_value(payload).unwrap_or(Value::Null)),
            Err(err) => Self::fail(Value::String(err.to_string())),
        }
    }
}
