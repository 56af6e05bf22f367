//! Shared domain types for Lingua.
//!
//! This crate contains the core domain types used across the Lingua platform:
//! User, ChatRoom, Message, Correction, and their associated error types,
//! plus the caller-facing result envelope and configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod envelope;
pub mod error;
pub mod message;
pub mod room;
pub mod user;
