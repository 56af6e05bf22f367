//! Business logic and repository trait definitions for Lingua.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements, and the services built on them: the rating ledger, the
//! chat room registry, and the message/correction stores. It depends only on
//! `lingua-types` -- never on `lingua-infra` or any database/IO crate.

pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;
