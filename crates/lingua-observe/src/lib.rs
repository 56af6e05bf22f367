//! Observability for Lingua: tracing subscriber setup.

pub mod tracing_setup;
