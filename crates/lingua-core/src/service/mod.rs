//! Business logic services (use cases).
//!
//! Services orchestrate repository calls and business rules. They depend
//! on traits (ports) -- never on concrete infrastructure implementations.

pub mod ledger;
pub mod registry;
pub mod store;
