//! Hierarchical task lifecycle management.
//!
//! Tasks form trees. Each task is created by one actor, assigned to another,
//! claimed, and then completed, failed or canceled. Completing or canceling a
//! task cancels its active descendants and reopens its parent once every
//! sibling is resolved. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
