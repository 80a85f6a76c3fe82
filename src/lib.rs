//! Agent task manager: hierarchical work tracking for cooperating agents.
//!
//! Agents hand each other units of work as trees of tasks. This crate
//! provides the lifecycle engine that keeps those trees consistent under
//! concurrent use, the claim protocol that gives each task to exactly one
//! worker, an in-memory index of actors that currently hold work, and a
//! retention sweep that purges expired tasks.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: status state machine and task rules, free of infrastructure
//! - **Ports**: transactional store and notifier contracts
//! - **Adapters**: `PostgreSQL`, in-memory and logging implementations
//!
//! # Modules
//!
//! - [`task`]: task domain, ports, adapters and services
//! - [`config`]: engine settings

pub mod config;
pub mod task;
