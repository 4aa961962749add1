//! Panelsync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `SyncRun`, the local mirror entities (`Location`,
//!   `Node`, `Allocation`, `Nest`, `Egg`, `Server`, `ServerDatabase`, `User`)
//!   and the run bookkeeping types (`SyncSummary`, `EntityCounts`)
//! - **Merge policy** - the panel-owned vs. locally-owned field split,
//!   expressed as per-entity functions in [`domain::merge`]
//! - **Port definitions** - Traits for adapters: `IPanelProvider`,
//!   `IMirrorRepository`, `ISyncLogStore`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement.
//! The engine crate orchestrates domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
