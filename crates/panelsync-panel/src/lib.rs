//! Panelsync Panel - External panel API adapter
//!
//! HTTP client for the external game-panel's application API. This crate
//! is a driven (secondary) adapter in the hexagonal architecture: it
//! implements the `IPanelProvider` port from `panelsync-core` on top of
//! `reqwest`.
//!
//! ## Key Components
//!
//! - [`client::PanelClient`] - authenticated HTTP client with a bounded
//!   per-request timeout
//! - [`provider::PanelApiProvider`] - `IPanelProvider` implementation with
//!   HTTP-status-to-`PanelError` classification
//! - [`wire`] - raw JSON response shapes and their conversion into the
//!   port-level record types (fail-closed on missing pagination metadata)

pub mod client;
pub mod provider;
pub mod wire;

pub use client::PanelClient;
pub use provider::PanelApiProvider;
