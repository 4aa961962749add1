//! Integration test entry point for the reconciliation engine
//!
//! Tests drive the real controller, sequencer, and service over the real
//! SQLite stores, with a scripted in-process panel stub standing in for
//! the external API.

mod common;
mod test_controller;
