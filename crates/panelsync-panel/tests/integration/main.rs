//! Integration test entry point for the panel adapter
//!
//! Tests run against a wiremock-based mock of the panel's application API.

mod common;
mod test_errors;
mod test_listing;
