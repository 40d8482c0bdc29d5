//! Integration test suite.
//!
//! Uses an in-memory SQLite database and shell scripts standing in for the
//! analyzer process.
//!
//! Run with: cargo test --test integration

mod test_helpers;

mod analyzer_tests;
mod api_tests;
