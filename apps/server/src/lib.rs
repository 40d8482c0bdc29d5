//! Error Log Analyzer Server library.
//!
//! Runs an external analyzer over error logs, recovers its JSON result, and
//! stores analyzed logs for filtered, date-grouped history queries.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
