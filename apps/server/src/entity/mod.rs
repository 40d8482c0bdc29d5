//! SeaORM entity definitions.

pub mod error_log;
pub mod error_log_metadata;
