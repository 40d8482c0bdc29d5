//! Business logic services.

pub mod analyzer;
pub mod extraction;
pub mod field_resolver;
pub mod grouping;

pub use analyzer::{AnalyzeRequest, Analyzer, AnalyzerConfig, AnalyzerOutput, InvocationFailure};
pub use extraction::{Extraction, ExtractionDiagnostics, ExtractionSource};
pub use field_resolver::FieldResolver;
pub use grouping::{DateGroup, group_by_date};
