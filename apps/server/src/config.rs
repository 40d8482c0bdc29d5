//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::analyzer::AnalyzerConfig;

/// Development default values.
pub mod defaults {
    pub const DATABASE_URL: &str = "sqlite://data/database.db?mode=rwc";
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 3011;
    pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB per request body
    pub const MAX_CONCURRENT_ANALYSES: usize = 4; // Max analyzer processes at once
    pub const ANALYSIS_QUEUE_TIMEOUT_SECS: u64 = 30; // Queue timeout before rejecting

    // Analyzer process defaults
    pub const ANALYZER_PROGRAM: &str = "python";
    pub const ANALYZER_SCRIPT: &str = "mcp-error-log-analyzer.py";
    pub const ANALYZER_TIMEOUT_SECS: u64 = 60;
    pub const ANALYZER_MAX_OUTPUT_BYTES: usize = 50 * 1024 * 1024; // 50MB per stream
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL (SQLite or PostgreSQL connection string)
    pub database_url: String,
    /// Directory for static frontend assets
    pub static_dir: Option<PathBuf>,
    /// Maximum request body size in bytes (default: 10MB)
    pub max_body_size: usize,
    /// Maximum concurrent analyzer invocations (default: 4)
    pub max_concurrent_analyses: usize,
    /// Seconds a request waits for an analyzer slot (default: 30s)
    pub analysis_queue_timeout_secs: u64,
    /// Analyzer process configuration
    pub analyzer: AnalyzerConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `ELA_HOST`: Server host (default: 127.0.0.1)
    /// - `ELA_PORT`: Server port (default: 3011)
    /// - `DATABASE_URL`: SQLite or PostgreSQL connection string
    /// - `ELA_STATIC_DIR`: Static frontend directory
    /// - `ELA_MAX_BODY_SIZE`: Max request body in bytes (default: 10MB)
    /// - `ELA_MAX_CONCURRENT_ANALYSES`: Max analyzer processes at once (default: 4)
    /// - `ELA_ANALYSIS_QUEUE_TIMEOUT_SECS`: Wait for an analyzer slot (default: 30)
    /// - `ELA_ANALYZER_PROGRAM`: Analyzer executable (default: python)
    /// - `ELA_ANALYZER_SCRIPT`: Script passed to the program, empty to disable
    /// - `ELA_ANALYZER_TIMEOUT_SECS`: Per-invocation timeout (default: 60)
    /// - `ELA_ANALYZER_MAX_OUTPUT_BYTES`: Per-stream output ceiling (default: 50MB)
    /// - `ELA_ANALYZER_RESULT_FILE_ARG`: Flag naming the result hand-off file
    /// - `ELA_WORKSPACE_DIR`: Default workspace passed to the analyzer
    /// - `ELA_TEMP_DIR`: Directory for materialized log content
    pub fn from_env() -> Result<Self, ConfigError> {
        // Parse environment - required
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("ELA_HOST").unwrap_or_else(|_| defaults::HOST.to_string());

        let port = env::var("ELA_PORT")
            .unwrap_or_else(|_| defaults::PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("ELA_PORT must be a valid port number"))?;

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| defaults::DATABASE_URL.to_string());

        let static_dir = env::var("ELA_STATIC_DIR").ok().map(PathBuf::from);

        let max_body_size = parse_var(
            "ELA_MAX_BODY_SIZE",
            defaults::MAX_BODY_SIZE,
            "ELA_MAX_BODY_SIZE must be a valid number",
        )?;

        let max_concurrent_analyses = parse_var(
            "ELA_MAX_CONCURRENT_ANALYSES",
            defaults::MAX_CONCURRENT_ANALYSES,
            "ELA_MAX_CONCURRENT_ANALYSES must be a valid number",
        )?;
        if max_concurrent_analyses == 0 {
            return Err(ConfigError::InvalidValue(
                "ELA_MAX_CONCURRENT_ANALYSES must be at least 1",
            ));
        }

        let analysis_queue_timeout_secs = parse_var(
            "ELA_ANALYSIS_QUEUE_TIMEOUT_SECS",
            defaults::ANALYSIS_QUEUE_TIMEOUT_SECS,
            "ELA_ANALYSIS_QUEUE_TIMEOUT_SECS must be a valid number",
        )?;

        let analyzer = AnalyzerConfig {
            program: env::var("ELA_ANALYZER_PROGRAM")
                .unwrap_or_else(|_| defaults::ANALYZER_PROGRAM.to_string()),
            script: match env::var("ELA_ANALYZER_SCRIPT") {
                Ok(script) if script.trim().is_empty() => None,
                Ok(script) => Some(PathBuf::from(script)),
                Err(_) => Some(PathBuf::from(defaults::ANALYZER_SCRIPT)),
            },
            timeout: Duration::from_secs(parse_var(
                "ELA_ANALYZER_TIMEOUT_SECS",
                defaults::ANALYZER_TIMEOUT_SECS,
                "ELA_ANALYZER_TIMEOUT_SECS must be a valid number",
            )?),
            max_output_bytes: parse_var(
                "ELA_ANALYZER_MAX_OUTPUT_BYTES",
                defaults::ANALYZER_MAX_OUTPUT_BYTES,
                "ELA_ANALYZER_MAX_OUTPUT_BYTES must be a valid number",
            )?,
            result_file_arg: env::var("ELA_ANALYZER_RESULT_FILE_ARG")
                .ok()
                .filter(|arg| !arg.trim().is_empty()),
            working_dir: env::current_dir().map_err(|_| {
                ConfigError::InvalidValue("current working directory is not accessible")
            })?,
            default_workspace: env::var("ELA_WORKSPACE_DIR").ok().map(PathBuf::from),
            temp_dir: env::var("ELA_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
        };

        let config = Config {
            environment,
            host,
            port,
            database_url,
            static_dir,
            max_body_size,
            max_concurrent_analyses,
            analysis_queue_timeout_secs,
            analyzer,
        };

        // Validate production configuration
        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that the production configuration is usable.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.database_url.contains(":memory:") {
            errors.push(format!(
                "DATABASE_URL '{}' is in-memory. Set a persistent database.",
                self.database_url
            ));
        }

        if let Some(ref script) = self.analyzer.script
            && !self.analyzer.resolve_script(script).exists()
        {
            errors.push(format!(
                "ELA_ANALYZER_SCRIPT '{}' does not exist.",
                script.display()
            ));
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }

    /// Analysis queue timeout as a Duration.
    pub fn analysis_queue_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_queue_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &str,
    default: T,
    message: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(message)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
