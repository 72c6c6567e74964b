//! Configuration module for trackforge
//!
//! This module handles loading and validating configuration from environment
//! variables, providing strongly-typed configuration structures for the
//! service, the processing pipeline and the sinks.

use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration structure for trackforge
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct Config {
    /// Server configuration
    #[serde(flatten)]
    #[envconfig(nested = true)]
    pub server: ServerConfig,

    /// Processing configuration
    #[serde(flatten)]
    #[envconfig(nested = true)]
    pub processing: ProcessingConfig,

    /// Sink configuration
    #[serde(flatten)]
    #[envconfig(nested = true)]
    pub sinks: SinkConfig,

    /// Feature flags
    #[serde(flatten)]
    #[envconfig(nested = true)]
    pub features: FeatureFlags,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct ServerConfig {
    /// Host to bind to
    #[envconfig(from = "HOST", default = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[envconfig(from = "PORT", default = "8080")]
    pub port: u16,

    /// Log level
    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// Environment (development, staging, production)
    #[envconfig(from = "ENVIRONMENT", default = "development")]
    pub environment: String,

    /// Request timeout in seconds
    #[envconfig(from = "REQUEST_TIMEOUT_SECS", default = "30")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[envconfig(from = "SHUTDOWN_TIMEOUT_SECS", default = "30")]
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Get the server address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Processing configuration
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct ProcessingConfig {
    /// Run the mobile video rewrite stage
    #[envconfig(from = "ENABLE_VIDEO_PROCESSOR", default = "true")]
    pub enable_video_processor: bool,

    /// Run the shim dispatch stage
    #[envconfig(from = "ENABLE_EVENT_SHIMS", default = "true")]
    pub enable_event_shims: bool,

    /// Largest array accepted by a single ingestion request
    #[envconfig(from = "MAX_BATCH_SIZE", default = "500")]
    pub max_batch_size: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            enable_video_processor: true,
            enable_event_shims: true,
            max_batch_size: 500,
        }
    }
}

/// Sink configuration
///
/// Unset paths fall back to logging events through `tracing`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Envconfig)]
pub struct SinkConfig {
    /// JSON lines file receiving canonical events
    #[envconfig(from = "TRACKING_LOG_PATH")]
    pub tracking_log_path: Option<String>,

    /// JSON lines file receiving analytics-annotated events
    #[envconfig(from = "ANALYTICS_LOG_PATH")]
    pub analytics_log_path: Option<String>,
}

/// Feature flags
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct FeatureFlags {
    /// Expose the `/metrics` endpoint
    #[envconfig(from = "ENABLE_METRICS", default = "true")]
    pub metrics: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenv::dotenv().ok();

        Config::init_from_env().map_err(Error::from)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("Server port cannot be 0"));
        }

        if self.processing.max_batch_size == 0 {
            return Err(Error::config("Max batch size must be at least 1"));
        }

        if let (Some(tracking), Some(analytics)) =
            (&self.sinks.tracking_log_path, &self.sinks.analytics_log_path)
        {
            if tracking == analytics {
                return Err(Error::config(
                    "Tracking and analytics logs must be written to different files",
                ));
            }
        }

        Ok(())
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!(
            server_address = %self.server.address(),
            environment = %self.server.environment,
            log_level = %self.server.log_level,
            "Server configuration"
        );

        tracing::info!(
            video_processor = %self.processing.enable_video_processor,
            event_shims = %self.processing.enable_event_shims,
            max_batch_size = %self.processing.max_batch_size,
            "Processing configuration"
        );

        tracing::info!(
            tracking_log = ?self.sinks.tracking_log_path,
            analytics_log = ?self.sinks.analytics_log_path,
            "Sink configuration"
        );

        tracing::info!(metrics = %self.features.metrics, "Feature flags");
    }
}
