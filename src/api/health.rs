//! Health check endpoints for trackforge
//!
//! This module implements health and readiness checks for Kubernetes
//! and other orchestration platforms.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{AppState, ComponentHealth, HealthResponse, HealthStatus, ReadyResponse, BUILD_INFO};
use crate::shim::ShimRegistry;

/// Component name reported for the shim registry
pub const SHIM_REGISTRY: &str = "shim_registry";

/// Application state for health checks
#[derive(Clone)]
pub struct HealthState {
    /// Shared state for component health tracking
    pub components: Arc<tokio::sync::RwLock<HashMap<String, ComponentHealth>>>,
}

impl HealthState {
    /// Create a new health state
    pub fn new() -> Self {
        Self {
            components: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
        }
    }

    /// Update component health status
    pub async fn update_component(
        &self,
        name: String,
        status: HealthStatus,
        message: Option<String>,
    ) {
        let mut components = self.components.write().await;
        components.insert(
            name,
            ComponentHealth {
                status,
                message,
                last_check: Utc::now(),
            },
        );
    }

    /// Reported components plus a fresh shim registry check
    pub async fn snapshot(&self) -> HashMap<String, ComponentHealth> {
        let mut components = self.components.read().await.clone();
        components.insert(SHIM_REGISTRY.to_string(), check_shim_registry());
        components
    }

    /// Get overall health status
    pub async fn get_status(&self) -> HealthStatus {
        let components = self.snapshot().await;
        HealthStatus::worst(components.values().map(|c| &c.status))
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// The service cannot shim events until the registry is loaded
pub fn check_shim_registry() -> ComponentHealth {
    let (status, message) = if ShimRegistry::is_global_initialized() {
        let registry = ShimRegistry::global();
        (
            HealthStatus::Healthy,
            format!("{} shims registered", registry.len()),
        )
    } else {
        (
            HealthStatus::Unhealthy,
            "Shim registry not initialized".to_string(),
        )
    };

    ComponentHealth {
        status,
        message: Some(message),
        last_check: Utc::now(),
    }
}

/// Basic liveness check endpoint
///
/// Returns 200 OK if the service is alive.
///
/// # Example
/// ```text
/// GET /healthz
/// ```
pub async fn health_check() -> Response {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Service is running".to_string()),
        timestamp: Utc::now(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Readiness check endpoint
///
/// # Example
/// ```text
/// GET /readyz
/// ```
pub async fn ready_check(State(state): State<AppState>) -> Response {
    let checks = state.health.snapshot().await;
    let overall_status = HealthStatus::worst(checks.values().map(|c| &c.status));

    let response = ReadyResponse {
        status: overall_status,
        checks,
        timestamp: Utc::now(),
    };

    (overall_status.to_status_code(), Json(response)).into_response()
}

/// Build information endpoint
///
/// # Example
/// ```text
/// GET /build
/// ```
pub async fn build_info() -> Response {
    (StatusCode::OK, Json(&BUILD_INFO)).into_response()
}
