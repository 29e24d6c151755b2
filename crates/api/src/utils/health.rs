//! Health report for the broker's dependencies
//!
//! The score is the share of healthy components; the broker counts as
//! healthy at 80% or above.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

const HEALTHY_THRESHOLD: f64 = 0.8;

/// Overall health of the broker
///
/// # Example
/// ```
/// use authbroker_api::utils::health::{ComponentHealth, HealthStatus};
///
/// let status = HealthStatus::new()
///     .add_component(ComponentHealth::healthy("session_store"))
///     .add_component(ComponentHealth::unhealthy("identity_provider", "no key"))
///     .finish();
///
/// assert_eq!(status.score, 0.5);
/// assert!(!status.is_healthy);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_healthy: bool,

    /// 0.0 (nothing works) to 1.0 (everything works)
    pub score: f64,

    pub message: Option<String>,

    pub components: Vec<ComponentHealth>,

    /// Unix timestamp (seconds) of the check
    pub timestamp: i64,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            is_healthy: true,
            score: 1.0,
            message: None,
            components: Vec::new(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Compute score and verdict from the collected components
    #[must_use]
    pub fn finish(mut self) -> Self {
        if self.components.is_empty() {
            return self;
        }

        let healthy = self.components.iter().filter(|c| c.is_healthy).count();
        #[allow(clippy::cast_precision_loss)]
        let score = healthy as f64 / self.components.len() as f64;

        self.score = score;
        self.is_healthy = score >= HEALTHY_THRESHOLD;
        if !self.is_healthy {
            let failing: Vec<&str> = self
                .components
                .iter()
                .filter(|c| !c.is_healthy)
                .map(|c| c.name.as_str())
                .collect();
            self.message = Some(format!("degraded: {}", failing.join(", ")));
        }
        self
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Health of a single dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// e.g. `session_store`
    pub name: String,

    pub is_healthy: bool,

    pub message: Option<String>,

    /// Probe round trip, when the component was actively probed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: None, latency_ms: None }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_healthy: false,
            message: Some(message.into()),
            latency_ms: None,
        }
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));
        self
    }
}
