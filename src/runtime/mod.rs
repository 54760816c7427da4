//! Workload runtime abstraction — listing, inspecting, and lifecycle control.

pub mod docker;

use async_trait::async_trait;
use std::fmt;

/// Observed status of a workload, as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadStatus {
    Running,
    Exited,
    Stopped,
    Unhealthy,
    Other(String),
}

impl WorkloadStatus {
    /// Map a raw runtime status string onto the closed set we care about.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "running" => Self::Running,
            "exited" => Self::Exited,
            "stopped" => Self::Stopped,
            "unhealthy" => Self::Unhealthy,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Statuses that trigger a health alert when entered.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Exited | Self::Stopped | Self::Unhealthy)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Exited => write!(f, "exited"),
            Self::Stopped => write!(f, "stopped"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A workload as seen in a runtime listing.
#[derive(Debug, Clone)]
pub struct Workload {
    pub name: String,
    pub status: WorkloadStatus,
}

/// Detailed attributes of a single workload, for the detail screen.
#[derive(Debug, Clone)]
pub struct WorkloadDetail {
    pub name: String,
    pub status: WorkloadStatus,
    pub id: String,
    pub started_at: String,
    pub ports: String,
}

/// Errors from runtime operations. `NotFound` is recoverable and rendered
/// as a user-visible message; everything else is a transient failure.
#[derive(Debug)]
pub enum RuntimeError {
    NotFound,
    Failed(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "workload not found"),
            Self::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Trait for the container runtime the bot controls.
#[async_trait]
pub trait WorkloadRuntime: Send + Sync {
    /// List workloads; with `include_stopped`, also those not running.
    async fn list(&self, include_stopped: bool) -> Result<Vec<Workload>, RuntimeError>;

    /// Inspect a single workload by name.
    async fn get(&self, name: &str) -> Result<WorkloadDetail, RuntimeError>;

    async fn start(&self, name: &str) -> Result<(), RuntimeError>;
    async fn stop(&self, name: &str) -> Result<(), RuntimeError>;
    async fn restart(&self, name: &str) -> Result<(), RuntimeError>;
}
