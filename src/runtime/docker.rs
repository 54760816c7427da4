//! Docker runtime backed by the `docker` CLI.
//!
//! Shells out via `tokio::process::Command` rather than speaking the engine
//! API directly; "No such container" on stderr maps to [`RuntimeError::NotFound`].

use super::{RuntimeError, Workload, WorkloadDetail, WorkloadRuntime, WorkloadStatus};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

pub struct DockerCli {
    bin: String,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    async fn docker(&self, args: &[&str]) -> Result<String, RuntimeError> {
        let output = Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|e| RuntimeError::Failed(format!("failed to run {}: {e}", self.bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such container") {
                return Err(RuntimeError::NotFound);
            }
            return Err(RuntimeError::Failed(stderr.trim().to_owned()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// --- docker inspect response (only the fields we render) ---

#[derive(Debug, Deserialize)]
struct Inspect {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "State")]
    state: InspectState,
    #[serde(rename = "NetworkSettings", default)]
    network: Option<InspectNetwork>,
}

#[derive(Debug, Deserialize)]
struct InspectState {
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "StartedAt", default)]
    started_at: String,
    #[serde(rename = "Health", default)]
    health: Option<InspectHealth>,
}

#[derive(Debug, Deserialize)]
struct InspectHealth {
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Debug, Deserialize)]
struct InspectNetwork {
    #[serde(rename = "Ports", default)]
    ports: serde_json::Value,
}

/// Parse `docker ps --format '{{.Names}}\t{{.State}}\t{{.Status}}'` output.
///
/// The human-readable `.Status` column is only consulted for the
/// "(unhealthy)" suffix, which `.State` does not report.
fn parse_ps(output: &str) -> Vec<Workload> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let state = fields.next().unwrap_or_default().trim();
            let human = fields.next().unwrap_or_default();
            let status = if human.contains("(unhealthy)") {
                WorkloadStatus::Unhealthy
            } else {
                WorkloadStatus::parse(state)
            };
            Some(Workload {
                name: name.to_owned(),
                status,
            })
        })
        .collect()
}

/// Parse a single-object `docker inspect --format '{{json .}}'` payload.
fn parse_inspect(name: &str, json: &str) -> Result<WorkloadDetail, RuntimeError> {
    let inspect: Inspect = serde_json::from_str(json)
        .map_err(|e| RuntimeError::Failed(format!("bad inspect payload: {e}")))?;

    let status = match &inspect.state.health {
        Some(h) if h.status == "unhealthy" => WorkloadStatus::Unhealthy,
        _ => WorkloadStatus::parse(&inspect.state.status),
    };

    let ports = inspect
        .network
        .and_then(|n| {
            if n.ports.is_null() {
                None
            } else {
                serde_json::to_string(&n.ports).ok()
            }
        })
        .unwrap_or_else(|| "{}".to_owned());

    Ok(WorkloadDetail {
        name: name.to_owned(),
        status,
        id: inspect.id,
        started_at: inspect.state.started_at,
        ports,
    })
}

#[async_trait]
impl WorkloadRuntime for DockerCli {
    async fn list(&self, include_stopped: bool) -> Result<Vec<Workload>, RuntimeError> {
        let format = "{{.Names}}\t{{.State}}\t{{.Status}}";
        let output = if include_stopped {
            self.docker(&["ps", "-a", "--format", format]).await?
        } else {
            self.docker(&["ps", "--format", format]).await?
        };
        Ok(parse_ps(&output))
    }

    async fn get(&self, name: &str) -> Result<WorkloadDetail, RuntimeError> {
        let output = self
            .docker(&["inspect", "--format", "{{json .}}", name])
            .await?;
        parse_inspect(name, output.trim())
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.docker(&["start", name]).await.map(|_| ())
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.docker(&["stop", name]).await.map(|_| ())
    }

    async fn restart(&self, name: &str) -> Result<(), RuntimeError> {
        self.docker(&["restart", name]).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ps_lines_map_to_workloads() {
        let output = "web_front\trunning\tUp 3 hours\n\
                      db_main\texited\tExited (1) 2 minutes ago\n";
        let workloads = parse_ps(output);
        assert_eq!(workloads.len(), 2);
        assert_eq!(workloads[0].name, "web_front");
        assert_eq!(workloads[0].status, WorkloadStatus::Running);
        assert_eq!(workloads[1].name, "db_main");
        assert_eq!(workloads[1].status, WorkloadStatus::Exited);
    }

    #[test]
    fn ps_unhealthy_suffix_overrides_state() {
        let output = "api\trunning\tUp 2 hours (unhealthy)\n";
        let workloads = parse_ps(output);
        assert_eq!(workloads[0].status, WorkloadStatus::Unhealthy);
    }

    #[test]
    fn ps_skips_blank_lines() {
        assert!(parse_ps("\n\n").is_empty());
    }

    #[test]
    fn inspect_payload_round_trip() {
        let json = r#"{
            "Id": "abc123",
            "State": {"Status": "running", "StartedAt": "2024-05-01T10:00:00Z"},
            "NetworkSettings": {"Ports": {"80/tcp": [{"HostPort": "8080"}]}}
        }"#;
        let detail = parse_inspect("web", json).unwrap();
        assert_eq!(detail.name, "web");
        assert_eq!(detail.status, WorkloadStatus::Running);
        assert_eq!(detail.id, "abc123");
        assert_eq!(detail.started_at, "2024-05-01T10:00:00Z");
        assert!(detail.ports.contains("8080"));
    }

    #[test]
    fn inspect_health_status_wins() {
        let json = r#"{
            "Id": "abc",
            "State": {"Status": "running", "StartedAt": "", "Health": {"Status": "unhealthy"}}
        }"#;
        let detail = parse_inspect("api", json).unwrap();
        assert_eq!(detail.status, WorkloadStatus::Unhealthy);
    }

    #[test]
    fn inspect_garbage_is_an_error() {
        assert!(parse_inspect("x", "not json").is_err());
    }
}
