//! Edge-triggered workload health monitor.
//!
//! Each tick diffs every workload's status against the last observation and
//! alerts only on *transitions* into the unhealthy class, so a container that
//! stays down does not flood the chat once per tick.

use crate::history::NotificationHistory;
use crate::runtime::{WorkloadRuntime, WorkloadStatus};
use crate::session::alert_text;
use crate::transport::ChatTransport;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Last-known state of one workload.
#[derive(Debug, Clone)]
pub struct WorkloadState {
    pub status: WorkloadStatus,
    pub changed_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct HealthMonitor {
    states: HashMap<String, WorkloadState>,
    notified: HashSet<String>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record current statuses without alerting, so the first tick after
    /// startup does not re-announce containers that were already down.
    pub async fn prime(&mut self, runtime: &dyn WorkloadRuntime) {
        match runtime.list(true).await {
            Ok(workloads) => {
                let now = Utc::now();
                for w in workloads {
                    self.states.insert(
                        w.name,
                        WorkloadState {
                            status: w.status,
                            changed_at: now,
                        },
                    );
                }
                eprintln!("[monitor] primed {} workload state(s)", self.states.len());
            }
            Err(e) => eprintln!("[monitor] prime failed, starting cold: {e}"),
        }
    }

    /// One monitoring pass: diff statuses, alert on unhealthy transitions.
    ///
    /// A delivery failure for one workload does not abort the rest of the
    /// tick; each workload's notification attempt is independent.
    pub async fn tick(
        &mut self,
        runtime: &dyn WorkloadRuntime,
        transport: &dyn ChatTransport,
        history: &mut NotificationHistory,
        alert_chat_id: i64,
    ) {
        let workloads = match runtime.list(true).await {
            Ok(w) => w,
            Err(e) => {
                eprintln!("[monitor] failed to list workloads: {e}");
                return;
            }
        };

        for w in workloads {
            let changed = self
                .states
                .get(&w.name)
                .is_none_or(|s| s.status != w.status);
            if !changed {
                continue;
            }

            self.states.insert(
                w.name.clone(),
                WorkloadState {
                    status: w.status.clone(),
                    changed_at: Utc::now(),
                },
            );

            if w.status.is_unhealthy() && !self.notified.contains(&w.name) {
                // A move between two unhealthy statuses (exited -> stopped)
                // is not a new incident.
                let message = alert_text(&w.name, &w.status);
                history.record(&message);
                match transport.send_message(alert_chat_id, &message, &[]).await {
                    Ok(handle) => history.push_delivered(handle),
                    Err(e) => {
                        eprintln!("[monitor] failed to deliver alert for {}: {e}", w.name);
                    }
                }
                self.notified.insert(w.name);
            } else if w.status.is_running() {
                // Recovered; allow re-alerting on a future failure.
                self.notified.remove(&w.name);
            }
        }
    }

    #[cfg(test)]
    fn status_of(&self, name: &str) -> Option<&WorkloadStatus> {
        self.states.get(name).map(|s| &s.status)
    }
}
