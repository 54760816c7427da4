//! Per-conversation live-refresh jobs.
//!
//! At most one repeating task exists per key: arming a key cancels the
//! previous task before the new one is spawned, and cancelling is idempotent.
//! Cancellation stops future firings; a firing already in flight completes.

use crate::transport::{ChatTransport, InlineButton, MessageRef};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A content producer for one firing of a live-refresh task.
pub type RefreshFuture = Pin<Box<dyn Future<Output = color_eyre::Result<String>> + Send>>;
pub type Producer = Arc<dyn Fn() -> RefreshFuture + Send + Sync>;

struct TaskEntry {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct JobScheduler {
    tasks: HashMap<i64, TaskEntry>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repeating task under `key`, replacing any existing one.
    ///
    /// Each firing calls `producer` and pushes the rendered text to the
    /// conversation's anchor message. A producer error is logged and the
    /// task retries on the next tick, so a transient read failure does not
    /// silently end a live view.
    #[allow(clippy::too_many_arguments)]
    pub fn arm(
        &mut self,
        key: i64,
        cadence: Duration,
        first_delay: Duration,
        anchor: MessageRef,
        keyboard: Vec<Vec<InlineButton>>,
        producer: Producer,
        transport: Arc<dyn ChatTransport>,
    ) {
        // Replace semantics: never two concurrent tasks for the same key.
        self.cancel(key);

        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + first_delay;
            let mut timer = tokio::time::interval_at(start, cadence);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = timer.tick() => {}
                }

                let text = match producer().await {
                    Ok(text) => text,
                    Err(e) => {
                        eprintln!("[refresh] producer error for chat {}: {e}", anchor.chat_id);
                        continue;
                    }
                };

                if let Err(e) = transport.edit_message(&anchor, &text, &keyboard).await {
                    eprintln!("[refresh] edit failed for chat {}: {e}", anchor.chat_id);
                }
            }
        });

        self.tasks.insert(key, TaskEntry { cancel, handle });
    }

    /// Stop scheduling future firings for `key`. No-op if nothing is armed.
    pub fn cancel(&mut self, key: i64) {
        if let Some(entry) = self.tasks.remove(&key) {
            entry.cancel.cancel();
        }
    }

    /// Cancel every task (used at shutdown).
    pub fn cancel_all(&mut self) {
        for (_, entry) in self.tasks.drain() {
            entry.cancel.cancel();
        }
    }

    /// Whether a live task is registered (and not finished) for `key`.
    pub fn is_active(&self, key: i64) -> bool {
        self.tasks
            .get(&key)
            .is_some_and(|entry| !entry.handle.is_finished())
    }

    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }
}
