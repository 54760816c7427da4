//! Bounded notification ledger with FIFO eviction.
//!
//! Every health alert is appended here with a fixed UTC+3 timestamp. The
//! ledger also remembers the Telegram messages that carried each alert so
//! that clearing the history can delete them from the chat.

use crate::transport::{ChatTransport, MessageRef};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::VecDeque;

/// Maximum number of ledger entries kept; inserting beyond evicts the oldest.
pub const HISTORY_CAPACITY: usize = 50;

/// Ledger timestamps are rendered in this fixed offset, not host-local time.
const LEDGER_OFFSET_SECS: i32 = 3 * 3600;

#[derive(Default)]
pub struct NotificationHistory {
    entries: VecDeque<String>,
    delivered: Vec<MessageRef>,
}

impl NotificationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamped entry, evicting the oldest when over capacity.
    pub fn record(&mut self, text: &str) {
        self.record_at(Utc::now(), text);
    }

    fn record_at(&mut self, now: DateTime<Utc>, text: &str) {
        self.entries.push_back(format_entry(now, text));
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    /// Remember a delivered alert message so `clear` can delete it later.
    pub fn push_delivered(&mut self, msg: MessageRef) {
        self.delivered.push(msg);
    }

    /// Ledger contents in chronological order.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    /// Empty the ledger and best-effort delete every delivered alert message.
    ///
    /// A failed deletion is logged and does not stop the remaining ones.
    /// Returns the number of deletions that failed.
    pub async fn clear(&mut self, transport: &dyn ChatTransport) -> usize {
        let mut failures = 0;
        for msg in self.delivered.drain(..) {
            if let Err(e) = transport.delete_message(&msg).await {
                eprintln!(
                    "[history] failed to delete alert message {} in chat {}: {e}",
                    msg.message_id, msg.chat_id
                );
                failures += 1;
            }
        }
        self.entries.clear();
        failures
    }
}

fn format_entry(now: DateTime<Utc>, text: &str) -> String {
    let offset = FixedOffset::east_opt(LEDGER_OFFSET_SECS).expect("valid ledger offset");
    let local = now.with_timezone(&offset);
    format!("[{}] {text}", local.format("%Y-%m-%d %H:%M:%S"))
}
