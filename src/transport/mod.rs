//! Chat transport abstraction (Telegram today, anything message-shaped later).
//!
//! The bot core only knows how to send, edit, and delete messages against
//! opaque [`MessageRef`] handles; the concrete transport owns the wire
//! protocol and the long-poll receive loop.

pub mod telegram;

use async_trait::async_trait;
use color_eyre::Result;

/// Handle to a delivered message, used for edits and deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// One button of an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// An event received from the transport's receive loop.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A slash command from a user (e.g. /start).
    Command { chat_id: i64, command: String },

    /// An inline keyboard button press on an existing message.
    Callback {
        chat_id: i64,
        message_id: i64,
        data: String,
        callback_query_id: String,
    },
}

/// Trait for sending UI updates through a chat service.
///
/// Implementations must tolerate concurrent callers: live-refresh tasks and
/// the dispatch loop both hold a handle to the same transport.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a new message, returning a handle for later edits/deletion.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: &[Vec<InlineButton>],
    ) -> Result<MessageRef>;

    /// Replace the text and keyboard of an existing message.
    async fn edit_message(
        &self,
        anchor: &MessageRef,
        text: &str,
        keyboard: &[Vec<InlineButton>],
    ) -> Result<()>;

    /// Delete a message. Best-effort; callers treat failure as diagnostic.
    async fn delete_message(&self, anchor: &MessageRef) -> Result<()>;

    /// Acknowledge a callback query so the client dismisses its spinner.
    /// No-op by default; only real chat services need it.
    async fn answer_callback(&self, _callback_query_id: &str) {}
}
