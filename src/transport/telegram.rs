//! Telegram Bot API transport using raw reqwest (no framework).
//!
//! Long-polls `getUpdates` for commands and inline keyboard presses, and
//! implements [`ChatTransport`] over `sendMessage` / `editMessageText` /
//! `deleteMessage`.

use super::{ChannelEvent, ChatTransport, InlineButton, MessageRef};
use async_trait::async_trait;
use color_eyre::eyre::Result;
use serde::Deserialize;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

pub struct TelegramTransport {
    bot_token: String,
    allowed_user_ids: Vec<i64>,
    client: reqwest::Client,
}

// --- Telegram API response types ---

#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
    callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TgCallbackQuery {
    id: String,
    from: TgUser,
    message: Option<TgMessage>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
}

impl TelegramTransport {
    pub fn new(bot_token: String, allowed_user_ids: Vec<i64>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("failed to build reqwest client");

        Self {
            bot_token,
            allowed_user_ids,
            client,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    fn is_user_allowed(&self, user_id: i64) -> bool {
        self.allowed_user_ids.is_empty() || self.allowed_user_ids.contains(&user_id)
    }

    /// Long-poll for updates from Telegram.
    async fn get_updates(&self, offset: i64) -> Result<Vec<TgUpdate>> {
        let resp = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", "30".to_string()),
            ])
            .send()
            .await?;

        let body: TgResponse<Vec<TgUpdate>> = resp.json().await?;

        if !body.ok {
            let desc = body.description.unwrap_or_default();
            color_eyre::eyre::bail!("Telegram API error: {desc}");
        }

        Ok(body.result.unwrap_or_default())
    }

    /// Run the receive loop until `cancel` fires, sending events to `tx`.
    pub async fn run(&self, tx: Sender<ChannelEvent>, cancel: CancellationToken) {
        let mut offset: i64 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let updates = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.get_updates(offset) => {
                    match result {
                        Ok(updates) => updates,
                        Err(e) => {
                            eprintln!("[telegram] poll error: {e}");
                            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                            continue;
                        }
                    }
                }
            };

            for update in updates {
                offset = update.update_id + 1;

                if let Some(cq) = update.callback_query {
                    if !self.is_user_allowed(cq.from.id) {
                        eprintln!(
                            "[telegram] ignoring callback from unauthorized user {}",
                            cq.from.id
                        );
                        continue;
                    }
                    let Some(msg) = cq.message else {
                        continue;
                    };
                    if let Some(data) = cq.data {
                        let event = ChannelEvent::Callback {
                            chat_id: msg.chat.id,
                            message_id: msg.message_id,
                            data,
                            callback_query_id: cq.id,
                        };
                        if tx.send(event).await.is_err() {
                            // Receiver dropped — shut down.
                            return;
                        }
                    }
                    continue;
                }

                let Some(msg) = update.message else {
                    continue;
                };
                if let Some(user) = &msg.from
                    && !self.is_user_allowed(user.id)
                {
                    eprintln!(
                        "[telegram] ignoring message from unauthorized user {}",
                        user.id
                    );
                    continue;
                }
                if let Some(event) = parse_command(&msg)
                    && tx.send(event).await.is_err()
                {
                    return;
                }
            }
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(payload)
            .send()
            .await?;

        let body: TgResponse<T> = resp.json().await?;
        if !body.ok {
            let desc = body.description.unwrap_or_default();
            color_eyre::eyre::bail!("{method} failed: {desc}");
        }
        body.result
            .ok_or_else(|| color_eyre::eyre::eyre!("{method} returned no result"))
    }
}

/// Extract a `/command` event from an inbound message; plain text is ignored.
fn parse_command(msg: &TgMessage) -> Option<ChannelEvent> {
    let text = msg.text.as_deref()?.trim();
    let rest = text.strip_prefix('/')?;
    let command = rest.split_whitespace().next().unwrap_or(rest);
    // Strip @botname suffix from commands like "/start@mybot".
    let command = command.split('@').next().unwrap_or(command);
    Some(ChannelEvent::Command {
        chat_id: msg.chat.id,
        command: command.to_owned(),
    })
}

fn keyboard_json(keyboard: &[Vec<InlineButton>]) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|btn| {
                    serde_json::json!({
                        "text": btn.text,
                        "callback_data": btn.callback_data,
                    })
                })
                .collect()
        })
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: &[Vec<InlineButton>],
    ) -> Result<MessageRef> {
        let mut payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if !keyboard.is_empty() {
            payload["reply_markup"] = keyboard_json(keyboard);
        }

        let sent: TgMessage = self.call("sendMessage", &payload).await?;
        Ok(MessageRef {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }

    async fn edit_message(
        &self,
        anchor: &MessageRef,
        text: &str,
        keyboard: &[Vec<InlineButton>],
    ) -> Result<()> {
        let mut payload = serde_json::json!({
            "chat_id": anchor.chat_id,
            "message_id": anchor.message_id,
            "text": text,
        });
        if !keyboard.is_empty() {
            payload["reply_markup"] = keyboard_json(keyboard);
        }

        match self
            .call::<serde_json::Value>("editMessageText", &payload)
            .await
        {
            Ok(_) => Ok(()),
            // A live view that produced identical content is not an error.
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delete_message(&self, anchor: &MessageRef) -> Result<()> {
        let payload = serde_json::json!({
            "chat_id": anchor.chat_id,
            "message_id": anchor.message_id,
        });
        self.call::<serde_json::Value>("deleteMessage", &payload)
            .await
            .map(|_| ())
    }

    async fn answer_callback(&self, callback_query_id: &str) {
        let payload = serde_json::json!({
            "callback_query_id": callback_query_id,
        });
        if let Err(e) = self
            .call::<serde_json::Value>("answerCallbackQuery", &payload)
            .await
        {
            eprintln!("[telegram] answerCallbackQuery failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: Option<&str>) -> TgMessage {
        TgMessage {
            message_id: 1,
            chat: TgChat { id: 100 },
            from: Some(TgUser { id: 1 }),
            text: text.map(|t| t.to_owned()),
        }
    }

    #[test]
    fn parse_start_command() {
        let event = parse_command(&msg(Some("/start"))).unwrap();
        match event {
            ChannelEvent::Command { chat_id, command } => {
                assert_eq!(chat_id, 100);
                assert_eq!(command, "start");
            }
            _ => panic!("expected Command"),
        }
    }

    #[test]
    fn parse_command_with_bot_suffix() {
        let event = parse_command(&msg(Some("/start@corral_bot"))).unwrap();
        match event {
            ChannelEvent::Command { command, .. } => assert_eq!(command, "start"),
            _ => panic!("expected Command"),
        }
    }

    #[test]
    fn plain_text_is_ignored() {
        assert!(parse_command(&msg(Some("hello"))).is_none());
        assert!(parse_command(&msg(None)).is_none());
    }

    #[test]
    fn keyboard_json_shape() {
        let kb = vec![vec![InlineButton::new("Да", "ok:stop:web")]];
        let json = keyboard_json(&kb);
        assert_eq!(json["inline_keyboard"][0][0]["text"], "Да");
        assert_eq!(json["inline_keyboard"][0][0]["callback_data"], "ok:stop:web");
    }
}
