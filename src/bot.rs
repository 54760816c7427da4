//! The bot event loop: dispatches user actions and drives the health monitor.
//!
//! A single `tokio::select!` loop owns all shared state (sessions, monitor
//! state, notification history), so action dispatch and monitor ticks are
//! serialized. Live-refresh tasks spawned through the scheduler only talk to
//! the transport and never touch this state.

use crate::config::BotConfig;
use crate::history::NotificationHistory;
use crate::logs;
use crate::metrics;
use crate::monitor::HealthMonitor;
use crate::runtime::{RuntimeError, WorkloadRuntime};
use crate::scheduler::{JobScheduler, Producer, RefreshFuture};
use crate::session::{self, Action, ContainerAction, Screen};
use crate::transport::{ChannelEvent, ChatTransport, MessageRef};
use color_eyre::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Per-conversation navigation state.
struct ConversationSession {
    screen: Screen,
    /// The menu message this conversation keeps editing in place.
    anchor: MessageRef,
}

pub struct ControlBot {
    config: BotConfig,
    transport: Arc<dyn ChatTransport>,
    runtime: Arc<dyn WorkloadRuntime>,
    scheduler: JobScheduler,
    monitor: HealthMonitor,
    history: NotificationHistory,
    sessions: HashMap<i64, ConversationSession>,
}

impl ControlBot {
    pub fn new(
        config: BotConfig,
        transport: Arc<dyn ChatTransport>,
        runtime: Arc<dyn WorkloadRuntime>,
    ) -> Self {
        Self {
            config,
            transport,
            runtime,
            scheduler: JobScheduler::new(),
            monitor: HealthMonitor::new(),
            history: NotificationHistory::new(),
            sessions: HashMap::new(),
        }
    }

    /// Run the event loop until `cancel` fires or the event source closes.
    pub async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ChannelEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        // Record current statuses so the first monitor tick stays quiet.
        self.monitor.prime(self.runtime.as_ref()).await;

        let mut monitor_timer =
            tokio::time::interval(Duration::from_secs(self.config.monitor_interval_secs));
        monitor_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        eprintln!("[bot] ready, listening for updates");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    eprintln!("[bot] shutting down");
                    break;
                }

                event = rx.recv() => {
                    match event {
                        Some(event) => {
                            if let Err(e) = self.handle_event(event).await {
                                eprintln!("[bot] error handling event: {e}");
                            }
                        }
                        None => {
                            eprintln!("[bot] event source closed, shutting down");
                            break;
                        }
                    }
                }

                _ = monitor_timer.tick() => {
                    self.monitor
                        .tick(
                            self.runtime.as_ref(),
                            self.transport.as_ref(),
                            &mut self.history,
                            self.config.telegram.alert_chat_id,
                        )
                        .await;
                }
            }
        }

        self.scheduler.cancel_all();
        Ok(())
    }

    /// Handle one inbound event from the transport.
    pub async fn handle_event(&mut self, event: ChannelEvent) -> Result<()> {
        match event {
            ChannelEvent::Command { chat_id, command } => {
                if !self.config.is_chat_allowed(chat_id) {
                    eprintln!("[bot] ignoring command from disallowed chat {chat_id}");
                    return Ok(());
                }
                self.handle_command(chat_id, &command).await
            }
            ChannelEvent::Callback {
                chat_id,
                message_id,
                data,
                callback_query_id,
            } => {
                // Always acknowledge to dismiss the client's spinner.
                self.transport.answer_callback(&callback_query_id).await;
                if !self.config.is_chat_allowed(chat_id) {
                    return Ok(());
                }
                let Some(action) = session::parse_action(&data) else {
                    eprintln!("[bot] ignoring unknown callback data: {data}");
                    return Ok(());
                };
                let anchor = MessageRef {
                    chat_id,
                    message_id,
                };
                self.dispatch(chat_id, anchor, action).await
            }
        }
    }

    async fn handle_command(&mut self, chat_id: i64, command: &str) -> Result<()> {
        match command {
            "start" => {
                let (text, keyboard) = session::main_menu();
                let anchor = self.transport.send_message(chat_id, &text, &keyboard).await?;
                self.scheduler.cancel(chat_id);
                self.sessions.insert(
                    chat_id,
                    ConversationSession {
                        screen: Screen::MainMenu,
                        anchor,
                    },
                );
                Ok(())
            }
            _ => {
                self.transport
                    .send_message(chat_id, "Отправьте /start, чтобы открыть меню.", &[])
                    .await?;
                Ok(())
            }
        }
    }

    /// Apply one user action: compute the next screen, render it, and arm or
    /// tear down the conversation's live-refresh task.
    async fn dispatch(&mut self, chat_id: i64, anchor: MessageRef, action: Action) -> Result<()> {
        // Any navigation leaves the current screen, so the live view (if any)
        // is torn down first; arming below re-creates it when needed.
        self.scheduler.cancel(chat_id);

        let current = self
            .sessions
            .get(&chat_id)
            .map(|s| s.screen.clone())
            .unwrap_or(Screen::MainMenu);

        let next = match action {
            Action::OpenMetrics => {
                self.arm_metrics(chat_id, anchor);
                Screen::MetricsView
            }

            Action::OpenContainers => {
                self.render_container_list(&anchor).await?;
                Screen::ContainerList
            }

            Action::SelectContainer(name) => {
                self.render_detail(&anchor, &name).await?;
                Screen::ContainerDetail(name)
            }

            Action::RequestAction(action, name) => {
                let (text, keyboard) = session::confirm_prompt(action, &name);
                self.transport.edit_message(&anchor, &text, &keyboard).await?;
                Screen::ConfirmAction(action, name)
            }

            Action::Confirm(action, name) => {
                let notice = self.apply_container_action(action, &name).await;
                // One-shot outcome notice as its own message; the anchor
                // goes back to showing the container detail.
                if let Err(e) = self.transport.send_message(chat_id, &notice, &[]).await {
                    eprintln!("[bot] failed to send action notice: {e}");
                }
                self.render_detail(&anchor, &name).await?;
                Screen::ContainerDetail(name)
            }

            Action::Decline(name) => {
                self.render_detail(&anchor, &name).await?;
                Screen::ContainerDetail(name)
            }

            Action::OpenLogs => {
                self.render_log_sessions(&anchor).await?;
                Screen::LogSessionList
            }

            Action::SelectLogSession(name) => {
                self.arm_logs(chat_id, anchor, name.clone());
                Screen::LogView(name)
            }

            Action::OpenHistory => {
                let (text, keyboard) = session::history_view(&self.history);
                self.transport.edit_message(&anchor, &text, &keyboard).await?;
                Screen::HistoryView
            }

            Action::ClearHistory => {
                let failures = self.history.clear(self.transport.as_ref()).await;
                let (text, keyboard) = session::history_cleared(failures);
                self.transport.edit_message(&anchor, &text, &keyboard).await?;
                Screen::HistoryView
            }

            Action::OpenHelp => {
                let (text, keyboard) = session::help_view();
                self.transport.edit_message(&anchor, &text, &keyboard).await?;
                Screen::HelpView
            }

            Action::Back => {
                let target = current.back();
                match &target {
                    Screen::ContainerList => self.render_container_list(&anchor).await?,
                    Screen::ContainerDetail(name) => {
                        let name = name.clone();
                        self.render_detail(&anchor, &name).await?;
                    }
                    _ => {
                        let (text, keyboard) = session::main_menu();
                        self.transport.edit_message(&anchor, &text, &keyboard).await?;
                    }
                }
                target
            }
        };

        self.sessions.insert(
            chat_id,
            ConversationSession {
                screen: next,
                anchor,
            },
        );
        Ok(())
    }

    fn arm_metrics(&mut self, chat_id: i64, anchor: MessageRef) {
        let producer: Producer = Arc::new(|| -> RefreshFuture {
            Box::pin(async { Ok(metrics::snapshot().await) })
        });
        self.scheduler.arm(
            chat_id,
            Duration::from_secs(self.config.metrics_refresh_secs),
            Duration::ZERO,
            anchor,
            session::back_keyboard(),
            producer,
            self.transport.clone(),
        );
    }

    fn arm_logs(&mut self, chat_id: i64, anchor: MessageRef, session_name: String) {
        let lines = self.config.log_lines;
        let producer: Producer = Arc::new(move || -> RefreshFuture {
            let session_name = session_name.clone();
            Box::pin(async move { Ok(logs::tail(&session_name, lines).await) })
        });
        self.scheduler.arm(
            chat_id,
            Duration::from_secs(self.config.logs_refresh_secs),
            Duration::ZERO,
            anchor,
            session::back_keyboard(),
            producer,
            self.transport.clone(),
        );
    }

    async fn render_container_list(&self, anchor: &MessageRef) -> Result<()> {
        let (text, keyboard) = match self.runtime.list(true).await {
            Ok(workloads) => session::container_list(&workloads),
            Err(e) => (format!("Ошибка: {e}"), session::back_keyboard()),
        };
        self.transport.edit_message(anchor, &text, &keyboard).await
    }

    async fn render_detail(&self, anchor: &MessageRef, name: &str) -> Result<()> {
        let (text, keyboard) = match self.runtime.get(name).await {
            Ok(detail) => session::container_detail(&detail),
            Err(RuntimeError::NotFound) => session::container_not_found(name),
            Err(e) => (format!("Ошибка: {e}"), session::back_keyboard()),
        };
        self.transport.edit_message(anchor, &text, &keyboard).await
    }

    async fn render_log_sessions(&self, anchor: &MessageRef) -> Result<()> {
        let (text, keyboard) = match logs::list_sessions().await {
            Ok(names) => session::log_session_list(&names),
            Err(e) => (format!("Ошибка: {e}"), session::back_keyboard()),
        };
        self.transport.edit_message(anchor, &text, &keyboard).await
    }

    async fn apply_container_action(&self, action: ContainerAction, name: &str) -> String {
        let result = match action {
            ContainerAction::Start => self.runtime.start(name).await,
            ContainerAction::Stop => self.runtime.stop(name).await,
            ContainerAction::Restart => self.runtime.restart(name).await,
        };
        match result {
            Ok(()) => format!("Контейнер {name} успешно {}.", action.past_tense()),
            Err(RuntimeError::NotFound) => format!("Контейнер {name} не найден."),
            Err(e) => format!("Ошибка: {e}"),
        }
    }

    // --- accessors used by the outer wiring and integration tests ---

    /// Current screen of a conversation, if it has interacted before.
    pub fn screen(&self, chat_id: i64) -> Option<&Screen> {
        self.sessions.get(&chat_id).map(|s| &s.screen)
    }

    /// Whether a live-refresh task is armed for this conversation.
    pub fn has_live_refresh(&self, chat_id: i64) -> bool {
        self.scheduler.is_active(chat_id)
    }

    pub fn history(&self) -> &NotificationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut NotificationHistory {
        &mut self.history
    }
}
