//! Navigation state machine: screens, action tokens, and screen renderers.
//!
//! Callback data is a closed vocabulary of `:`-delimited structured tokens,
//! parsed once at the transport boundary. Container names never need to be
//! re-split out of a flat string, so names with underscores are safe.

use crate::history::NotificationHistory;
use crate::runtime::{Workload, WorkloadDetail, WorkloadStatus};
use crate::transport::InlineButton;
use std::fmt;

/// The screen a conversation is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    MainMenu,
    MetricsView,
    ContainerList,
    ContainerDetail(String),
    ConfirmAction(ContainerAction, String),
    LogSessionList,
    LogView(String),
    HistoryView,
    HelpView,
}

impl Screen {
    /// Context-sensitive BACK target.
    ///
    /// Detail goes back to the list, a confirmation goes back to its
    /// container's detail, every top-level view goes back to the main menu.
    pub fn back(&self) -> Screen {
        match self {
            Screen::ContainerDetail(_) => Screen::ContainerList,
            Screen::ConfirmAction(_, name) => Screen::ContainerDetail(name.clone()),
            _ => Screen::MainMenu,
        }
    }
}

/// A lifecycle operation on a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerAction {
    Start,
    Stop,
    Restart,
}

impl ContainerAction {
    fn parse(verb: &str) -> Option<Self> {
        match verb {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "restart" => Some(Self::Restart),
            _ => None,
        }
    }

    /// Infinitive for the confirmation prompt ("вы уверены, что хотите ...").
    pub fn infinitive(&self) -> &'static str {
        match self {
            Self::Start => "запустить",
            Self::Stop => "остановить",
            Self::Restart => "перезапустить",
        }
    }

    /// Past tense for the outcome notice ("успешно ...").
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Start => "запущен",
            Self::Stop => "остановлен",
            Self::Restart => "перезапущен",
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Restart => write!(f, "restart"),
        }
    }
}

/// A parsed user action from an inline keyboard press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    OpenMetrics,
    OpenContainers,
    OpenLogs,
    OpenHistory,
    OpenHelp,
    SelectContainer(String),
    RequestAction(ContainerAction, String),
    Confirm(ContainerAction, String),
    Decline(String),
    SelectLogSession(String),
    ClearHistory,
    Back,
}

/// Parse callback data into an [`Action`]. Unknown tokens return `None`
/// and are dropped by the dispatcher.
pub fn parse_action(data: &str) -> Option<Action> {
    match data {
        "metrics" => return Some(Action::OpenMetrics),
        "containers" => return Some(Action::OpenContainers),
        "logs" => return Some(Action::OpenLogs),
        "history" => return Some(Action::OpenHistory),
        "help" => return Some(Action::OpenHelp),
        "clear" => return Some(Action::ClearHistory),
        "back" => return Some(Action::Back),
        _ => {}
    }

    if let Some(name) = data.strip_prefix("ctr:") {
        return Some(Action::SelectContainer(name.to_owned()));
    }
    if let Some(name) = data.strip_prefix("log:") {
        return Some(Action::SelectLogSession(name.to_owned()));
    }
    if let Some(name) = data.strip_prefix("no:") {
        return Some(Action::Decline(name.to_owned()));
    }
    if let Some(rest) = data.strip_prefix("act:") {
        let (verb, name) = rest.split_once(':')?;
        return Some(Action::RequestAction(ContainerAction::parse(verb)?, name.to_owned()));
    }
    if let Some(rest) = data.strip_prefix("ok:") {
        let (verb, name) = rest.split_once(':')?;
        return Some(Action::Confirm(ContainerAction::parse(verb)?, name.to_owned()));
    }

    None
}

// ---------------------------------------------------------------------------
// Renderers — each returns the message text and its inline keyboard
// ---------------------------------------------------------------------------

pub type Render = (String, Vec<Vec<InlineButton>>);

/// The single "⬅ Назад" row appended to most screens.
pub fn back_keyboard() -> Vec<Vec<InlineButton>> {
    vec![vec![InlineButton::new("⬅ Назад", "back")]]
}

pub fn main_menu() -> Render {
    let keyboard = vec![
        vec![InlineButton::new("📊 Метрики", "metrics")],
        vec![InlineButton::new("📦 Статус контейнеров", "containers")],
        vec![InlineButton::new("🔍 Логи контейнера", "logs")],
        vec![InlineButton::new("🔎 История уведомлений", "history")],
        vec![InlineButton::new("❓ Помощь", "help")],
    ];
    ("Главное меню".to_owned(), keyboard)
}

pub fn help_view() -> Render {
    let text = "Помощь:\n\
                1. Метрики - показывает загрузку CPU и памяти.\n\
                2. Статус контейнеров - текущий статус ваших контейнеров.\n\
                3. Логи контейнера - выберите screen-сессию для просмотра последних строк логов.\n\
                4. История уведомлений - последние уведомления о состоянии контейнеров."
        .to_owned();
    (text, back_keyboard())
}

pub fn container_list(workloads: &[Workload]) -> Render {
    let mut keyboard: Vec<Vec<InlineButton>> = workloads
        .iter()
        .map(|w| {
            let dot = if w.status.is_running() { "🟢" } else { "🔴" };
            vec![InlineButton::new(
                format!("{dot} {}", w.name),
                format!("ctr:{}", w.name),
            )]
        })
        .collect();
    keyboard.extend(back_keyboard());
    ("Выберите контейнер для управления:".to_owned(), keyboard)
}

pub fn container_detail(detail: &WorkloadDetail) -> Render {
    let text = format!(
        "Контейнер {} ({})\n\
         ID: {}\n\
         Время запуска: {}\n\
         Используемые порты: {}",
        detail.name, detail.status, detail.id, detail.started_at, detail.ports
    );
    let keyboard = vec![
        vec![InlineButton::new("⏯ Запустить", format!("act:start:{}", detail.name))],
        vec![InlineButton::new("⏹ Остановить", format!("act:stop:{}", detail.name))],
        vec![InlineButton::new("🔄 Перезапустить", format!("act:restart:{}", detail.name))],
        vec![InlineButton::new("⬅ Назад", "back")],
    ];
    (text, keyboard)
}

pub fn container_not_found(name: &str) -> Render {
    (format!("Контейнер {name} не найден."), back_keyboard())
}

pub fn confirm_prompt(action: ContainerAction, name: &str) -> Render {
    let text = format!(
        "Вы уверены, что хотите {} контейнер {name}?",
        action.infinitive()
    );
    let keyboard = vec![
        vec![InlineButton::new("Да", format!("ok:{action}:{name}"))],
        vec![InlineButton::new("Нет", format!("no:{name}"))],
        vec![InlineButton::new("⬅ Назад", "back")],
    ];
    (text, keyboard)
}

pub fn log_session_list(sessions: &[String]) -> Render {
    let mut keyboard: Vec<Vec<InlineButton>> = sessions
        .iter()
        .map(|name| vec![InlineButton::new(name.clone(), format!("log:{name}"))])
        .collect();
    keyboard.extend(back_keyboard());
    (
        "Выберите screen-сессию для просмотра логов:".to_owned(),
        keyboard,
    )
}

pub fn history_view(history: &NotificationHistory) -> Render {
    let entries = history.snapshot();
    let body = if entries.is_empty() {
        "История пуста.".to_owned()
    } else {
        entries.join("\n")
    };
    let keyboard = vec![
        vec![InlineButton::new("🗑️ Очистить историю", "clear")],
        vec![InlineButton::new("⬅ Назад", "back")],
    ];
    (format!("История уведомлений:\n{body}"), keyboard)
}

pub fn history_cleared(delete_failures: usize) -> Render {
    let text = if delete_failures == 0 {
        "История уведомлений очищена.".to_owned()
    } else {
        format!(
            "История уведомлений очищена.\nНе удалось удалить сообщений: {delete_failures}."
        )
    };
    (text, back_keyboard())
}

/// Health alert line, also recorded in the notification history.
pub fn alert_text(name: &str, status: &WorkloadStatus) -> String {
    format!("❗ Контейнер {name} в состоянии {status}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_top_level_tokens() {
        assert_eq!(parse_action("metrics"), Some(Action::OpenMetrics));
        assert_eq!(parse_action("containers"), Some(Action::OpenContainers));
        assert_eq!(parse_action("logs"), Some(Action::OpenLogs));
        assert_eq!(parse_action("history"), Some(Action::OpenHistory));
        assert_eq!(parse_action("help"), Some(Action::OpenHelp));
        assert_eq!(parse_action("clear"), Some(Action::ClearHistory));
        assert_eq!(parse_action("back"), Some(Action::Back));
    }

    #[test]
    fn parse_structured_tokens() {
        assert_eq!(
            parse_action("ctr:web"),
            Some(Action::SelectContainer("web".into()))
        );
        assert_eq!(
            parse_action("act:stop:web"),
            Some(Action::RequestAction(ContainerAction::Stop, "web".into()))
        );
        assert_eq!(
            parse_action("ok:restart:web"),
            Some(Action::Confirm(ContainerAction::Restart, "web".into()))
        );
        assert_eq!(parse_action("no:web"), Some(Action::Decline("web".into())));
        assert_eq!(
            parse_action("log:builds"),
            Some(Action::SelectLogSession("builds".into()))
        );
    }

    #[test]
    fn underscored_names_survive_parsing() {
        // The flat `container_<name>` scheme this replaces truncated these.
        assert_eq!(
            parse_action("ctr:my_db_replica"),
            Some(Action::SelectContainer("my_db_replica".into()))
        );
        assert_eq!(
            parse_action("ok:stop:my_db_replica"),
            Some(Action::Confirm(ContainerAction::Stop, "my_db_replica".into()))
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_action("act:explode:web"), None);
        assert_eq!(parse_action("act:stop"), None);
        assert_eq!(parse_action("bogus"), None);
        assert_eq!(parse_action(""), None);
    }

    #[test]
    fn back_from_detail_goes_to_list() {
        assert_eq!(
            Screen::ContainerDetail("web".into()).back(),
            Screen::ContainerList
        );
    }

    #[test]
    fn back_from_confirmation_goes_to_detail() {
        assert_eq!(
            Screen::ConfirmAction(ContainerAction::Stop, "web".into()).back(),
            Screen::ContainerDetail("web".into())
        );
    }

    #[test]
    fn back_from_top_level_views_goes_to_menu() {
        for screen in [
            Screen::MetricsView,
            Screen::ContainerList,
            Screen::LogSessionList,
            Screen::LogView("s1".into()),
            Screen::HistoryView,
            Screen::HelpView,
            Screen::MainMenu,
        ] {
            assert_eq!(screen.back(), Screen::MainMenu);
        }
    }

    #[test]
    fn container_list_marks_status_with_dots() {
        let workloads = vec![
            Workload {
                name: "up".into(),
                status: WorkloadStatus::Running,
            },
            Workload {
                name: "down".into(),
                status: WorkloadStatus::Exited,
            },
        ];
        let (_, keyboard) = container_list(&workloads);
        assert_eq!(keyboard.len(), 3); // two containers + back row
        assert!(keyboard[0][0].text.starts_with("🟢"));
        assert!(keyboard[1][0].text.starts_with("🔴"));
        assert_eq!(keyboard[0][0].callback_data, "ctr:up");
    }

    #[test]
    fn empty_history_renders_placeholder() {
        let history = NotificationHistory::new();
        let (text, _) = history_view(&history);
        assert!(text.contains("История пуста."));
    }
}
