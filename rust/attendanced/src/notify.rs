use serde::Serialize;
use serde_json::json;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Something the UI should put in front of the user: a banner, a toast, the
/// result of a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }
}

pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Writes notices as id-less event lines on the IPC channel.
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&mut self, notice: Notice) {
        let line = json!({
            "event": "notice",
            "level": notice.level,
            "title": notice.title,
            "message": notice.message,
        });
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }
}
