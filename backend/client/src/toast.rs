use std::{fmt, time::Duration};

use shared::now_ms;
use uuid::Uuid;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastKind {
    Success,
    Error,
    #[default]
    Info,
    Warning,
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: String,
    pub message: String,
    pub kind: ToastKind,
    pub duration: Duration,
}

/// Ordered notifications, oldest first.
#[derive(Debug, Default)]
pub struct Toasts {
    queue: Vec<Toast>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an info toast with the default duration.
    pub fn info(&mut self, message: impl Into<String>) -> String {
        self.show(message, ToastKind::Info, DEFAULT_DURATION)
    }

    pub fn success(&mut self, message: impl Into<String>) -> String {
        self.show(message, ToastKind::Success, DEFAULT_DURATION)
    }

    pub fn error(&mut self, message: impl Into<String>) -> String {
        self.show(message, ToastKind::Error, DEFAULT_DURATION)
    }

    /// Returns the id, `toast-<ms>-<random>`.
    pub fn show(&mut self, message: impl Into<String>, kind: ToastKind, duration: Duration) -> String {
        let random = Uuid::new_v4().simple().to_string();
        let id = format!("toast-{}-{}", now_ms(), &random[..9]);

        self.queue.push(Toast {
            id: id.clone(),
            message: message.into(),
            kind,
            duration,
        });

        id
    }

    pub fn hide(&mut self, id: &str) {
        self.queue.retain(|toast| toast.id != id);
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Empties the queue, handing back everything shown so far.
    pub fn drain(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.queue)
    }
}
