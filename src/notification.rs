//! Notification System
//!
//! Feedback events produced by resource controllers, the [`Notifier`]
//! seam they are delivered through, and the history/toast manager the
//! terminal UI renders.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Level of detail for toast messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLevel {
    /// Minimal: status icon + message
    Minimal,
    /// Detailed: status icon + resource + message
    #[default]
    Detailed,
}

impl DetailLevel {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "minimal" => Self::Minimal,
            _ => Self::Detailed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Success,
    Error,
}

impl FeedbackKind {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Error => "✗",
        }
    }
}

/// Operation a feedback event reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Create,
    Update,
    Delete,
    Validate,
}

impl Operation {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Load => "Load",
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Validate => "Validate",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Load => "loaded",
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
            Self::Validate => "validated",
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Validate => "validate",
        }
    }
}

/// Transient success/error message, consumed once by a [`Notifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackEvent {
    pub kind: FeedbackKind,
    pub message: String,
    pub operation: Operation,
    /// Registry key of the resource, e.g. `clinics`
    pub resource: String,
}

impl FeedbackEvent {
    pub fn success(resource: &str, operation: Operation, message: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::Success,
            message: message.into(),
            operation,
            resource: resource.to_string(),
        }
    }

    pub fn error(resource: &str, operation: Operation, message: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::Error,
            message: message.into(),
            operation,
            resource: resource.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == FeedbackKind::Error
    }
}

/// Surfaces feedback to the user. Must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: FeedbackEvent);
}

/// Forwards events to whoever holds the receiver (the UI loop)
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<FeedbackEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FeedbackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: FeedbackEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Feedback receiver dropped, event discarded");
        }
    }
}

/// A single notification in the history
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub event: FeedbackEvent,
    pub created_at: Instant,
    pub timestamp: DateTime<Local>,
}

impl Notification {
    pub fn new(event: FeedbackEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            created_at: Instant::now(),
            timestamp: Local::now(),
        }
    }

    /// Format notification for toast display (short form)
    pub fn toast_message(&self, detail_level: DetailLevel) -> String {
        let icon = self.event.kind.icon();
        match detail_level {
            DetailLevel::Minimal => format!("{} {}", icon, self.event.message),
            DetailLevel::Detailed => format!(
                "{} [{}] {}",
                icon, self.event.resource, self.event.message
            ),
        }
    }

    /// Time-of-day shown in the history panel
    pub fn time_display(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Notification manager
pub struct NotificationManager {
    /// All notifications (recent first)
    pub notifications: VecDeque<Notification>,
    /// Maximum notifications to keep in history
    pub max_history: usize,
    /// Toast display duration
    pub toast_duration: Duration,
    /// Detail level for display
    pub detail_level: DetailLevel,
    last_toast_time: Option<Instant>,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationManager {
    pub fn new() -> Self {
        Self {
            notifications: VecDeque::new(),
            max_history: 50,
            toast_duration: Duration::from_secs(5),
            detail_level: DetailLevel::Detailed,
            last_toast_time: None,
        }
    }

    /// Record an event and show it as the current toast
    pub fn push(&mut self, event: FeedbackEvent) -> Uuid {
        let notification = Notification::new(event);
        let id = notification.id;
        self.notifications.push_front(notification);
        self.last_toast_time = Some(Instant::now());
        self.trim_history();
        id
    }

    /// Get notification by ID
    pub fn get(&self, id: Uuid) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    /// Get the most recent notification while its toast is still visible
    pub fn current_toast(&self) -> Option<&Notification> {
        let last_time = self.last_toast_time?;
        if last_time.elapsed() > self.toast_duration {
            return None;
        }
        self.notifications.front()
    }

    /// Hide the current toast without touching history
    pub fn dismiss_toast(&mut self) {
        self.last_toast_time = None;
    }

    pub fn error_count(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| n.event.is_error())
            .count()
    }

    /// Clear all notifications
    pub fn clear(&mut self) {
        self.notifications.clear();
        self.last_toast_time = None;
    }

    fn trim_history(&mut self) {
        self.notifications.truncate(self.max_history.max(1));
    }

    pub fn has_notifications(&self) -> bool {
        !self.notifications.is_empty()
    }

    /// Get count of recent notifications (last 5 minutes)
    pub fn recent_count(&self) -> usize {
        let cutoff = Duration::from_secs(300);
        self.notifications
            .iter()
            .filter(|n| n.created_at.elapsed() < cutoff)
            .count()
    }
}
