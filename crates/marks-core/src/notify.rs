//! Transient user notifications
//!
//! A small queue of toasts. Each one expires after a fixed lifetime, only
//! the most recent few are visible, and a message already on screen is
//! not posted twice.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::Config;

/// Default notification lifetime
pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

/// Default number of visible notifications
pub const DEFAULT_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    #[serde(skip)]
    pub created_at: Instant,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    limit: usize,
    next_id: u64,
    queue: VecDeque<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_LIMIT)
    }
}

impl Notifier {
    pub fn new(ttl: Duration, limit: usize) -> Self {
        Self {
            ttl,
            limit,
            next_id: 1,
            queue: VecDeque::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.toast_ttl(), config.toast_limit)
    }

    /// Post a notification; returns its id, or `None` when the same message
    /// is still live
    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) -> Option<u64> {
        self.notify_at(kind, message, Instant::now())
    }

    pub fn notify_at(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        now: Instant,
    ) -> Option<u64> {
        let message = message.into();
        self.expire(now);

        if self.queue.iter().any(|n| n.message == message) {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.queue.push_back(Notification {
            id,
            kind,
            message,
            created_at: now,
        });

        // Older entries can never become visible again
        while self.queue.len() > self.limit {
            self.queue.pop_front();
        }
        Some(id)
    }

    pub fn success(&mut self, message: impl Into<String>) -> Option<u64> {
        self.notify(NotificationKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> Option<u64> {
        self.notify(NotificationKind::Error, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> Option<u64> {
        self.notify(NotificationKind::Warning, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> Option<u64> {
        self.notify(NotificationKind::Info, message)
    }

    /// Remove a notification before it expires
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.queue.len();
        self.queue.retain(|n| n.id != id);
        self.queue.len() != before
    }

    /// Drop everything older than the lifetime
    pub fn expire(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.queue
            .retain(|n| now.saturating_duration_since(n.created_at) < ttl);
    }

    /// Live notifications, oldest first
    pub fn visible(&mut self) -> Vec<Notification> {
        self.visible_at(Instant::now())
    }

    pub fn visible_at(&mut self, now: Instant) -> Vec<Notification> {
        self.expire(now);
        self.queue.iter().cloned().collect()
    }

    /// Take every queued notification regardless of age
    pub fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(notifications: &[Notification]) -> Vec<&str> {
        notifications.iter().map(|n| n.message.as_str()).collect()
    }

    #[test]
    fn test_duplicate_message_suppressed_while_visible() {
        let mut notifier = Notifier::default();
        let now = Instant::now();

        assert!(notifier.notify_at(NotificationKind::Success, "Saved", now).is_some());
        assert!(notifier.notify_at(NotificationKind::Success, "Saved", now).is_none());
        assert_eq!(notifier.visible_at(now).len(), 1);
    }

    #[test]
    fn test_duplicate_allowed_after_expiry() {
        let mut notifier = Notifier::default();
        let start = Instant::now();

        notifier.notify_at(NotificationKind::Info, "Saved", start);
        let later = start + DEFAULT_TTL;
        assert!(notifier.notify_at(NotificationKind::Info, "Saved", later).is_some());
        assert_eq!(notifier.visible_at(later).len(), 1);
    }

    #[test]
    fn test_expiry() {
        let mut notifier = Notifier::new(Duration::from_millis(100), 3);
        let start = Instant::now();

        notifier.notify_at(NotificationKind::Error, "Boom", start);
        assert_eq!(notifier.visible_at(start + Duration::from_millis(99)).len(), 1);
        assert!(notifier.visible_at(start + Duration::from_millis(100)).is_empty());
    }

    #[test]
    fn test_only_most_recent_are_visible() {
        let mut notifier = Notifier::default();
        let now = Instant::now();

        for message in ["one", "two", "three", "four"] {
            notifier.notify_at(NotificationKind::Info, message, now);
        }

        assert_eq!(
            messages(&notifier.visible_at(now)),
            vec!["two", "three", "four"]
        );
    }

    #[test]
    fn test_dismiss() {
        let mut notifier = Notifier::default();
        let id = notifier.warning("Careful").unwrap();

        assert!(notifier.dismiss(id));
        assert!(!notifier.dismiss(id));
        assert!(notifier.visible().is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            toast_ttl_ms: 10,
            toast_limit: 1,
            ..Config::default()
        };
        let mut notifier = Notifier::from_config(&config);
        let now = Instant::now();

        notifier.notify_at(NotificationKind::Info, "a", now);
        notifier.notify_at(NotificationKind::Info, "b", now);
        assert_eq!(messages(&notifier.visible_at(now)), vec!["b"]);
        assert!(notifier.visible_at(now + Duration::from_millis(10)).is_empty());
    }

    #[test]
    fn test_drain_empties_queue() {
        let mut notifier = Notifier::default();
        notifier.success("Created");
        notifier.error("Failed");

        let drained = notifier.drain();
        assert_eq!(drained[0].kind, NotificationKind::Success);
        assert_eq!(drained.len(), 2);
        assert!(notifier.drain().is_empty());
    }
}
