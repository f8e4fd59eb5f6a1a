use async_trait::async_trait;
use strum_macros::Display;
use tracing::info;

/// What happened to the notified user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    Overtaken,
    RankChanged,
}

/// Fire-and-forget push trigger. Implementations own their failure
/// handling; nothing about engine state may depend on delivery.
#[async_trait]
pub trait NotificationTrigger: Send + Sync {
    async fn notify(&self, user_id: &str, kind: NotificationKind, payload: serde_json::Value);
}

/// Logs the notification instead of delivering it. Default wiring until a
/// real push collaborator is attached.
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoggingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationTrigger for LoggingNotifier {
    async fn notify(&self, user_id: &str, kind: NotificationKind, payload: serde_json::Value) {
        info!(user_id, %kind, %payload, "Notification triggered");
    }
}
