use async_trait::async_trait;

use crate::events::{Listener, ProjectEvent};

/// Writes one logfmt line per event through the `log` crate.
///
/// ```rust,ignore
/// use gatehouse::register_event_listeners;
/// use gatehouse::events::listeners::LoggingListener;
///
/// register_event_listeners(|registry| {
///     registry.listen(LoggingListener::with_level(log::Level::Debug));
/// });
/// ```
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    pub fn new() -> Self {
        Self::with_level(log::Level::Info)
    }

    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }

    fn format(event: &ProjectEvent) -> String {
        let project = event
            .project_id()
            .map_or_else(|| "-".to_owned(), |id| id.to_string());
        format!(
            "event={}, project_id={project}, at={}, detail=\"{event:?}\"",
            event.name(),
            event.timestamp().to_rfc3339()
        )
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for LoggingListener {
    async fn handle(&self, event: &ProjectEvent) {
        log::log!(target: "gatehouse::events", self.level, "{}", Self::format(event));
    }
}
