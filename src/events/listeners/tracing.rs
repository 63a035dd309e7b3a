use async_trait::async_trait;

use crate::events::{Listener, ProjectEvent};

/// Emits every event as a `tracing` event. Requires the `tracing` feature.
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &ProjectEvent) {
        tracing::info!(
            target: "gatehouse::events",
            event_name = event.name(),
            project_id = event.project_id(),
            ?event,
            "project event"
        );
    }
}
