/// Notifications for collaborators hooked into the gateway (dashboards,
/// notifiers). Emitting is fire-and-forget; sinks must not block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    SpamCaught { comment_id: u64, post_id: u64 },
    SubmissionDiscarded { comment_id: u64, post_id: u64 },
    ServiceUnreachable { operation: &'static str },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: GatewayEvent);
}

/// Default sink: one structured log line per event.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::SpamCaught {
                comment_id,
                post_id,
            } => log::info!("spam caught: comment {comment_id} on post {post_id}"),
            GatewayEvent::SubmissionDiscarded {
                comment_id,
                post_id,
            } => log::info!(
                "spam submission {comment_id} on stale post {post_id} discarded outright"
            ),
            GatewayEvent::ServiceUnreachable { operation } => {
                log::warn!("classification service unreachable during {operation}")
            }
        }
    }
}
