use crate::pipeline::Gateway;
use crate::protocol;
use crate::store::{CommentStore, ModerationState, StoreError};

/// Result of a feedback submission. Callers are free to discard it; a
/// moderation action never fails because a report did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Submitted,
    /// Comment or its post was deleted concurrently.
    SkippedMissing,
    /// `report_spam` on a record a human has not actually confirmed.
    SkippedNotSpam,
    Unreachable,
}

impl Gateway {
    /// Tell the service a comment it let through is in fact spam. Only
    /// valid for records already in the spam state — reporting is a
    /// confirmation, not a classification.
    pub async fn report_spam(&self, store: &dyn CommentStore, comment_id: u64) -> ReportOutcome {
        let record = match store.comment(comment_id) {
            Ok(record) => record,
            Err(StoreError::NotFound) => return ReportOutcome::SkippedMissing,
            Err(e) => {
                log::warn!("comment {comment_id} lookup failed: {e}");
                return ReportOutcome::SkippedMissing;
            }
        };
        if record.state != ModerationState::Spam {
            return ReportOutcome::SkippedNotSpam;
        }
        self.submit(store, record, protocol::SUBMIT_SPAM).await
    }

    /// Tell the service a comment it flagged was a mistake.
    pub async fn report_ham(&self, store: &dyn CommentStore, comment_id: u64) -> ReportOutcome {
        let record = match store.comment(comment_id) {
            Ok(record) => record,
            Err(StoreError::NotFound) => return ReportOutcome::SkippedMissing,
            Err(e) => {
                log::warn!("comment {comment_id} lookup failed: {e}");
                return ReportOutcome::SkippedMissing;
            }
        };
        self.submit(store, record, protocol::SUBMIT_HAM).await
    }

    async fn submit(
        &self,
        store: &dyn CommentStore,
        record: crate::store::CommentRecord,
        operation: &'static str,
    ) -> ReportOutcome {
        let post = match store.content_item(record.post_id) {
            Ok(post) => post,
            Err(_) => return ReportOutcome::SkippedMissing,
        };
        let fields = protocol::report_fields(&self.config.site_url, &record, &post);
        // Fire and forget: the response body is not interpreted.
        match self
            .transport
            .post(&self.api_host, &self.path(operation), &fields)
            .await
        {
            Ok(_) => ReportOutcome::Submitted,
            Err(e) => {
                log::warn!("{operation} for comment {} failed: {e}", record.id);
                ReportOutcome::Unreachable
            }
        }
    }
}
