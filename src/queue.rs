use crate::pipeline::Gateway;
use crate::protocol::{OriginContext, Verdict};
use crate::store::{CommentStore, ModerationState, StoreError};

/// Tally of one moderation-queue re-check.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecheckSummary {
    pub checked: usize,
    pub flagged: usize,
    pub failed: usize,
}

impl Gateway {
    /// Re-classify every pending comment, sequentially, transitioning
    /// confirmed spam directly into the spam queue. No discard policy
    /// and no counter here — a batch re-check never drops submissions.
    /// Individual failures are logged and skipped; only a failure to
    /// list the backlog aborts.
    pub async fn recheck_pending(
        &self,
        store: &dyn CommentStore,
    ) -> Result<RecheckSummary, StoreError> {
        let backlog = store.pending()?;
        let mut summary = RecheckSummary::default();

        for record in backlog {
            summary.checked += 1;
            let post = store.content_item(record.post_id).ok();
            let origin = OriginContext::from_record(&record);

            match self.check(&record, post.as_ref(), &origin).await {
                Verdict::Spam => match store.set_state(record.id, ModerationState::Spam) {
                    Ok(()) => summary.flagged += 1,
                    Err(StoreError::NotFound) => {
                        // Deleted while we were checking; nothing to flag.
                        log::debug!("comment {} vanished during recheck", record.id);
                    }
                    Err(e) => {
                        log::warn!("failed to flag comment {}: {e}", record.id);
                        summary.failed += 1;
                    }
                },
                Verdict::Unreachable => {
                    log::warn!("service unreachable while rechecking comment {}", record.id);
                    summary.failed += 1;
                }
                Verdict::Ham | Verdict::Unknown => {}
            }
        }

        log::info!(
            "queue recheck: {} checked, {} flagged, {} failed",
            summary.checked,
            summary.flagged,
            summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::testing::RecordingSink;
    use crate::store::{sample_comment, CommentRecord, ContentItem, MemoryStore};
    use crate::transport::testing::{ScriptedReply, ScriptedTransport};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn gateway(replies: &[ScriptedReply]) -> (Gateway, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::replying(replies));
        let config = Config {
            api_key: Some("abc123".to_string()),
            ..Config::default()
        };
        let gateway = Gateway::new(
            config,
            transport.clone(),
            Arc::new(RecordingSink::default()),
        )
        .unwrap();
        (gateway, transport)
    }

    fn seeded_store(records: Vec<CommentRecord>) -> MemoryStore {
        let store = MemoryStore::new();
        store.add_post(ContentItem {
            id: 1,
            published_at: at(1),
            modified_at: at(1),
        });
        for record in records {
            store.insert(record).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn flags_spam_and_leaves_ham_pending() {
        let (gateway, _) = gateway(&[
            ScriptedReply::Body("true"),
            ScriptedReply::Body("false"),
        ]);
        let store = seeded_store(vec![sample_comment(1, at(2)), sample_comment(2, at(3))]);

        let summary = gateway.recheck_pending(&store).await.unwrap();

        assert_eq!(
            summary,
            RecheckSummary {
                checked: 2,
                flagged: 1,
                failed: 0
            }
        );
        assert_eq!(store.comment(1).unwrap().state, ModerationState::Spam);
        assert_eq!(store.comment(2).unwrap().state, ModerationState::Pending);
        // Batch re-check never touches the cumulative counter.
        assert_eq!(store.spam_caught_total().unwrap(), 0);
    }

    #[tokio::test]
    async fn one_unreachable_item_does_not_abort_the_batch() {
        let (gateway, _) = gateway(&[
            ScriptedReply::Unreachable,
            ScriptedReply::Body("true"),
        ]);
        let store = seeded_store(vec![sample_comment(1, at(2)), sample_comment(2, at(3))]);

        let summary = gateway.recheck_pending(&store).await.unwrap();

        assert_eq!(summary.checked, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.flagged, 1);
        assert_eq!(store.comment(1).unwrap().state, ModerationState::Pending);
        assert_eq!(store.comment(2).unwrap().state, ModerationState::Spam);
    }

    #[tokio::test]
    async fn recheck_origin_comes_from_the_stored_record() {
        let (gateway, transport) = gateway(&[ScriptedReply::Body("false")]);
        let mut record = sample_comment(1, at(2));
        record.author_ip = "198.51.100.23".to_string();
        record.user_agent = "OldBrowser/3.0".to_string();
        let store = seeded_store(vec![record]);

        gateway.recheck_pending(&store).await.unwrap();

        let calls = transport.calls();
        let get = |key: &str| {
            calls[0]
                .fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("user_ip"), "198.51.100.23");
        assert_eq!(get("user_agent"), "OldBrowser/3.0");
        assert_eq!(get("referrer"), "");
    }

    #[tokio::test]
    async fn empty_backlog_is_a_no_op() {
        let (gateway, transport) = gateway(&[]);
        let store = seeded_store(vec![]);

        let summary = gateway.recheck_pending(&store).await.unwrap();

        assert_eq!(summary, RecheckSummary::default());
        assert!(transport.calls().is_empty());
    }
}
