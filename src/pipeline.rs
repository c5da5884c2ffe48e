use crate::config::Config;
use crate::events::{EventSink, GatewayEvent};
use crate::protocol::{self, OriginContext, Verdict};
use crate::store::{CommentRecord, CommentStore, CommentType, ContentItem, ModerationState, StoreError};
use crate::sweeper::{CompactionTrigger, RetentionSweeper};
use crate::transport::Transport;
use anyhow::Context;
use chrono::{Duration, NaiveDateTime};
use std::sync::Arc;

/// What became of one inbound comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The comment proceeds through normal acceptance. Carries the
    /// verdict that let it through (ham, unknown, or unreachable —
    /// the service being down never blocks legitimate comment flow).
    Accepted(Verdict),
    /// Persisted in the spam queue for review.
    Spam,
    /// Discard policy fired: the submission was dropped outright and no
    /// record was persisted.
    Discarded,
}

/// Orchestrates one classification round trip and its side effects.
/// Construction fails without a configured credential; the pipeline must
/// not run unkeyed.
pub struct Gateway {
    pub(crate) config: Config,
    pub(crate) api_host: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) events: Arc<dyn EventSink>,
    sweeper: RetentionSweeper,
}

impl Gateway {
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        events: Arc<dyn EventSink>,
    ) -> anyhow::Result<Self> {
        let api_host = config
            .api_host()
            .context("no credential configured; the classification pipeline is disabled")?;
        let sweeper = RetentionSweeper::new(
            config.retention_days,
            CompactionTrigger::new(config.compact_every),
        );
        Ok(Gateway {
            config,
            api_host,
            transport,
            events,
            sweeper,
        })
    }

    pub(crate) fn path(&self, operation: &str) -> String {
        protocol::endpoint_path(&self.config.protocol_version, operation)
    }

    /// Encode, send, decode. Transport failure becomes `Unreachable`,
    /// propagated once — no retries.
    pub async fn check(
        &self,
        record: &CommentRecord,
        post: Option<&ContentItem>,
        origin: &OriginContext,
    ) -> Verdict {
        let fields = protocol::check_fields(&self.config.site_url, record, post, origin);
        match self
            .transport
            .post(&self.api_host, &self.path(protocol::COMMENT_CHECK), &fields)
            .await
        {
            Ok(response) => protocol::decode_check(&response.body),
            Err(e) => {
                log::warn!("comment-check failed: {e}");
                self.events.emit(GatewayEvent::ServiceUnreachable {
                    operation: protocol::COMMENT_CHECK,
                });
                Verdict::Unreachable
            }
        }
    }

    /// Classify an inbound comment and apply the verdict: state
    /// transition, counter, event, discard policy, then an opportunistic
    /// retention sweep. `now` is supplied by the caller so the discard
    /// and retention windows are pure functions of their inputs.
    pub async fn admit(
        &self,
        store: &dyn CommentStore,
        record: CommentRecord,
        origin: &OriginContext,
        now: NaiveDateTime,
    ) -> Disposition {
        let post = match store.content_item(record.post_id) {
            Ok(post) => Some(post),
            Err(StoreError::NotFound) => None, // deleted post: empty article context
            Err(e) => {
                log::warn!("content item {} lookup failed: {e}", record.post_id);
                None
            }
        };

        let verdict = self.check(&record, post.as_ref(), origin).await;
        let disposition = match verdict {
            Verdict::Spam => {
                if let Err(e) = store.record_spam_caught() {
                    log::warn!("failed to bump spam counter: {e}");
                }
                self.events.emit(GatewayEvent::SpamCaught {
                    comment_id: record.id,
                    post_id: record.post_id,
                });
                if self.should_discard(&record, post.as_ref(), now) {
                    self.events.emit(GatewayEvent::SubmissionDiscarded {
                        comment_id: record.id,
                        post_id: record.post_id,
                    });
                    // Acceptance terminates here: nothing persisted, no sweep.
                    return Disposition::Discarded;
                }
                let mut record = record;
                record.state = ModerationState::Spam;
                if let Err(e) = store.insert(record) {
                    log::error!("failed to persist spam record: {e}");
                }
                Disposition::Spam
            }
            verdict => {
                // Fail open: ham, unknown and unreachable all proceed
                // through normal acceptance unmodified.
                if let Err(e) = store.insert(record) {
                    log::error!("failed to persist comment: {e}");
                }
                Disposition::Accepted(verdict)
            }
        };

        if let Err(e) = self.sweeper.sweep(store, now) {
            log::warn!("retention sweep failed: {e}");
        }
        disposition
    }

    /// Stale-post discard: primary comment type only, post last edited
    /// more than `stale_post_days` ago, and the flag enabled.
    fn should_discard(
        &self,
        record: &CommentRecord,
        post: Option<&ContentItem>,
        now: NaiveDateTime,
    ) -> bool {
        if !self.config.discard_old_post_spam || record.kind != CommentType::Comment {
            return false;
        }
        match post {
            Some(post) => {
                now.signed_duration_since(post.modified_at)
                    > Duration::days(self.config.stale_post_days)
            }
            None => false,
        }
    }
}
