use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Lifecycle stage of a comment inside the host store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationState {
    Pending,
    Approved,
    Spam,
}

impl ModerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationState::Pending => "pending",
            ModerationState::Approved => "approved",
            ModerationState::Spam => "spam",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentType {
    Comment,
    Trackback,
    Pingback,
}

impl CommentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentType::Comment => "comment",
            CommentType::Trackback => "trackback",
            CommentType::Pingback => "pingback",
        }
    }
}

/// One submitted comment as the host store sees it. The gateway reads
/// these and requests state transitions; it never keeps a copy beyond a
/// single classification call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: u64,
    pub post_id: u64,
    pub author: String,
    pub author_email: String,
    pub author_url: String,
    pub author_ip: String,
    pub user_agent: String,
    pub submitted_at: NaiveDateTime,
    pub content: String,
    pub state: ModerationState,
    pub kind: CommentType,
}

/// The post a comment is attached to. Read-only to the gateway: the
/// publish timestamp feeds the wire request, the edit timestamp feeds the
/// stale-post discard policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    pub published_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Narrow collaborator interface onto the host platform's comment store.
/// Single-row updates are assumed atomic on the store's side; the gateway
/// adds no coordination of its own.
pub trait CommentStore: Send + Sync {
    fn comment(&self, id: u64) -> Result<CommentRecord, StoreError>;
    fn content_item(&self, id: u64) -> Result<ContentItem, StoreError>;
    fn pending(&self) -> Result<Vec<CommentRecord>, StoreError>;
    fn insert(&self, record: CommentRecord) -> Result<(), StoreError>;
    fn set_state(&self, id: u64, state: ModerationState) -> Result<(), StoreError>;
    /// Delete confirmed spam submitted strictly before `cutoff`. Returns
    /// the number of rows removed.
    fn delete_spam_before(&self, cutoff: NaiveDateTime) -> Result<usize, StoreError>;
    fn compact(&self) -> Result<(), StoreError>;
    /// Live queue size, derived by counting records in spam state.
    fn count_spam(&self) -> Result<u64, StoreError>;
    /// Total spam ever caught. Persisted independently of the queue.
    fn spam_caught_total(&self) -> Result<u64, StoreError>;
    fn record_spam_caught(&self) -> Result<u64, StoreError>;
}

/// In-memory store used by tests and the CLI's offline fixtures.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    comments: HashMap<u64, CommentRecord>,
    posts: HashMap<u64, ContentItem>,
    caught_total: u64,
    compactions: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_post(&self, post: ContentItem) {
        self.inner.lock().unwrap().posts.insert(post.id, post);
    }

    pub fn compactions(&self) -> u64 {
        self.inner.lock().unwrap().compactions
    }
}

impl CommentStore for MemoryStore {
    fn comment(&self, id: u64) -> Result<CommentRecord, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .comments
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn content_item(&self, id: u64) -> Result<ContentItem, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .posts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn pending(&self) -> Result<Vec<CommentRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<CommentRecord> = inner
            .comments
            .values()
            .filter(|c| c.state == ModerationState::Pending)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.id);
        Ok(rows)
    }

    fn insert(&self, record: CommentRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .comments
            .insert(record.id, record);
        Ok(())
    }

    fn set_state(&self, id: u64, state: ModerationState) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.comments.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.state = state;
        Ok(())
    }

    fn delete_spam_before(&self, cutoff: NaiveDateTime) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.comments.len();
        inner
            .comments
            .retain(|_, c| !(c.state == ModerationState::Spam && c.submitted_at < cutoff));
        Ok(before - inner.comments.len())
    }

    fn compact(&self) -> Result<(), StoreError> {
        self.inner.lock().unwrap().compactions += 1;
        Ok(())
    }

    fn count_spam(&self) -> Result<u64, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .comments
            .values()
            .filter(|c| c.state == ModerationState::Spam)
            .count() as u64)
    }

    fn spam_caught_total(&self) -> Result<u64, StoreError> {
        Ok(self.inner.lock().unwrap().caught_total)
    }

    fn record_spam_caught(&self) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.caught_total += 1;
        Ok(inner.caught_total)
    }
}

#[cfg(test)]
pub(crate) fn sample_comment(id: u64, submitted_at: NaiveDateTime) -> CommentRecord {
    CommentRecord {
        id,
        post_id: 1,
        author: "Ferris".to_string(),
        author_email: "ferris@example.com".to_string(),
        author_url: "http://example.com/~ferris".to_string(),
        author_ip: "192.0.2.10".to_string(),
        user_agent: "Mozilla/5.0".to_string(),
        submitted_at,
        content: "Nice post!".to_string(),
        state: ModerationState::Pending,
        kind: CommentType::Comment,
    }
}
