pub mod config;
pub mod events;
pub mod pipeline;
pub mod protocol;
pub mod queue;
pub mod reporter;
pub mod store;
pub mod sweeper;
pub mod transport;
pub mod verifier;

pub use config::Config;
pub use events::{EventSink, GatewayEvent, LogSink};
pub use pipeline::{Disposition, Gateway};
pub use protocol::{KeyStatus, OriginContext, Verdict};
pub use queue::RecheckSummary;
pub use reporter::ReportOutcome;
pub use store::{
    CommentRecord, CommentStore, CommentType, ContentItem, MemoryStore, ModerationState,
    StoreError,
};
pub use sweeper::{CompactionTrigger, RetentionSweeper};
pub use transport::{HttpClient, RawResponse, Transport, TransportError};
pub use verifier::KeyVerifier;
