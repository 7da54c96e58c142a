//! SQLite-backed storage.
//!
//! One [`pool::DatabasePool`] (split reader/writer, WAL mode) backs
//! every store in this module. Rows store UUIDs and timestamps as
//! text; the shared helpers below parse them back out.

pub mod completion;
pub mod context;
pub mod conversation;
pub mod message;
pub mod pool;
pub mod usage;
pub mod user;

pub use completion::SqliteCompletionSink;
pub use context::SqliteContextRepository;
pub use conversation::SqliteConversationRepository;
pub use message::SqliteMessageRepository;
pub use pool::DatabasePool;
pub use usage::SqliteUsageLedger;
pub use user::SqliteUserStore;

use cairn_types::error::RepositoryError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}
