//! Append-only conversation transcripts stored as Heredoc JSON Lines.
//!
//! A session file starts with one `session` header record followed by one
//! `entry` record per conversation item. Entries form a tree through
//! `parent_id`; the last entry written is the current leaf.

mod error;
mod paths;
mod replay;
mod schema;
mod store;

pub use error::SessionStoreError;
pub use paths::{latest_session, session_file_name, session_root};
pub use schema::{
    EntryRecordType, SessionEntry, SessionEntryKind, SessionHeader, SessionRecordType,
    ENTRY_HEREDOC_FIELDS, HEADER_HEREDOC_FIELDS,
};
pub use store::SessionStore;
