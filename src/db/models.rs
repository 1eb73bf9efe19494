use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const KIND_VIDEO: &str = "video";
pub const KIND_DOCUMENT: &str = "document";

/// One deliverable catalog entry. `file_ref` is the transport's cached
/// media handle and can be replayed to resend the file without
/// re-uploading; `kind` records which send method replays it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MovieRow {
    pub id: i64,
    pub title: String,
    pub file_ref: String,
    pub kind: String,
    pub raw_caption: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMovie {
    pub title: String,
    pub file_ref: String,
    pub kind: String,
    pub raw_caption: Option<String>,
}
