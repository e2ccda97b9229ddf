//! Record id and filename generation
//!
//! Ids are opaque strings: a millisecond timestamp plus a short UUID suffix,
//! optionally under a prefix that marks the record's origin ("ai-", "user-").

use chrono::Utc;
use uuid::Uuid;

/// Generate an opaque record id: `<millis>-<uuid prefix>`
pub fn new_id() -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), short_suffix())
}

/// Generate a prefixed record id, e.g. `ai-<millis>-<uuid prefix>`
pub fn prefixed_id(prefix: &str) -> String {
    format!("{}-{}", prefix, new_id())
}

/// Generate a unique stored filename: `<stem>-<millis>-<uuid prefix><ext>`
///
/// `ext` must include the leading dot (or be empty).
pub fn unique_filename(stem: &str, ext: &str) -> String {
    format!(
        "{}-{}-{}{}",
        stem,
        Utc::now().timestamp_millis(),
        short_suffix(),
        ext
    )
}

fn short_suffix() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
