//! Key generation for the single-table layout.
//!
//! Every record lives in one table keyed by `PK`/`SK`. Users group their
//! credential and profile items under `USER#<email>`; posts use
//! `POST#<post_id>` for both halves of the key.
//!
//! Emails are used exactly as given. Callers that want case-insensitive
//! identity have to canonicalise before calling in here.

use chrono::{DateTime, SecondsFormat, Utc};

pub const USER_PREFIX: &str = "USER#";
pub const AUTH_PREFIX: &str = "AUTH#";
pub const PROFILE_PREFIX: &str = "PROFILE#";
pub const POST_PREFIX: &str = "POST#";

// Attribute names shared by every item.
pub const PK: &str = "PK";
pub const SK: &str = "SK";
pub const ENTITY_TYPE: &str = "EntityType";
pub const CREATED_AT: &str = "CreatedAt";

/// Posts by author, ordered by creation time.
pub const AUTHOR_INDEX: &str = "GSI1";
pub const AUTHOR_INDEX_PK: &str = "GSI1_PK";
pub const AUTHOR_INDEX_SK: &str = "GSI1_SK";

/// Every item of one entity type, ordered by creation time.
pub const TYPE_INDEX: &str = "GSI2";

/// Pattern: `USER#<email>`
pub fn user_pk(email: &str) -> String {
    format!("{USER_PREFIX}{email}")
}

/// Pattern: `AUTH#<email>`
pub fn user_auth_sk(email: &str) -> String {
    format!("{AUTH_PREFIX}{email}")
}

/// Pattern: `PROFILE#<email>`
pub fn user_profile_sk(email: &str) -> String {
    format!("{PROFILE_PREFIX}{email}")
}

/// Pattern: `POST#<post_id>`, used for both PK and SK.
pub fn post_pk(post_id: &str) -> String {
    format!("{POST_PREFIX}{post_id}")
}

/// Author index partition key. Same shape as [`user_pk`] so a post points
/// back at its author's partition.
pub fn post_author_pk(email: &str) -> String {
    format!("{USER_PREFIX}{email}")
}

/// Pattern: `POST#<created_at>`
pub fn post_author_sk(created_at: &str) -> String {
    format!("{POST_PREFIX}{created_at}")
}

/// Recover the author email from an author index partition key.
pub fn email_from_author_pk(key: &str) -> Option<&str> {
    key.strip_prefix(USER_PREFIX)
}

/// Format a creation timestamp.
///
/// Both time-ordered indexes sort on this string, so it must always carry
/// the same precision and the `Z` suffix: millisecond RFC 3339 in UTC.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
