//! Webhook handling for push events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - The push payload schema
//! - Normalization of push entries into commit records

pub mod normalize;
pub mod push;
pub mod signature;

pub use normalize::{NormalizeError, avatar_url, merge_file_changes, normalize_commit, normalize_push};
pub use push::{
    BRANCH_REF_PREFIX, EventKind, PUSH_EVENT, PushEvent, PushParseError, PushRepository,
    parse_push_event,
};
pub use signature::{
    SignatureCheck, check_signature, compute_signature, format_signature_header,
    parse_signature_header, verify_signature,
};
