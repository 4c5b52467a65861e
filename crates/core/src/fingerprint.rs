//! Change-set fingerprints and the send/skip/clear delta decision.
//!
//! A user's matches for one date collapse into a sorted, de-duplicated list
//! of canonical keys. The SHA-256 of that list (salted with user and date,
//! not keyed) identifies the change-set: identical sets hash identically no
//! matter in which order the provider returned the rows.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::hashing::sha256_hex;
use crate::matching::MatchResult;
use crate::types::{DateNumber, DbId};

/// Separator between the fields of one canonical key.
pub const KEY_FIELD_DELIMITER: &str = "|";

/// Separator between canonical keys in the hashed string.
pub const KEY_LIST_DELIMITER: &str = "||";

/// What to do with a (user, date) after comparing fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaAction {
    /// New or changed information: notify.
    Send,
    /// Nothing new (or nothing at all): stay quiet.
    Skip,
    /// Changes were notified before but are gone now: retract.
    Clear,
}

impl DeltaAction {
    pub fn as_str(self) -> &'static str {
        match self {
            DeltaAction::Send => "send",
            DeltaAction::Skip => "skip",
            DeltaAction::Clear => "clear",
        }
    }
}

impl fmt::Display for DeltaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_token(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Canonical key of one match: `group|hours|subject|teacher|type|room`.
pub fn match_key(result: &MatchResult) -> String {
    let sub = &result.substitution;
    [
        sub.group.as_str(),
        sub.hours.as_str(),
        sub.subject.as_str(),
        sub.teacher.as_str(),
        sub.kind.as_str(),
        sub.room.as_str(),
    ]
    .into_iter()
    .map(normalize_token)
    .collect::<Vec<_>>()
    .join(KEY_FIELD_DELIMITER)
}

/// De-duplicated, lexicographically sorted canonical keys.
pub fn canonicalize_match_keys(matches: &[MatchResult]) -> Vec<String> {
    matches
        .iter()
        .map(match_key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// SHA-256 hex over `"{user_id}:{target_date}:{keys joined by ||}"`.
pub fn build_fingerprint(user_id: DbId, target_date: DateNumber, keys: &[String]) -> String {
    let material = format!(
        "{user_id}:{target_date}:{}",
        keys.join(KEY_LIST_DELIMITER)
    );
    sha256_hex(material.as_bytes())
}

/// Decide between send, skip and clear.
///
/// | previous | current            | action |
/// |----------|--------------------|--------|
/// | any      | none / zero matches| `clear` if previous exists, else `skip` |
/// | none     | some               | `send` |
/// | x        | x                  | `skip` |
/// | x        | y                  | `send` |
pub fn resolve_delta_action(
    previous: Option<&str>,
    current: Option<&str>,
    current_match_count: usize,
) -> DeltaAction {
    let current = match current {
        Some(hash) if current_match_count > 0 && !hash.is_empty() => hash,
        _ => {
            return match previous {
                Some(prev) if !prev.is_empty() => DeltaAction::Clear,
                _ => DeltaAction::Skip,
            };
        }
    };

    match previous {
        Some(prev) if !prev.is_empty() => {
            if prev == current {
                DeltaAction::Skip
            } else {
                DeltaAction::Send
            }
        }
        _ => DeltaAction::Send,
    }
}

/// The fingerprint of one user's matches for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayFingerprint {
    pub target_date: DateNumber,
    pub keys: Vec<String>,
    /// `None` when there are no matches.
    pub hash: Option<String>,
    /// Number of distinct canonical keys.
    pub match_count: usize,
}

impl DayFingerprint {
    pub fn compute(user_id: DbId, target_date: DateNumber, matches: &[MatchResult]) -> Self {
        let keys = canonicalize_match_keys(matches);
        let hash = (!keys.is_empty()).then(|| build_fingerprint(user_id, target_date, &keys));
        Self {
            target_date,
            match_count: keys.len(),
            keys,
            hash,
        }
    }

    /// Delta decision against the previously persisted hash.
    pub fn action_against(&self, previous: Option<&str>) -> DeltaAction {
        resolve_delta_action(previous, self.hash.as_deref(), self.match_count)
    }

    /// First 8 hex characters of the hash, used in notification tags.
    pub fn short_hash(&self) -> &str {
        self.hash.as_deref().map(|h| &h[..h.len().min(8)]).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
