// models.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sanitized voter key -> chosen option index.
pub type VoteMap = BTreeMap<String, usize>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// Push key assigned by the store; not part of the stored record.
    #[serde(skip)]
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    // The store drops empty objects, so a poll nobody voted on has no `votes` at all.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub votes: VoteMap,
}

impl Poll {
    pub fn vote_of(&self, identity: &str) -> Option<usize> {
        self.votes.get(&sanitize_identity(identity)).copied()
    }

    pub fn total_votes(&self) -> usize {
        self.votes.len()
    }
}

/// Turn an email into something usable as a path segment in the store.
///
/// Neither placeholder can occur in an accepted email, so distinct emails
/// keep distinct keys.
pub fn sanitize_identity(identity: &str) -> String {
    identity.replace('.', ",").replace('@', "!")
}
