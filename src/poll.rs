// src/poll.rs
use std::fmt;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::db::{entries, SharedStore};
use crate::error::{CreatePollError, DeletePollError, StoreError, VoteError};
use crate::models::{sanitize_identity, Poll, VoteMap};
use crate::validation::{validate_options, validate_question};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionTally {
    pub label: String,
    pub votes: usize,
    pub percent: f64,
}

impl fmt::Display for OptionTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.1}%", self.label, self.percent)
    }
}

/// Per-option counts and shares, derived from the vote map on every call.
pub fn tally(poll: &Poll) -> Vec<OptionTally> {
    let total = poll.votes.len();
    poll.options
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let votes = poll.votes.values().filter(|&&choice| choice == index).count();
            OptionTally {
                label: label.clone(),
                votes,
                percent: percent(votes, total),
            }
        })
        .collect()
}

fn percent(votes: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 * 1000.0 / total as f64).round() / 10.0
}

#[derive(Clone)]
pub struct PollStore {
    store: SharedStore,
    path: String,
}

impl PollStore {
    pub fn new(store: SharedStore, path: impl Into<String>) -> Self {
        Self { store, path: path.into() }
    }

    fn poll_path(&self, id: &str) -> String {
        format!("{}/{}", self.path, id)
    }

    /// All polls, newest first. Polls created at the same instant keep the
    /// store's key order.
    pub async fn list_polls(&self) -> Result<Vec<Poll>, StoreError> {
        let listing = self.store.get(&self.path).await?;
        let mut polls = entries(listing)?
            .into_iter()
            .filter_map(|(id, record)| match serde_json::from_value::<Poll>(record) {
                Ok(poll) => Some(Poll { id, ..poll }),
                Err(e) => {
                    warn!(id = %id, "skipping unreadable poll: {e}");
                    None
                }
            })
            .collect::<Vec<_>>();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(count = polls.len(), "listed polls");
        Ok(polls)
    }

    pub async fn get_poll(&self, id: &str) -> Result<Option<Poll>, StoreError> {
        let record = self.store.get(&self.poll_path(id)).await?;
        if record.is_null() {
            return Ok(None);
        }
        let poll: Poll = serde_json::from_value(record)?;
        Ok(Some(Poll { id: id.to_string(), ..poll }))
    }

    pub async fn create_poll<S: AsRef<str>>(
        &self,
        question: &str,
        options: &[S],
        owner: &str,
    ) -> Result<String, CreatePollError> {
        validate_question(question)?;
        validate_options(options)?;

        let poll = Poll {
            id: String::new(),
            question: question.trim().to_string(),
            options: options.iter().map(|o| o.as_ref().trim().to_string()).collect(),
            created_by: owner.to_string(),
            created_at: Utc::now(),
            votes: VoteMap::new(),
        };
        let body = serde_json::to_value(&poll).map_err(StoreError::from)?;
        let id = self.store.post(&self.path, &body).await?;
        info!(id = %id, owner, "poll created");
        Ok(id)
    }

    pub async fn delete_poll(&self, id: &str, requester: &str) -> Result<(), DeletePollError> {
        let poll = self.get_poll(id).await?.ok_or(DeletePollError::NotFound)?;
        if poll.created_by != requester {
            info!(id, requester, "delete rejected: not the owner");
            return Err(DeletePollError::NotOwner);
        }
        self.store.delete(&self.poll_path(id)).await?;
        info!(id, "poll deleted");
        Ok(())
    }

    /// Record `identity`'s choice unless it already voted on this poll.
    ///
    /// Reads the poll fresh, checks, then writes the whole merged vote map
    /// back. Nothing makes the read and write atomic: two voters racing on
    /// the same poll can both pass the check, and the later write replaces
    /// the earlier one's vote map.
    pub async fn vote(&self, id: &str, identity: &str, option: usize) -> Result<VoteMap, VoteError> {
        let poll = self.get_poll(id).await?.ok_or(VoteError::PollNotFound)?;

        let key = sanitize_identity(identity);
        if poll.votes.contains_key(&key) {
            info!(id, voter = %key, "vote rejected: already voted");
            return Err(VoteError::AlreadyVoted);
        }
        if option >= poll.options.len() {
            return Err(VoteError::OptionOutOfRange {
                index: option,
                len: poll.options.len(),
            });
        }

        let mut votes = poll.votes;
        votes.insert(key, option);
        self.store
            .patch(&self.poll_path(id), &json!({ "votes": votes }))
            .await?;
        info!(id, option, "vote recorded");
        Ok(votes)
    }
}
