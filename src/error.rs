// src/error.rs
use reqwest::StatusCode;
use thiserror::Error;

use crate::validation::FormErrors;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email format")]
    InvalidFormat,

    #[error("Password must be at least 6 characters")]
    TooShort,

    #[error("Passwords do not match")]
    Mismatch,

    #[error("Question cannot be empty")]
    EmptyQuestion,

    #[error("Options cannot be empty")]
    EmptyOption,

    #[error("A poll needs at least two options")]
    TooFewOptions,
}

/// Failure talking to the hosted database.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed store payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid store path: {0}")]
    InvalidPath(String),

    #[error("unexpected store response: {0}")]
    Unexpected(String),
}

#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("registration form has errors")]
    Invalid(FormErrors),

    #[error("email already registered")]
    AlreadyExists,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegisterError {
    pub fn notice(&self) -> &'static str {
        match self {
            RegisterError::Invalid(_) => "Please fix the errors before submitting.",
            RegisterError::AlreadyExists => "Email already registered.",
            RegisterError::Store(_) => "Registration failed.",
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn notice(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password.",
            AuthError::Store(_) => "Login failed.",
        }
    }
}

#[derive(Error, Debug)]
pub enum CreatePollError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("not signed in")]
    NotAuthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CreatePollError {
    pub fn notice(&self) -> &'static str {
        match self {
            CreatePollError::Invalid(ValidationError::EmptyQuestion) => "Please enter a question.",
            CreatePollError::Invalid(ValidationError::TooFewOptions) => "Please add at least two options.",
            CreatePollError::Invalid(_) => "Please fill in every option.",
            CreatePollError::NotAuthenticated => "Please log in first.",
            CreatePollError::Store(_) => "Failed to create poll.",
        }
    }
}

#[derive(Error, Debug)]
pub enum DeletePollError {
    #[error("poll not found")]
    NotFound,

    #[error("only the poll owner can delete it")]
    NotOwner,

    #[error("not signed in")]
    NotAuthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DeletePollError {
    pub fn notice(&self) -> &'static str {
        match self {
            DeletePollError::NotFound => "Poll no longer exists.",
            DeletePollError::NotOwner => "You can only delete your own polls.",
            DeletePollError::NotAuthenticated => "Please log in first.",
            DeletePollError::Store(_) => "Failed to delete poll.",
        }
    }
}

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("already voted on this poll")]
    AlreadyVoted,

    #[error("poll not found")]
    PollNotFound,

    #[error("option {index} is not one of the poll's {len} options")]
    OptionOutOfRange { index: usize, len: usize },

    #[error("not signed in")]
    NotAuthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl VoteError {
    pub fn notice(&self) -> &'static str {
        match self {
            VoteError::AlreadyVoted => "You have already voted on this poll.",
            VoteError::PollNotFound => "Poll no longer exists.",
            VoteError::OptionOutOfRange { .. } => "Please pick one of the listed options.",
            VoteError::NotAuthenticated => "Please log in to vote.",
            VoteError::Store(_) => "Failed to record vote.",
        }
    }
}

/// Raised by session storage backends. The session itself only logs these.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session storage I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is corrupt: {0}")]
    Decode(#[from] serde_json::Error),
}
