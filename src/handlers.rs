// handlers.rs
//! The explicit application context a front end drives: one signed-in
//! session, the two store clients and a cached poll list.
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{self, SharedStore};
use crate::error::{AuthError, CreatePollError, DeletePollError, RegisterError, StoreError, VoteError};
use crate::models::{Poll, User, VoteMap};
use crate::poll::PollStore;
use crate::session::{FileStorage, Remember, Session, SessionStorage};
use crate::users::UserStore;
use crate::validation::{LoginForm, RegistrationForm};

pub const REGISTERED: &str = "Registered successfully!";
pub const LOGGED_IN: &str = "Login successful!";
pub const POLL_CREATED: &str = "Poll created!";
pub const VOTE_RECORDED: &str = "Vote recorded!";
pub const POLL_DELETED: &str = "Poll deleted.";

/// Last fetched poll list.
///
/// A read cache only: it reflects this client's own writes but never other
/// clients', until the next [`PollBoard::refresh`].
#[derive(Debug, Default)]
pub struct PollBoard {
    polls: Vec<Poll>,
    fetched_at: Option<DateTime<Utc>>,
}

impl PollBoard {
    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn get(&self, id: &str) -> Option<&Poll> {
        self.polls.iter().find(|p| p.id == id)
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub async fn refresh(&mut self, store: &PollStore) -> Result<&[Poll], StoreError> {
        self.polls = store.list_polls().await?;
        self.fetched_at = Some(Utc::now());
        Ok(&self.polls)
    }

    fn apply_votes(&mut self, id: &str, votes: VoteMap) {
        if let Some(poll) = self.polls.iter_mut().find(|p| p.id == id) {
            poll.votes = votes;
        }
    }

    fn remove(&mut self, id: &str) {
        self.polls.retain(|p| p.id != id);
    }

    fn clear(&mut self) {
        self.polls.clear();
        self.fetched_at = None;
    }
}

pub struct App {
    users: UserStore,
    polls: PollStore,
    session: Session,
    board: PollBoard,
}

impl App {
    pub fn new(store: SharedStore, users_path: &str, polls_path: &str, storage: Box<dyn SessionStorage>) -> Self {
        Self {
            users: UserStore::new(store.clone(), users_path),
            polls: PollStore::new(store, polls_path),
            session: Session::restore(storage),
            board: PollBoard::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let store = db::connect(config)?;
        let storage = Box::new(FileStorage::new(&config.session_file));
        Ok(Self::new(store, &config.users_path, &config.polls_path, storage))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn board(&self) -> &PollBoard {
        &self.board
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn polls(&self) -> &PollStore {
        &self.polls
    }

    /// Create an account. Registering does not sign the user in.
    pub async fn register(&mut self, form: &RegistrationForm) -> Result<User, RegisterError> {
        self.users.register(form).await
    }

    pub async fn sign_in(&mut self, form: &LoginForm, remember: Remember) -> Result<User, AuthError> {
        let user = self.users.authenticate(&form.email, &form.password).await?;
        self.session.login(user.email.clone(), remember);
        Ok(user)
    }

    pub fn sign_out(&mut self) {
        if let Some(identity) = self.session.identity() {
            info!(identity, "signing out");
        }
        self.session.logout();
        self.board.clear();
    }

    pub async fn refresh(&mut self) -> Result<&[Poll], StoreError> {
        self.board.refresh(&self.polls).await
    }

    pub async fn create_poll<S: AsRef<str>>(&mut self, question: &str, options: &[S]) -> Result<String, CreatePollError> {
        let owner = self.session.identity().ok_or(CreatePollError::NotAuthenticated)?;
        let id = self.polls.create_poll(question, options, owner).await?;
        if let Err(e) = self.board.refresh(&self.polls).await {
            warn!("poll list refresh after create failed: {e}");
        }
        Ok(id)
    }

    /// Vote as the signed-in identity. On success the cached poll shows the
    /// merged vote map the store now holds.
    pub async fn vote(&mut self, poll_id: &str, option: usize) -> Result<VoteMap, VoteError> {
        let identity = self.session.identity().ok_or(VoteError::NotAuthenticated)?;
        match self.polls.vote(poll_id, identity, option).await {
            Ok(votes) => {
                self.board.apply_votes(poll_id, votes.clone());
                Ok(votes)
            }
            Err(VoteError::PollNotFound) => {
                self.board.remove(poll_id);
                Err(VoteError::PollNotFound)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn delete_poll(&mut self, poll_id: &str) -> Result<(), DeletePollError> {
        let identity = self.session.identity().ok_or(DeletePollError::NotAuthenticated)?;
        let outcome = self.polls.delete_poll(poll_id, identity).await;
        if matches!(outcome, Ok(()) | Err(DeletePollError::NotFound)) {
            self.board.remove(poll_id);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::{JsonStore, MemoryStore};
    use crate::session::MemoryStorage;

    fn app() -> App {
        App::new(Arc::new(MemoryStore::new()), "users", "polls", Box::new(MemoryStorage::default()))
    }

    fn form(email: &str) -> RegistrationForm {
        RegistrationForm {
            email: email.into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
            phone_number: String::new(),
        }
    }

    async fn signed_in(email: &str) -> App {
        let mut app = app();
        app.register(&form(email)).await.unwrap();
        let login = LoginForm { email: email.into(), password: "secret".into() };
        app.sign_in(&login, Remember::No).await.unwrap();
        app
    }

    #[tokio::test]
    async fn poll_actions_need_a_session() {
        let mut app = app();
        assert!(matches!(app.create_poll("Q", &["A", "B"]).await, Err(CreatePollError::NotAuthenticated)));
        assert!(matches!(app.vote("-1", 0).await, Err(VoteError::NotAuthenticated)));
        assert!(matches!(app.delete_poll("-1").await, Err(DeletePollError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn registering_does_not_sign_in() {
        let mut app = app();
        app.register(&form("a@b.co")).await.unwrap();
        assert!(!app.session().is_logged_in());
    }

    #[tokio::test]
    async fn vote_updates_the_cached_poll() {
        let mut app = signed_in("a@b.co").await;
        let id = app.create_poll("Best?", &["A", "B"]).await.unwrap();
        assert_eq!(app.board().polls().len(), 1);

        app.vote(&id, 1).await.unwrap();
        assert_eq!(app.board().get(&id).unwrap().vote_of("a@b.co"), Some(1));
    }

    #[tokio::test]
    async fn delete_prunes_the_cache_without_refetching() {
        let memory = Arc::new(MemoryStore::new());
        let mut app = App::new(memory.clone(), "users", "polls", Box::new(MemoryStorage::default()));
        app.register(&form("a@b.co")).await.unwrap();
        let login = LoginForm { email: "a@b.co".into(), password: "secret".into() };
        app.sign_in(&login, Remember::No).await.unwrap();

        let kept = app.create_poll("Keep?", &["A", "B"]).await.unwrap();
        let gone = app.create_poll("Gone?", &["A", "B"]).await.unwrap();
        let fetched = app.board().fetched_at();

        // another client removes the poll behind our back
        memory.delete(&format!("polls/{gone}")).await.unwrap();
        assert!(matches!(app.delete_poll(&gone).await, Err(DeletePollError::NotFound)));
        assert!(app.board().get(&gone).is_none());
        assert!(app.board().get(&kept).is_some());
        assert_eq!(app.board().fetched_at(), fetched);
    }

    #[tokio::test]
    async fn delete_drops_the_cached_poll_and_sign_out_clears_the_board() {
        let mut app = signed_in("a@b.co").await;
        let id = app.create_poll("Best?", &["A", "B"]).await.unwrap();
        app.delete_poll(&id).await.unwrap();
        assert!(app.board().get(&id).is_none());

        app.create_poll("Again?", &["Yes", "No"]).await.unwrap();
        assert!(app.board().fetched_at().is_some());
        app.sign_out();
        assert!(app.board().polls().is_empty());
        assert!(app.session().identity().is_none());
    }
}
