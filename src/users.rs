// src/users.rs
//! Registration and login against the flat user collection.
//!
//! The collection has no index and no uniqueness constraint, so both
//! operations read every record and scan it here.
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::db::{entries, SharedStore};
use crate::error::{AuthError, RegisterError, StoreError};
use crate::models::User;
use crate::validation::RegistrationForm;

#[derive(Clone)]
pub struct UserStore {
    store: SharedStore,
    path: String,
}

impl UserStore {
    pub fn new(store: SharedStore, path: impl Into<String>) -> Self {
        Self { store, path: path.into() }
    }

    /// Every decodable user record, in insertion order.
    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let listing = self.store.get(&self.path).await?;
        let users = entries(listing)?
            .into_iter()
            .filter_map(|(key, record)| match serde_json::from_value::<User>(record) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(key = %key, "skipping unreadable user record: {e}");
                    None
                }
            })
            .collect::<Vec<_>>();
        debug!(count = users.len(), "listed users");
        Ok(users)
    }

    /// Insert `candidate` unless a record with the same email exists.
    ///
    /// The check and the insert are two separate requests. Two registrations
    /// racing on the same email can both pass the check and both insert.
    pub async fn register_user(&self, candidate: &User) -> Result<String, RegisterError> {
        let users = self.list_users().await?;
        if users.iter().any(|u| u.email == candidate.email) {
            info!(email = %candidate.email, "registration rejected: email taken");
            return Err(RegisterError::AlreadyExists);
        }

        let body: Value = serde_json::to_value(candidate).map_err(StoreError::from)?;
        let key = self.store.post(&self.path, &body).await?;
        info!(email = %candidate.email, key = %key, "user registered");
        Ok(key)
    }

    /// Validate the form, then register the user it describes.
    pub async fn register(&self, form: &RegistrationForm) -> Result<User, RegisterError> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(RegisterError::Invalid(errors));
        }

        let user = User {
            email: form.email.clone(),
            password: form.password.clone(),
            phone_number: form.phone(),
            created_at: Some(Utc::now()),
        };
        self.register_user(&user).await?;
        Ok(user)
    }

    /// First record whose email and password both match exactly.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let users = self.list_users().await?;
        match users.into_iter().find(|u| u.email == email && u.password == password) {
            Some(user) => {
                info!(email, "login succeeded");
                Ok(user)
            }
            None => {
                info!(email, "login rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::db::{JsonStore, MemoryStore};

    fn user(email: &str, password: &str) -> User {
        User {
            email: email.into(),
            password: password.into(),
            phone_number: None,
            created_at: None,
        }
    }

    fn setup() -> (Arc<MemoryStore>, UserStore) {
        let memory = Arc::new(MemoryStore::new());
        let users = UserStore::new(memory.clone(), "users");
        (memory, users)
    }

    #[tokio::test]
    async fn empty_collection_lists_nothing() {
        let (_, users) = setup();
        assert!(users.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_insert() {
        let (memory, users) = setup();
        users.register_user(&user("a@b.co", "secret")).await.unwrap();
        let before = memory.snapshot();

        let err = users.register_user(&user("a@b.co", "other-pass")).await.unwrap_err();
        assert!(matches!(err, RegisterError::AlreadyExists));
        assert_eq!(memory.snapshot(), before);
        assert_eq!(users.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn email_match_is_case_sensitive() {
        let (_, users) = setup();
        users.register_user(&user("a@b.co", "secret")).await.unwrap();
        users.register_user(&user("A@b.co", "secret")).await.unwrap();
        assert_eq!(users.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn authenticate_checks_email_and_password() {
        let (_, users) = setup();
        users.register_user(&user("a@b.co", "secret")).await.unwrap();

        let found = users.authenticate("a@b.co", "secret").await.unwrap();
        assert_eq!(found.email, "a@b.co");

        let err = users.authenticate("a@b.co", "wrong!").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let err = users.authenticate("nobody@b.co", "secret").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_store() {
        let (memory, users) = setup();
        let form = RegistrationForm {
            email: "a@b.co".into(),
            password: "secret".into(),
            confirm_password: "secreT".into(),
            phone_number: String::new(),
        };
        let err = users.register(&form).await.unwrap_err();
        assert!(matches!(err, RegisterError::Invalid(ref e) if e.confirm_password.is_some()));
        assert_eq!(memory.snapshot(), json!({}));
    }

    #[tokio::test]
    async fn register_stamps_and_stores_optional_phone() {
        let (memory, users) = setup();
        let form = RegistrationForm {
            email: "a@b.co".into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
            phone_number: " 555-0100 ".into(),
        };
        let created = users.register(&form).await.unwrap();
        assert!(created.created_at.is_some());

        let stored = entries(memory.get("users").await.unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1["phoneNumber"], json!("555-0100"));
        assert!(stored[0].1.get("confirmPassword").is_none());
    }

    #[tokio::test]
    async fn unreadable_records_are_skipped() {
        let memory = Arc::new(MemoryStore::with_data(json!({
            "users": {
                "-1": { "email": "a@b.co", "password": "secret" },
                "-2": { "unexpected": true },
            }
        })));
        let users = UserStore::new(memory, "users");
        assert_eq!(users.list_users().await.unwrap().len(), 1);
    }
}
