// src/db.rs
//! Access to the hosted JSON database.
//!
//! The database is a single JSON tree addressed by slash-separated paths. It
//! offers no queries, filters or transactions: callers read whole collections
//! and do their own filtering. [`RestStore`] talks to the real thing over
//! HTTP (`{base}/{path}.json`), [`MemoryStore`] keeps the same semantics in
//! process.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Response, Url};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::StoreError;

#[async_trait]
pub trait JsonStore: Send + Sync {
    /// Value at `path`, or `Value::Null` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Value, StoreError>;

    /// Append `body` under a fresh push key and return that key.
    async fn post(&self, path: &str, body: &Value) -> Result<String, StoreError>;

    /// Merge the top-level fields of `body` into the object at `path`.
    async fn patch(&self, path: &str, body: &Value) -> Result<(), StoreError>;

    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn JsonStore>;

/// Build the HTTP-backed store described by the configuration.
pub fn connect(config: &Config) -> Result<SharedStore, StoreError> {
    let store = RestStore::new(&config.store_url, config.store_auth.clone(), config.http_timeout)?;
    Ok(Arc::new(store))
}

/// Split a collection listing into `(key, record)` pairs in key order.
pub fn entries(listing: Value) -> Result<Vec<(String, Value)>, StoreError> {
    match listing {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map.into_iter().collect()),
        // Collections whose keys all look like indices come back as arrays.
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect()),
        other => Err(StoreError::Unexpected(format!("expected a collection, got {other}"))),
    }
}

fn segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.is_empty() {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    for part in &parts {
        if part.contains(['.', '$', '#', '[', ']']) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
    }
    Ok(parts)
}

#[derive(Clone)]
pub struct RestStore {
    base: String,
    auth: Option<String>,
    client: Client,
}

impl RestStore {
    pub fn new(base: &str, auth: Option<String>, timeout: Option<Duration>) -> Result<Self, StoreError> {
        Url::parse(base).map_err(|e| StoreError::InvalidPath(format!("{base}: {e}")))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            auth,
            client: builder.build()?,
        })
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        let joined = segments(path)?.join("/");
        let mut url = Url::parse(&format!("{}/{}.json", self.base, joined))
            .map_err(|e| StoreError::InvalidPath(format!("{path}: {e}")))?;
        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        Ok(url)
    }

    async fn read(response: Response) -> Result<Value, StoreError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Status { status, body });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl JsonStore for RestStore {
    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        debug!(path, "GET");
        let response = self.client.get(self.url(path)?).send().await?;
        Self::read(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<String, StoreError> {
        debug!(path, "POST");
        let response = self.client.post(self.url(path)?).json(body).send().await?;
        let created = Self::read(response).await?;
        created
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Unexpected(format!("no key in POST reply: {created}")))
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<(), StoreError> {
        debug!(path, "PATCH");
        let response = self.client.patch(self.url(path)?).json(body).send().await?;
        Self::read(response).await.map(|_| ())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        debug!(path, "DELETE");
        let response = self.client.delete(self.url(path)?).send().await?;
        Self::read(response).await.map(|_| ())
    }
}

struct Tree {
    root: Value,
    next_key: u64,
}

/// In-process store with the hosted database's semantics: push keys sort in
/// arrival order, and nulls and empty objects are never kept.
pub struct MemoryStore {
    inner: Mutex<Tree>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_data(Value::Object(Map::new()))
    }

    pub fn with_data(root: Value) -> Self {
        let mut root = match root {
            Value::Object(_) => root,
            _ => Value::Object(Map::new()),
        };
        prune(&mut root);
        Self {
            inner: Mutex::new(Tree { root, next_key: 0 }),
        }
    }

    /// Copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.inner.lock().root.clone()
    }
}

fn lookup<'a>(root: &'a Value, parts: &[&str]) -> Option<&'a Value> {
    parts.iter().try_fold(root, |node, part| node.get(*part))
}

/// Run `apply` on the object at `parts`, turning anything missing or not an
/// object along the way into an empty object first.
fn with_object_at(node: &mut Value, parts: &[&str], apply: impl FnOnce(&mut Map<String, Value>)) {
    let mut map = match std::mem::take(node) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    match parts.split_first() {
        Some((first, rest)) => with_object_at(map.entry(first.to_string()).or_insert(Value::Null), rest, apply),
        None => apply(&mut map),
    }
    *node = Value::Object(map);
}

/// Drop nulls and empty objects, bottom up. Returns true when `value` itself
/// ended up empty.
fn prune(value: &mut Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => {
            map.retain(|_, child| !prune(child));
            map.is_empty()
        }
        _ => false,
    }
}

fn prune_root(root: &mut Value) {
    if prune(root) {
        *root = Value::Object(Map::new());
    }
}

#[async_trait]
impl JsonStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        let parts = segments(path)?;
        let tree = self.inner.lock();
        Ok(lookup(&tree.root, &parts).cloned().unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<String, StoreError> {
        let parts = segments(path)?;
        let mut tree = self.inner.lock();
        tree.next_key += 1;
        let key = format!("-{:016}", tree.next_key);
        with_object_at(&mut tree.root, &parts, |target| {
            target.insert(key.clone(), body.clone());
        });
        prune_root(&mut tree.root);
        Ok(key)
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<(), StoreError> {
        let parts = segments(path)?;
        let Value::Object(fields) = body else {
            return Err(StoreError::Unexpected(format!("PATCH body must be an object: {body}")));
        };
        let mut tree = self.inner.lock();
        with_object_at(&mut tree.root, &parts, |target| {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        });
        prune_root(&mut tree.root);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let parts = segments(path)?;
        let (last, parents) = parts.split_last().ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        let mut tree = self.inner.lock();
        let mut node = &mut tree.root;
        for part in parents {
            match node.get_mut(*part) {
                Some(child) => node = child,
                None => return Ok(()),
            }
        }
        if let Value::Object(map) = node {
            map.remove(*last);
        }
        prune_root(&mut tree.root);
        Ok(())
    }
}
