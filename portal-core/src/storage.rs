use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{application::Application, error::Result, role::Role};

/// Persisted proof that a role passed the OTP challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub identifier: String,
    pub role: Role,
    /// Epoch millis at which the OTP was verified.
    pub issued_at: i64,
}

impl SessionRecord {
    pub fn new(identifier: impl Into<String>, role: Role, issued_at: i64) -> Self {
        Self {
            identifier: identifier.into(),
            role,
            issued_at,
        }
    }

    /// A record is valid strictly before `ttl_millis` has elapsed.
    pub fn is_valid_at(&self, now_millis: i64, ttl_millis: i64) -> bool {
        now_millis.saturating_sub(self.issued_at) < ttl_millis
    }
}

/// Trait for storing and retrieving session records, one per role
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, role: Role) -> Result<Option<SessionRecord>>;
    async fn put(&self, role: Role, record: SessionRecord) -> Result<()>;
    async fn clear(&self, role: Role) -> Result<()>;
}

/// Trait for storing and retrieving application records
#[async_trait]
pub trait ApplicationStorage: Send + Sync {
    async fn save(&self, application: Application) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Application>>;
    async fn list(&self) -> Result<Vec<Application>>;
    async fn count(&self) -> Result<usize>;
}

/// In-memory implementation of SessionStore
#[derive(Default)]
pub struct InMemorySessionStore {
    records: Arc<DashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, role: Role) -> Result<Option<SessionRecord>> {
        Ok(self
            .records
            .get(&role.storage_key())
            .map(|entry| entry.clone()))
    }

    async fn put(&self, role: Role, record: SessionRecord) -> Result<()> {
        self.records.insert(role.storage_key(), record);
        Ok(())
    }

    async fn clear(&self, role: Role) -> Result<()> {
        self.records.remove(&role.storage_key());
        Ok(())
    }
}

/// Durable key/value store kept as one JSON object on disk.
///
/// Keys are [`Role::storage_key`], so records for different roles live side
/// by side. A missing file reads as an empty store.
pub struct FileSessionStore {
    path: PathBuf,
    // serializes read-modify-write of the file
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, SessionRecord>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, records: &BTreeMap<String, SessionRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let raw = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, role: Role) -> Result<Option<SessionRecord>> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        Ok(records.remove(&role.storage_key()))
    }

    async fn put(&self, role: Role, record: SessionRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.insert(role.storage_key(), record);
        self.store(&records).await
    }

    async fn clear(&self, role: Role) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.remove(&role.storage_key()).is_some() {
            self.store(&records).await?;
        }
        Ok(())
    }
}

/// In-memory implementation of ApplicationStorage
#[derive(Default)]
pub struct InMemoryApplicationStorage {
    applications: Arc<DashMap<String, Application>>,
}

impl InMemoryApplicationStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_applications(applications: impl IntoIterator<Item = Application>) -> Self {
        let storage = Self::new();
        for application in applications {
            storage
                .applications
                .insert(application.id.clone(), application);
        }
        storage
    }
}

#[async_trait]
impl ApplicationStorage for InMemoryApplicationStorage {
    async fn save(&self, application: Application) -> Result<()> {
        self.applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Application>> {
        Ok(self.applications.get(id).map(|entry| entry.clone()))
    }

    async fn list(&self) -> Result<Vec<Application>> {
        let mut all: Vec<Application> = self
            .applications
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.applications.len())
    }
}
