//! File-backed user store consulted only while the database is unreachable.
//!
//! The file is a single JSON document `{"users": [...]}`. Reads go straight
//! to disk so hand edits are picked up; writes are serialised by a mutex and
//! replace the file atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::types::Role;

#[derive(Debug, Error)]
pub enum FallbackStoreError {
    #[error("fallback store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fallback store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("email already registered: {0}")]
    DuplicateEmail(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FallbackFile {
    #[serde(default)]
    users: Vec<FallbackUser>,
}

pub struct FallbackUserStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FallbackUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<FallbackFile, FallbackStoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => Ok(FallbackFile::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FallbackFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, file: &FallbackFile) -> Result<(), FallbackStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(file)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<FallbackUser>, FallbackStoreError> {
        let file = self.load().await?;
        Ok(file.users.into_iter().find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    pub async fn insert(
        &self,
        name: &str,
        email: &str,
        role: Role,
        password_hash: &str,
    ) -> Result<FallbackUser, FallbackStoreError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;

        if file.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(FallbackStoreError::DuplicateEmail(email.to_string()));
        }

        let user = FallbackUser {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        file.users.push(user.clone());
        self.save(&file).await?;

        tracing::warn!("Registered {} in fallback user store {}", email, self.path.display());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackUserStore::new(dir.path().join("users.json"));
        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_then_find_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackUserStore::new(dir.path().join("nested").join("users.json"));

        let user = store.insert("Ada", "ada@example.com", Role::Customer, "$2b$04$hash").await.unwrap();
        let found = store.find_by_email("ADA@example.com").await.unwrap().unwrap();

        assert_eq!(found.id, user.id);
        assert_eq!(found.role, Role::Customer);
        assert!(!dir.path().join("nested").join("users.json.tmp").exists());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackUserStore::new(dir.path().join("users.json"));

        store.insert("Ada", "ada@example.com", Role::Customer, "h").await.unwrap();
        let err = store.insert("Ada 2", "Ada@Example.com", Role::Customer, "h").await.unwrap_err();
        assert!(matches!(err, FallbackStoreError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn reads_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"{"users":[{"id":"6f1c2b8e-1d7a-4c55-9f0e-0d6f0c9a1b2c","name":"Admin","email":"admin@example.com",
               "role":"admin","password_hash":"x","created_at":"2024-01-01T00:00:00Z"}]}"#,
        )
        .unwrap();

        let store = FallbackUserStore::new(&path);
        let admin = store.find_by_email("admin@example.com").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
