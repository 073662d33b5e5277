//! Blob store backends.
//!
//! Every record the system produces is an immutable JSON blob keyed by a
//! `/`-separated path. The store is deliberately narrow: read a blob, write
//! a blob, list paths under a prefix. Aggregation never depends on a write
//! succeeding to produce its in-memory results.

use crate::config::StoreConfig;
use crate::error::{BotevalError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use walkdir::WalkDir;

/// Narrow interface to a path-keyed blob store.
#[allow(async_fn_in_trait)]
pub trait BlobStore {
    /// Read the blob at `path`. `NotFound` when no blob exists there.
    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Write a blob at `path`, replacing any previous content.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// All blob paths starting with `prefix`, sorted ascending.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Hub-hosted dataset repository accessed over HTTP.
///
/// Speaks the Hugging-Face-Hub dataset API: the tree endpoint for listing,
/// the resolve endpoint for downloads, and the NDJSON commit endpoint for
/// uploads. A token is only needed for uploads and private repositories.
#[derive(Clone)]
pub struct HubStore {
    client: Client,
    config: StoreConfig,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
}

impl HubStore {
    /// Create a new store client for the configured repository.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn base(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    /// Download URL for one blob.
    fn resolve_url(&self, path: &str) -> String {
        format!(
            "{}/datasets/{}/resolve/{}/{}",
            self.base(),
            self.config.repo_id,
            self.config.revision,
            path
        )
    }

    /// Recursive listing URL for the whole repository.
    fn tree_url(&self) -> String {
        format!(
            "{}/api/datasets/{}/tree/{}?recursive=true",
            self.base(),
            self.config.repo_id,
            self.config.revision
        )
    }

    /// Commit URL for uploads.
    fn commit_url(&self) -> String {
        format!(
            "{}/api/datasets/{}/commit/{}",
            self.base(),
            self.config.repo_id,
            self.config.revision
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.token.is_empty() {
            request
        } else {
            request.header("Authorization", format!("Bearer {}", self.config.token))
        }
    }

    /// Probe the repository: a successful listing means endpoint, repo id,
    /// revision, and token all line up.
    pub async fn check(&self) -> Result<usize> {
        let paths = self.list("").await?;
        Ok(paths.len())
    }
}

impl BlobStore for HubStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let response = self
            .authorize(self.client.get(self.resolve_url(path)))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BotevalError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(BotevalError::Store {
                path: path.to_string(),
                message: format!("download failed with HTTP {}", status),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        // The commit endpoint takes NDJSON: a header operation followed by
        // one file operation per uploaded blob.
        let header = json!({
            "key": "header",
            "value": {"summary": format!("Add {}", path), "description": ""}
        });
        let file = json!({
            "key": "file",
            "value": {
                "path": path,
                "content": BASE64.encode(bytes),
                "encoding": "base64"
            }
        });
        let body = format!("{}\n{}\n", header, file);

        let response = self
            .authorize(self.client.post(self.commit_url()))
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BotevalError::Store {
                path: path.to_string(),
                message: format!("commit failed with HTTP {}: {}", status, detail),
            });
        }

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let response = self
            .authorize(self.client.get(self.tree_url()))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BotevalError::NotFound(self.config.repo_id.clone()));
        }
        if !status.is_success() {
            return Err(BotevalError::Store {
                path: prefix.to_string(),
                message: format!("listing failed with HTTP {}", status),
            });
        }

        let entries: Vec<TreeEntry> = response.json().await?;
        let mut paths: Vec<String> = entries
            .into_iter()
            .filter(|e| e.kind == "file" && e.path.starts_with(prefix))
            .map(|e| e.path)
            .collect();
        paths.sort();
        Ok(paths)
    }
}

/// Local directory backend. Blob paths map to files under a root directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl BlobStore for FsStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.file_path(path);
        match std::fs::read(&file) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BotevalError::NotFound(path.to_string()))
            }
            Err(e) => Err(BotevalError::io(file, e)),
        }
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let file = self.file_path(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BotevalError::io(parent, e))?;
        }
        std::fs::write(&file, bytes).map_err(|e| BotevalError::io(file, e))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut paths = Vec::new();

        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            // Keys are /-separated regardless of platform.
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                paths.push(key);
            }
        }

        paths.sort();
        Ok(paths)
    }
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob synchronously.
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs.lock().unwrap().insert(path.into(), bytes.into());
    }
}

impl BlobStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| BotevalError::NotFound(path.to_string()))
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.insert(path, bytes);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn hub(endpoint: &str) -> HubStore {
        HubStore::new(StoreConfig {
            endpoint: endpoint.to_string(),
            repo_id: "org/records".to_string(),
            revision: "main".to_string(),
            token: String::new(),
        })
    }

    #[test]
    fn test_hub_urls() {
        let store = hub("https://huggingface.co");
        assert_eq!(
            store.resolve_url("compare/run1.json"),
            "https://huggingface.co/datasets/org/records/resolve/main/compare/run1.json"
        );
        assert_eq!(
            store.tree_url(),
            "https://huggingface.co/api/datasets/org/records/tree/main?recursive=true"
        );
        assert_eq!(
            store.commit_url(),
            "https://huggingface.co/api/datasets/org/records/commit/main"
        );

        // Trailing slash on the endpoint does not double up.
        let store = hub("https://huggingface.co/");
        assert_eq!(
            store.resolve_url("questions.json"),
            "https://huggingface.co/datasets/org/records/resolve/main/questions.json"
        );
    }

    #[tokio::test]
    async fn test_fs_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());

        store.put("gather/sub-1.json", b"{}").await.unwrap();
        let bytes = store.get("gather/sub-1.json").await.unwrap();
        assert_eq!(bytes, b"{}");
    }

    #[tokio::test]
    async fn test_fs_store_missing_blob() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());

        let err = store.get("nope.json").await.unwrap_err();
        assert!(matches!(err, BotevalError::NotFound(ref p) if p == "nope.json"));
    }

    #[tokio::test]
    async fn test_fs_store_prefix_listing_sorted() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());

        store.put("compare/b.json", b"{}").await.unwrap();
        store.put("compare/a.json", b"{}").await.unwrap();
        store.put("gather/c.json", b"{}").await.unwrap();

        let paths = store.list("compare/").await.unwrap();
        assert_eq!(paths, vec!["compare/a.json", "compare/b.json"]);

        let all = store.list("").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        store.insert("annotate/x.json", b"{}".to_vec());

        assert_eq!(store.get("annotate/x.json").await.unwrap(), b"{}");
        assert!(store.get("annotate/y.json").await.is_err());
        assert_eq!(store.list("annotate/").await.unwrap().len(), 1);
        assert!(store.list("gather/").await.unwrap().is_empty());
    }
}
