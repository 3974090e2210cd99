//! Document store layer
//!
//! Provides:
//! - The `DocumentStore` trait the pipeline reads through
//! - An in-memory store loaded from a JSON file
//! - A MySQL store over the extracted documents table

mod mysql;

pub use mysql::MySqlDocumentStore;

use crate::config::{StoreConfig, StoreKind};
use crate::errors::{AppError, Result};
use crate::models::Document;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Read-only access to property documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lookup by file id
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>>;

    /// Every document, for fuzzy matching
    async fn find_all_for_fuzzy_scan(&self) -> Result<Vec<Document>>;

    /// Documents whose owner name contains `name`, case-insensitively
    async fn find_by_owner_name(&self, name: &str) -> Result<Vec<Document>>;

    /// Up to `limit` documents whose content contains any keyword
    async fn find_by_keywords(&self, keywords: &[String], limit: usize) -> Result<Vec<Document>>;

    /// Documents for explicit ids, in first-seen order. Unknown and repeated
    /// ids are skipped.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = Vec::with_capacity(ids.len());
        for id in ids {
            if documents.iter().any(|d| d.id == id.trim()) {
                continue;
            }
            if let Some(doc) = self.find_by_id(id).await? {
                documents.push(doc);
            }
        }
        Ok(documents)
    }

    /// Check connectivity
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Documents held in memory, loaded once
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Vec<Document>,
}

impl MemoryDocumentStore {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Load a JSON array of documents
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Store {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let documents: Vec<Document> = serde_json::from_str(&raw)?;

        info!(path = %path.display(), documents = documents.len(), "Document file loaded");
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        let id = id.trim();
        Ok(self.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn find_all_for_fuzzy_scan(&self) -> Result<Vec<Document>> {
        Ok(self.documents.clone())
    }

    async fn find_by_owner_name(&self, name: &str) -> Result<Vec<Document>> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .documents
            .iter()
            .filter(|d| {
                d.owner_name
                    .as_deref()
                    .is_some_and(|owner| owner.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn find_by_keywords(&self, keywords: &[String], limit: usize) -> Result<Vec<Document>> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        Ok(self
            .documents
            .iter()
            .filter(|d| {
                let content = d.content.to_lowercase();
                keywords.iter().any(|k| content.contains(k.as_str()))
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Create the configured store
pub async fn create_document_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.kind {
        StoreKind::Json => {
            let path = config.path.as_deref().ok_or_else(|| AppError::Configuration {
                message: "store.path is required for the json store".to_string(),
            })?;
            Ok(Arc::new(MemoryDocumentStore::from_json_file(path)?))
        }
        StoreKind::Mysql => Ok(Arc::new(MySqlDocumentStore::connect(config).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn doc(id: &str, name: &str, owner: Option<&str>, content: &str) -> Document {
        Document {
            id: id.to_string(),
            property_name: name.to_string(),
            owner_name: owner.map(str::to_string),
            content: content.to_string(),
            images: Vec::new(),
        }
    }

    fn store() -> MemoryDocumentStore {
        MemoryDocumentStore::new(vec![
            doc("101", "Green Valley", Some("Ramesh Patel"), "Jantry Rate: 4500"),
            doc("102", "Lakeview", Some("Sita Shah"), "Market Value: 90 lakh"),
            doc("103", "Hilltop", None, "Jantry Rate: 3900"),
        ])
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let store = store();
        assert_eq!(store.find_by_id(" 102 ").await.unwrap().unwrap().property_name, "Lakeview");
        assert!(store.find_by_id("999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_owner_name() {
        let found = store().find_by_owner_name("patel").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "101");
    }

    #[tokio::test]
    async fn test_find_by_keywords_any_and_limit() {
        let store = store();
        let keywords = vec!["jantry".to_string(), "market".to_string()];
        assert_eq!(store.find_by_keywords(&keywords, 5).await.unwrap().len(), 3);
        assert_eq!(store.find_by_keywords(&keywords, 2).await.unwrap().len(), 2);
        assert!(store.find_by_keywords(&[], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_ids_keeps_order() {
        let ids = vec!["103".to_string(), "nope".to_string(), "101".to_string()];
        let found = store().find_by_ids(&ids).await.unwrap();
        let got: Vec<&str> = found.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(got, vec!["103", "101"]);
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_repeats() {
        let ids = vec!["101".to_string(), "101".to_string(), " 101 ".to_string()];
        let found = store().find_by_ids(&ids).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "101");
    }

    #[test]
    fn test_from_json_file_accepts_file_id() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"file_id":"10784","property_name":"Green Valley","content":"Owner: Ramesh"}}]"#
        )
        .unwrap();

        let store = MemoryDocumentStore::from_json_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_file_is_store_error() {
        let err = MemoryDocumentStore::from_json_file("/nonexistent/documents.json").unwrap_err();
        assert!(matches!(err, AppError::Store { .. }));
    }
}
