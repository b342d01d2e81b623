//! Mock SearchIndex implementation for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{LogDocument, SearchError, SearchIndex};

/// Mock index that stores documents in memory.
pub struct MockSearchIndex {
    documents: RwLock<Vec<LogDocument>>,
    available: RwLock<bool>,
    fail_on_upsert: RwLock<bool>,
}

impl Default for MockSearchIndex {
    fn default() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            available: RwLock::new(true),
            fail_on_upsert: RwLock::new(false),
        }
    }
}

impl MockSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the liveness probe result.
    pub async fn set_available(&self, available: bool) {
        *self.available.write().await = available;
    }

    /// Make every subsequent `upsert` fail.
    pub async fn set_fail_on_upsert(&self, fail: bool) {
        *self.fail_on_upsert.write().await = fail;
    }

    /// Snapshot of every indexed document.
    pub async fn dump(&self) -> Vec<LogDocument> {
        self.documents.read().await.clone()
    }
}

#[async_trait]
impl SearchIndex for MockSearchIndex {
    async fn is_available(&self) -> bool {
        *self.available.read().await
    }

    async fn upsert(&self, document: &LogDocument) -> Result<(), SearchError> {
        if *self.fail_on_upsert.read().await {
            return Err(SearchError::Rejected {
                status: 503,
                body: "mock index failure".to_string(),
            });
        }

        let mut documents = self.documents.write().await;
        // Idempotent by id: replace an existing document in place.
        if let Some(id) = &document.id {
            if let Some(existing) = documents
                .iter_mut()
                .find(|d| d.id.as_deref() == Some(id.as_str()))
            {
                *existing = document.clone();
                return Ok(());
            }
        }
        documents.push(document.clone());
        Ok(())
    }
}
