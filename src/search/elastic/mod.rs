//! Elasticsearch adapter over the REST API.
//!
//! Documents land in one index per day (`{prefix}-YYYY-MM-DD`) under the
//! event id, so redelivered events overwrite rather than duplicate.
//! `_cluster/health` serves as the liveness probe.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use tracing::{debug, error, info, warn};

use super::{LogDocument, SearchConfig, SearchError, SearchIndex};

/// Elasticsearch-backed search index.
pub struct ElasticSearchIndex {
    client: Client,
    config: SearchConfig,
}

impl ElasticSearchIndex {
    /// Create a new index client. Does not contact the server; availability
    /// is probed per operation.
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!(url = %config.url, index_prefix = %config.index_prefix, "search index client ready");

        Ok(Self { client, config })
    }

    /// Index name for a given day.
    fn index_for(&self, date: NaiveDate) -> String {
        format!("{}-{}", self.config.index_prefix, date.format("%Y-%m-%d"))
    }

    fn document_url(&self, document: &LogDocument) -> String {
        let index = self.index_for(Utc::now().date_naive());
        match &document.id {
            Some(id) => format!("{}/{}/_doc/{}", self.config.url, index, id),
            // No id: let the index assign one.
            None => format!("{}/{}/_doc", self.config.url, index),
        }
    }
}

#[async_trait]
impl SearchIndex for ElasticSearchIndex {
    async fn is_available(&self) -> bool {
        let url = format!("{}/_cluster/health", self.config.url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "search index not available");
                false
            }
        }
    }

    async fn upsert(&self, document: &LogDocument) -> Result<(), SearchError> {
        let url = self.document_url(document);

        let request = match document.id {
            Some(_) => self.client.put(&url),
            None => self.client.post(&url),
        };

        let response = request.json(document).send().await?;
        let status = response.status();

        if status.is_success() {
            debug!(id = ?document.id, "document indexed");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(
                id = ?document.id,
                status = %status,
                "failed to index document"
            );
            Err(SearchError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> ElasticSearchIndex {
        ElasticSearchIndex::new(SearchConfig::default()).unwrap()
    }

    #[test]
    fn test_index_name_per_day() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(index().index_for(date), "logs-2024-05-01");
    }

    #[test]
    fn test_document_url_with_id() {
        let doc = LogDocument {
            id: Some("abc-123".to_string()),
            timestamp: Utc::now(),
            service: None,
            level: None,
            message: None,
            host: None,
            metadata: Default::default(),
        };
        let url = index().document_url(&doc);
        assert!(url.starts_with("http://localhost:9200/logs-"));
        assert!(url.ends_with("/_doc/abc-123"));
    }

    #[test]
    fn test_document_url_without_id() {
        let doc = LogDocument {
            id: None,
            timestamp: Utc::now(),
            service: None,
            level: None,
            message: None,
            host: None,
            metadata: Default::default(),
        };
        assert!(index().document_url(&doc).ends_with("/_doc"));
    }
}
