//! Movie collection lookups against the movie metadata API.

use crate::api::ApiClient;
use crate::model::movie::MovieCollection;
use crate::repo::RepoResult;
use async_trait::async_trait;

/// Language requested for titles and overviews.
pub const DEFAULT_LANGUAGE: &str = "en-US";

#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Fetches one collection; `parts` keeps API order.
    async fn collection(&self, collection_id: u64) -> RepoResult<MovieCollection>;
}

/// `MovieCatalog` over `GET collection/{id}`.
#[derive(Debug, Clone)]
pub struct HttpMovieCatalog {
    client: ApiClient,
    language: String,
}

impl HttpMovieCatalog {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[async_trait]
impl MovieCatalog for HttpMovieCatalog {
    async fn collection(&self, collection_id: u64) -> RepoResult<MovieCollection> {
        let id = collection_id.to_string();
        Ok(self
            .client
            .get_json(
                &["collection", id.as_str()],
                &[("language", self.language.as_str())],
            )
            .await?)
    }
}
