//! Crossref title search.
//!
//! [`CrossrefLookup`] queries the Crossref works endpoint with an article
//! title and accepts the most relevant hit only if its title matches.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::http_client::build_lookup_client;
use super::{DoiLookup, LookupError, titles_match};

/// Default Crossref API base URL.
const DEFAULT_BASE_URL: &str = "https://api.crossref.org";

/// Default minimum similarity, in percent, for fuzzy title matches.
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 97;

// ==================== Crossref API Response Types ====================

/// Top-level Crossref works search response.
#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    status: String,
    message: CrossrefMessage,
}

#[derive(Debug, Deserialize)]
struct CrossrefMessage {
    #[serde(default)]
    items: Vec<CrossrefWork>,
}

/// One search hit, restricted to the selected fields.
#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(rename = "DOI")]
    doi: String,
    #[serde(default)]
    title: Vec<String>,
}

// ==================== CrossrefLookup ====================

/// Looks up DOIs by title through the Crossref REST API.
///
/// # Polite Pool
///
/// When a contact address is configured, requests carry a `mailto` query
/// parameter to access Crossref's polite pool.
pub struct CrossrefLookup {
    client: Client,
    base_url: String,
    mailto: Option<String>,
    fuzzy_threshold: u8,
}

impl CrossrefLookup {
    /// Creates a lookup against the public Crossref API.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if `mailto` contains control characters or the
    /// HTTP client cannot be built.
    #[tracing::instrument(skip_all, fields(mailto = ?mailto))]
    pub fn new(mailto: Option<String>, timeout: Duration) -> Result<Self, LookupError> {
        Self::build(mailto, timeout, DEFAULT_BASE_URL.to_string())
    }

    /// Creates a lookup with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if `mailto` contains control characters or the
    /// HTTP client cannot be built.
    #[tracing::instrument(skip_all, fields(mailto = ?mailto))]
    pub fn with_base_url(
        mailto: Option<String>,
        timeout: Duration,
        base_url: impl Into<String>,
    ) -> Result<Self, LookupError> {
        Self::build(mailto, timeout, base_url.into())
    }

    /// Sets the minimum similarity, in percent, for fuzzy matches.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidThreshold`] above 100.
    pub fn with_fuzzy_threshold(mut self, threshold: u8) -> Result<Self, LookupError> {
        if threshold > 100 {
            return Err(LookupError::InvalidThreshold { threshold });
        }
        self.fuzzy_threshold = threshold;
        Ok(self)
    }

    fn build(mailto: Option<String>, timeout: Duration, base_url: String) -> Result<Self, LookupError> {
        let mailto = mailto
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        if let Some(value) = &mailto
            && value.chars().any(char::is_control)
        {
            return Err(LookupError::InvalidMailto {
                mailto: value.clone(),
            });
        }
        Ok(Self {
            client: build_lookup_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            mailto,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        })
    }

    fn search_url(&self, title: &str) -> String {
        let mut url = format!(
            "{}/works?query.bibliographic={}&select=DOI,title&sort=relevance&order=desc&rows=1",
            self.base_url,
            urlencoding::encode(title)
        );
        if let Some(mailto) = &self.mailto {
            url.push_str("&mailto=");
            url.push_str(&urlencoding::encode(mailto));
        }
        url
    }

    async fn best_hit(&self, title: &str) -> Option<CrossrefWork> {
        let url = self.search_url(title);
        debug!(api_url = %url, "Calling Crossref API");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "Crossref API request failed");
                return None;
            }
        };

        if let Some(limit) = response.headers().get("x-rate-limit-limit") {
            debug!(rate_limit = ?limit, "Crossref rate limit");
        }

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "Crossref API error");
            return None;
        }

        let body = match response.json::<CrossrefResponse>().await {
            Ok(body) => body,
            Err(error) => {
                warn!(%error, "Failed to parse Crossref response JSON");
                return None;
            }
        };
        if !body.status.eq_ignore_ascii_case("ok") {
            warn!(status = %body.status, "Crossref response status was not ok");
            return None;
        }
        body.message.items.into_iter().next()
    }
}

impl std::fmt::Debug for CrossrefLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossrefLookup")
            .field("base_url", &self.base_url)
            .field("mailto", &self.mailto)
            .field("fuzzy_threshold", &self.fuzzy_threshold)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DoiLookup for CrossrefLookup {
    #[tracing::instrument(skip(self, title), fields(title_len = title.len()))]
    async fn lookup_doi(&self, title: &str, fuzzy: bool) -> Option<String> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let hit = self.best_hit(title).await?;
        let Some(found) = hit.title.first() else {
            debug!(doi = %hit.doi, "best hit has no title");
            return None;
        };
        if titles_match(found, title, fuzzy, self.fuzzy_threshold) {
            debug!(doi = %hit.doi, "title matched");
            Some(format!("doi:{}", hit.doi))
        } else {
            debug!(found = %found, "best hit title does not match");
            None
        }
    }
}
