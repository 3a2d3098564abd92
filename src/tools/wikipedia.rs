//! Wikipedia lookup via the MediaWiki action API.

use super::{query_arg, Tool, MAX_QUERY_LENGTH};
use crate::config::WikipediaSettings;
use crate::error::{Result, WikiAgentError};
use crate::util::truncate_chars;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

const NO_RESULT: &str = "No good Wikipedia Search Result was found";

const DESCRIPTION: &str = "A wrapper around Wikipedia. Useful for when you need to answer general \
questions about people, places, companies, facts, historical events, or other subjects. \
Input should be a search query.";

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    info: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    error: Option<ApiError>,
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    error: Option<ApiError>,
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    missing: bool,
}

/// Searches Wikipedia and returns page intros.
pub struct WikipediaClient {
    client: reqwest::Client,
    api_url: String,
    top_k_results: usize,
    doc_content_chars_max: usize,
}

impl WikipediaClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::from_settings(&WikipediaSettings::default(), client)
    }

    pub fn from_settings(settings: &WikipediaSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: format!("https://{}.wikipedia.org/w/api.php", settings.lang),
            top_k_results: settings.top_k_results,
            doc_content_chars_max: settings.doc_content_chars_max,
        }
    }

    /// Point the client at another MediaWiki `api.php`.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    /// Look up `query` and render the top pages as `Page: ..\nSummary: ..` blocks.
    #[instrument(skip(self), fields(top_k = self.top_k_results))]
    pub async fn run(&self, query: &str) -> Result<String> {
        let query = truncate_chars(query, MAX_QUERY_LENGTH);
        let titles = self.search(&query).await?;
        debug!("Wikipedia search returned {} titles", titles.len());

        let mut summaries = Vec::new();
        for title in titles.iter().take(self.top_k_results) {
            if let Some(page) = self.fetch_intro(title).await? {
                summaries.push(page);
            }
        }

        if summaries.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        Ok(truncate_chars(
            &summaries.join("\n\n"),
            self.doc_content_chars_max,
        ))
    }

    async fn search(&self, query: &str) -> Result<Vec<String>> {
        let limit = self.top_k_results.to_string();
        let response: SearchResponse = self
            .get(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("srprop", ""),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .await?;

        if let Some(err) = response.error {
            return Err(api_error(err));
        }

        Ok(response
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    async fn fetch_intro(&self, title: &str) -> Result<Option<String>> {
        let response: ExtractResponse = self
            .get(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .await?;

        if let Some(err) = response.error {
            return Err(api_error(err));
        }

        let page = response
            .query
            .and_then(|q| q.pages.into_iter().next())
            .filter(|p| !p.missing);

        Ok(page.and_then(|p| {
            let extract = p.extract.unwrap_or_default();
            let extract = extract.trim();
            if extract.is_empty() {
                None
            } else {
                Some(format!("Page: {}\nSummary: {}", p.title, extract))
            }
        }))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let url = url::Url::parse_with_params(&self.api_url, params)
            .map_err(|e| WikiAgentError::tool("wikipedia", format!("Bad API URL: {}", e)))?;

        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| WikiAgentError::tool("wikipedia", e.to_string()))?;

        Ok(response.json().await?)
    }
}

fn api_error(err: ApiError) -> WikiAgentError {
    WikiAgentError::tool("wikipedia", format!("{}: {}", err.code, err.info))
}

/// The `wikipedia` tool.
pub struct WikipediaTool {
    client: WikipediaClient,
}

impl WikipediaTool {
    pub fn new(client: WikipediaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    async fn call(&self, args: Value) -> Result<String> {
        let query = query_arg(self.name(), &args)?;
        self.client.run(&query).await
    }
}
