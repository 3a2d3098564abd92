//! Arxiv lookup via the export API (Atom feed).

use super::{query_arg, Tool, MAX_QUERY_LENGTH};
use crate::config::ArxivSettings;
use crate::error::{Result, WikiAgentError};
use crate::util::{squash_whitespace, truncate_chars};
use async_trait::async_trait;
use chrono::DateTime;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

const NO_RESULT: &str = "No good Arxiv Result was found";

const DESCRIPTION: &str = "A wrapper around Arxiv.org. Useful for when you need to answer questions \
about Physics, Mathematics, Computer Science, Quantitative Biology, Quantitative Finance, \
Statistics, Electrical Engineering, and Economics from scientific articles on arxiv.org. \
Input should be a search query.";

/// One parsed feed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ArxivEntry {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    /// `YYYY-MM-DD` of the last update.
    pub updated: String,
}

impl ArxivEntry {
    fn render(&self) -> String {
        format!(
            "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
            self.updated,
            self.title,
            self.authors.join(", "),
            self.summary
        )
    }
}

/// Searches arxiv.org and returns paper abstracts.
pub struct ArxivClient {
    client: reqwest::Client,
    api_url: String,
    top_k_results: usize,
    doc_content_chars_max: usize,
    identifier: Regex,
    entry: Regex,
    id: Regex,
    title: Regex,
    summary: Regex,
    updated: Regex,
    author: Regex,
}

impl ArxivClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::from_settings(&ArxivSettings::default(), client)
    }

    pub fn from_settings(settings: &ArxivSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: settings.base_url.clone(),
            top_k_results: settings.top_k_results,
            doc_content_chars_max: settings.doc_content_chars_max,
            // New-style (2101.00001v2) and old-style (hep-th/9901001) identifiers
            identifier: Regex::new(
                r"^(?:arXiv:)?(?:\d{2}(?:0[1-9]|1[0-2])\.\d{4,5}|[a-z\-]+(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?$",
            )
            .expect("Invalid regex"),
            entry: Regex::new(r"(?s)<entry>(.*?)</entry>").expect("Invalid regex"),
            id: Regex::new(r"(?s)<id>(.*?)</id>").expect("Invalid regex"),
            title: Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("Invalid regex"),
            summary: Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").expect("Invalid regex"),
            updated: Regex::new(r"(?s)<updated>(.*?)</updated>").expect("Invalid regex"),
            author: Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").expect("Invalid regex"),
        }
    }

    /// Point the client at another export API endpoint.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    /// Whether every whitespace-separated token is an arXiv identifier.
    pub fn is_identifier_query(&self, query: &str) -> bool {
        let mut tokens = query.split_whitespace().peekable();
        tokens.peek().is_some() && tokens.all(|t| self.identifier.is_match(t))
    }

    /// Search (or fetch by id) and render the top entries.
    #[instrument(skip(self), fields(top_k = self.top_k_results))]
    pub async fn run(&self, query: &str) -> Result<String> {
        let entries = self.search(query).await?;
        debug!("Arxiv returned {} entries", entries.len());

        if entries.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        let rendered = entries
            .iter()
            .take(self.top_k_results)
            .map(ArxivEntry::render)
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(truncate_chars(&rendered, self.doc_content_chars_max))
    }

    /// Query the API and parse the feed.
    pub async fn search(&self, query: &str) -> Result<Vec<ArxivEntry>> {
        let max_results = self.top_k_results.to_string();
        let query = truncate_chars(query, MAX_QUERY_LENGTH);
        let id_list;
        let mut params: Vec<(&str, &str)> = vec![("max_results", max_results.as_str())];

        if self.is_identifier_query(&query) {
            id_list = query
                .split_whitespace()
                .map(|t| t.trim_start_matches("arXiv:"))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("id_list", id_list.as_str()));
        } else {
            params.push(("search_query", query.as_str()));
        }

        let url = url::Url::parse_with_params(&self.api_url, &params)
            .map_err(|e| WikiAgentError::tool("arxiv", format!("Bad API URL: {}", e)))?;

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| WikiAgentError::tool("arxiv", e.to_string()))?
            .text()
            .await?;

        self.parse_feed(&body)
    }

    /// Parse an Atom feed into entries.
    ///
    /// The API reports bad queries as a single entry whose id points at
    /// `/api/errors`; that entry is surfaced as an error.
    pub fn parse_feed(&self, feed: &str) -> Result<Vec<ArxivEntry>> {
        let mut entries = Vec::new();

        for caps in self.entry.captures_iter(feed) {
            let body = &caps[1];
            let id = self.field(&self.id, body);

            if id.contains("/api/errors") {
                let reason = self.field(&self.summary, body);
                return Err(WikiAgentError::tool("arxiv", reason));
            }

            let updated = self.field(&self.updated, body);
            let updated = DateTime::parse_from_rfc3339(&updated)
                .map(|dt| dt.date_naive().to_string())
                .unwrap_or(updated);

            entries.push(ArxivEntry {
                id,
                title: self.field(&self.title, body),
                authors: self
                    .author
                    .captures_iter(body)
                    .map(|c| clean_text(&c[1]))
                    .collect(),
                summary: self.field(&self.summary, body),
                updated,
            });
        }

        Ok(entries)
    }

    fn field(&self, pattern: &Regex, body: &str) -> String {
        pattern
            .captures(body)
            .map(|c| clean_text(&c[1]))
            .unwrap_or_default()
    }
}

fn clean_text(raw: &str) -> String {
    squash_whitespace(&html_escape::decode_html_entities(raw))
}

/// The `arxiv` tool.
pub struct ArxivTool {
    client: ArxivClient,
}

impl ArxivTool {
    pub fn new(client: ArxivClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ArxivTool {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    async fn call(&self, args: Value) -> Result<String> {
        let query = query_arg(self.name(), &args)?;
        self.client.run(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:attention</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <updated>2024-01-01T00:00:00-05:00</updated>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T00:41:18Z</updated>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All You
  Need</title>
    <summary>  The dominant sequence transduction models are based on complex
recurrent &amp; convolutional neural networks.
</summary>
    <author>
      <name>Ashish Vaswani</name>
    </author>
    <author>
      <name>Noam Shazeer</name>
    </author>
  </entry>
</feed>"#;

    const ERROR_FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_9999.99999</id>
    <title>Error</title>
    <summary>incorrect id format for 9999.99999</summary>
    <updated>2024-01-01T00:00:00-05:00</updated>
  </entry>
</feed>"#;

    fn client() -> ArxivClient {
        ArxivClient::new(reqwest::Client::new())
    }

    #[test]
    fn test_identifier_detection() {
        let c = client();
        assert!(c.is_identifier_query("1706.03762"));
        assert!(c.is_identifier_query("1706.03762v7 2101.00001"));
        assert!(c.is_identifier_query("hep-th/9901001"));
        assert!(c.is_identifier_query("arXiv:1706.03762"));
        assert!(!c.is_identifier_query("attention is all you need"));
        assert!(!c.is_identifier_query("1706.03762 transformers"));
        assert!(!c.is_identifier_query(""));
    }

    #[test]
    fn test_parse_feed() {
        let entries = client().parse_feed(FEED).unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.id, "http://arxiv.org/abs/1706.03762v7");
        assert_eq!(entry.title, "Attention Is All You Need");
        assert_eq!(entry.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(entry.updated, "2023-08-02");
        assert!(entry.summary.starts_with("The dominant sequence"));
        assert!(entry.summary.contains("recurrent & convolutional"));
    }

    #[test]
    fn test_parse_error_feed() {
        let err = client().parse_feed(ERROR_FEED).unwrap_err();
        assert!(err.to_string().contains("incorrect id format"));
    }

    #[test]
    fn test_render_entry() {
        let entries = client().parse_feed(FEED).unwrap();
        let rendered = entries[0].render();
        assert!(rendered.starts_with(
            "Published: 2023-08-02\nTitle: Attention Is All You Need\nAuthors: Ashish Vaswani, Noam Shazeer\nSummary: "
        ));
    }

    #[tokio::test]
    async fn test_run_search_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "attention".into()),
                Matcher::UrlEncoded("max_results".into(), "1".into()),
            ]))
            .with_header("content-type", "application/atom+xml")
            .with_body(FEED)
            .create_async()
            .await;

        let client = client().with_api_url(&format!("{}/api/query", server.url()));
        let out = client.run("attention").await.unwrap();

        assert!(out.chars().count() <= 300);
        assert!(out.starts_with("Published: 2023-08-02\nTitle: Attention Is All You Need"));
        assert!(out.contains("Authors: Ashish Vaswani, Noam Shazeer"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_id_list() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("id_list".into(), "1706.03762".into()))
            .with_body(FEED)
            .create_async()
            .await;

        let client = client().with_api_url(&format!("{}/api/query", server.url()));
        client.run("1706.03762").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_id_list_is_cut_to_query_limit() {
        // 3 + 27 * 11 = 300 characters, so exactly 27 identifiers survive
        let query = format!("   {}", "1706.03762 ".repeat(40));
        let expected = vec!["1706.03762"; 27].join(",");

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("id_list".into(), expected))
            .with_body(FEED)
            .create_async()
            .await;

        let client = client().with_api_url(&format!("{}/api/query", server.url()));
        client.run(&query).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_no_results() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_body(r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#)
            .create_async()
            .await;

        let client = client().with_api_url(&format!("{}/api/query", server.url()));
        assert_eq!(client.run("zzzxq").await.unwrap(), NO_RESULT);
    }

    #[tokio::test]
    async fn test_http_failure_is_tool_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = client().with_api_url(&format!("{}/api/query", server.url()));
        let err = client.run("attention").await.unwrap_err();
        assert!(matches!(err, WikiAgentError::Tool { .. }));
    }
}
