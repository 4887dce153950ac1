//! Wikipedia encyclopedia source.
//!
//! `search` uses the MediaWiki action API (`list=search`), `fetch` uses the
//! REST summary endpoint. A summary of type `disambiguation` is reported as
//! [`KnowledgeError::Ambiguous`] carrying the page's article links.

use std::time::Duration;

use async_trait::async_trait;
use routewise_core::error::KnowledgeError;
use routewise_core::knowledge::EncyclopediaSource;
use serde::Deserialize;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("routewise/", env!("CARGO_PKG_VERSION"));
const MAX_CANDIDATES: usize = 10;

pub struct WikipediaSource {
    name: String,
    api_url: String,
    rest_url: String,
    sentences: usize,
    client: reqwest::Client,
}

impl WikipediaSource {
    /// A source for one language edition (e.g. "en").
    pub fn new(name: impl Into<String>, language: &str) -> Self {
        Self::with_endpoints(
            name,
            format!("https://{language}.wikipedia.org/w/api.php"),
            format!("https://{language}.wikipedia.org/api/rest_v1"),
        )
    }

    /// A source against explicit action-API and REST base URLs.
    pub fn with_endpoints(
        name: impl Into<String>,
        api_url: impl Into<String>,
        rest_url: impl Into<String>,
    ) -> Self {
        let rest_url: String = rest_url.into();
        Self {
            name: name.into(),
            api_url: api_url.into(),
            rest_url: rest_url.trim_end_matches('/').to_string(),
            sentences: 3,
            client: build_client(Duration::from_secs(10)),
        }
    }

    /// Transport timeout. The fusion engine applies its own cap on top.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    /// Number of leading sentences kept from each summary.
    pub fn with_sentences(mut self, sentences: usize) -> Self {
        self.sentences = sentences.max(1);
        self
    }

    fn unavailable(&self, reason: impl ToString) -> KnowledgeError {
        KnowledgeError::Unavailable {
            source_name: self.name.clone(),
            reason: reason.to_string(),
        }
    }

    fn summary_url(&self, title: &str) -> Result<reqwest::Url, KnowledgeError> {
        let mut url = reqwest::Url::parse(&format!("{}/page/summary", self.rest_url))
            .map_err(|e| self.unavailable(e))?;
        url.path_segments_mut()
            .map_err(|_| self.unavailable("REST base URL cannot carry a path"))?
            .push(&title.replace(' ', "_"));
        Ok(url)
    }

    async fn get_json(&self, request: reqwest::RequestBuilder) -> Result<serde_json::Value, KnowledgeError> {
        let response = request.send().await.map_err(|e| self.unavailable(e))?;
        if !response.status().is_success() {
            return Err(self.unavailable(format!("HTTP {}", response.status())));
        }
        response
            .json()
            .await
            .map_err(|e| KnowledgeError::InvalidResponse(e.to_string()))
    }

    async fn disambiguation_links(&self, title: &str) -> Result<Vec<String>, KnowledgeError> {
        let limit = MAX_CANDIDATES.to_string();
        let body = self
            .get_json(self.client.get(&self.api_url).query(&[
                ("action", "query"),
                ("prop", "links"),
                ("titles", title),
                ("plnamespace", "0"),
                ("pllimit", limit.as_str()),
                ("format", "json"),
            ]))
            .await?;
        Ok(parse_links(&body))
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

#[async_trait]
impl EncyclopediaSource for WikipediaSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, KnowledgeError> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let limit_param = limit.to_string();
        let body = self
            .get_json(self.client.get(&self.api_url).query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit_param.as_str()),
                ("format", "json"),
            ]))
            .await?;

        let mut titles = parse_search(&body);
        titles.truncate(limit);
        debug!(source = %self.name, hits = titles.len(), "Wikipedia search");
        Ok(titles)
    }

    async fn fetch(&self, label: &str) -> Result<String, KnowledgeError> {
        let url = self.summary_url(label)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        match response.status().as_u16() {
            200 => {}
            404 => return Err(KnowledgeError::NoMatch(label.to_string())),
            status => return Err(self.unavailable(format!("HTTP {status}"))),
        }

        let summary: Summary = response
            .json()
            .await
            .map_err(|e| KnowledgeError::InvalidResponse(e.to_string()))?;

        if summary.kind == "disambiguation" {
            let candidates = self.disambiguation_links(&summary.title).await?;
            return Err(KnowledgeError::Ambiguous {
                label: label.to_string(),
                candidates,
            });
        }

        let text = first_sentences(&summary.extract, self.sentences);
        if text.is_empty() {
            return Err(KnowledgeError::NoMatch(label.to_string()));
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
}

fn parse_search(body: &serde_json::Value) -> Vec<String> {
    body["query"]["search"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|h| h["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_links(body: &serde_json::Value) -> Vec<String> {
    let Some(pages) = body["query"]["pages"].as_object() else {
        return Vec::new();
    };
    pages
        .values()
        .filter_map(|page| page["links"].as_array())
        .flatten()
        .filter(|link| link["ns"].as_i64().unwrap_or(0) == 0)
        .filter_map(|link| link["title"].as_str().map(str::to_string))
        .take(MAX_CANDIDATES)
        .collect()
}

/// Leading `n` sentences of `text`, split on sentence-final punctuation
/// followed by whitespace.
fn first_sentences(text: &str, n: usize) -> String {
    let text = text.trim();
    let mut count = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            match chars.peek() {
                Some((_, next)) if next.is_whitespace() => {
                    count += 1;
                    if count == n {
                        return text[..=i].to_string();
                    }
                }
                _ => {}
            }
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_search_titles_in_order() {
        let body = json!({
            "batchcomplete": "",
            "query": {
                "searchinfo": {"totalhits": 2},
                "search": [
                    {"ns": 0, "title": "Concordia University", "pageid": 1},
                    {"ns": 0, "title": "Gina Cody School", "pageid": 2}
                ]
            }
        });
        assert_eq!(
            parse_search(&body),
            vec!["Concordia University", "Gina Cody School"]
        );
        assert!(parse_search(&json!({"error": "x"})).is_empty());
    }

    #[test]
    fn parses_disambiguation_links() {
        let body = json!({
            "query": {
                "pages": {
                    "19000": {
                        "title": "Mercury",
                        "links": [
                            {"ns": 0, "title": "Mercury (planet)"},
                            {"ns": 4, "title": "Wikipedia:Disambiguation"},
                            {"ns": 0, "title": "Mercury (element)"}
                        ]
                    }
                }
            }
        });
        assert_eq!(
            parse_links(&body),
            vec!["Mercury (planet)", "Mercury (element)"]
        );
    }

    #[test]
    fn summary_deserializes_type_field() {
        let summary: Summary = serde_json::from_value(json!({
            "type": "disambiguation",
            "title": "Mercury",
            "extract": "Mercury may refer to:"
        }))
        .unwrap();
        assert_eq!(summary.kind, "disambiguation");
    }

    #[test]
    fn sentence_truncation() {
        let text = "Rust is a language. It is fast. It is safe. It has traits.";
        assert_eq!(first_sentences(text, 2), "Rust is a language. It is fast.");
        assert_eq!(first_sentences(text, 10), text);
        assert_eq!(first_sentences("Version 1.5 shipped", 1), "Version 1.5 shipped");
        assert_eq!(first_sentences("", 3), "");
    }

    #[test]
    fn summary_url_encodes_title() {
        let source = WikipediaSource::new("wikipedia", "en");
        let url = source.summary_url("Machine learning (ML)").unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Machine_learning_(ML)"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let source = WikipediaSource::with_endpoints(
            "wikipedia",
            "http://127.0.0.1:9/w/api.php",
            "http://127.0.0.1:9/api/rest_v1",
        )
        .with_timeout(Duration::from_secs(2));

        let err = source.search("rust", 3).await.unwrap_err();
        assert!(matches!(err, KnowledgeError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn blank_query_skips_network() {
        let source = WikipediaSource::with_endpoints("wikipedia", "http://127.0.0.1:9", "http://127.0.0.1:9");
        assert!(source.search("   ", 3).await.unwrap().is_empty());
    }
}
