use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::transcript::Source;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Requests that hang past this bound are reported as connectivity failures
/// instead of leaving the client loading forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Snapshot of remote readiness, replaced wholesale on each probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemStatus {
    pub ready: bool,
    pub database_status: String,
}

impl SystemStatus {
    pub fn unreachable() -> Self {
        Self {
            ready: false,
            database_status: "unavailable".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Status(SystemStatus),
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitializeOutcome {
    Initialized,
    Failed(String),
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Answer { answer: String, sources: Vec<Source> },
    Failed(String),
    Unreachable,
}

#[derive(Deserialize)]
struct StatusResponse {
    system_ready: bool,
    #[serde(default)]
    database_status: Option<String>,
}

#[derive(Deserialize)]
struct InitializeResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    sources: Vec<WireSource>,
    #[serde(default)]
    error: Option<String>,
}

/// The backend emits sources either as bare strings or as structured
/// records; `untagged` covers both without shape-sniffing on our side.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireSource {
    Structured {
        file: String,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default, rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    Label(String),
}

impl From<WireSource> for Source {
    fn from(wire: WireSource) -> Self {
        match wire {
            WireSource::Label(label) => Source::Label(label),
            WireSource::Structured { file, page, kind, content } => Source::Citation {
                file,
                page,
                kind,
                excerpt: content,
            },
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Probes the status endpoint. Transport failures and unparsable bodies
    /// come back as `Unreachable`, never as an error into the caller.
    pub async fn check_status(&self) -> StatusOutcome {
        let url = format!("{}/status", self.base_url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(_) => return StatusOutcome::Unreachable,
        };

        match response.json::<StatusResponse>().await {
            Ok(body) => StatusOutcome::Status(SystemStatus {
                ready: body.system_ready,
                database_status: body.database_status.unwrap_or_else(|| "unknown".to_string()),
            }),
            Err(_) => StatusOutcome::Unreachable,
        }
    }

    pub async fn initialize(&self) -> InitializeOutcome {
        let url = format!("{}/initialize", self.base_url);

        let response = match self.client.post(&url).json(&serde_json::json!({})).send().await {
            Ok(response) => response,
            Err(_) => return InitializeOutcome::Unreachable,
        };

        match response.json::<InitializeResponse>().await {
            Ok(body) if body.success => InitializeOutcome::Initialized,
            Ok(body) => InitializeOutcome::Failed(
                body.error
                    .unwrap_or_else(|| "Initialization failed".to_string()),
            ),
            Err(_) => InitializeOutcome::Unreachable,
        }
    }

    pub async fn search(&self, question: &str) -> SearchOutcome {
        let url = format!("{}/search", self.base_url);

        let response = match self
            .client
            .post(&url)
            .json(&SearchRequest { question })
            .send()
            .await
        {
            Ok(response) => response,
            Err(_) => return SearchOutcome::Unreachable,
        };

        let http_ok = response.status().is_success();
        let status = response.status();
        let body = response.json::<SearchResponse>().await.ok();
        classify_search(http_ok, status.as_u16(), body)
    }
}

/// Pure classification of a search response. An answer counts only when the
/// request was 2xx and the answer field is present and non-empty; everything
/// else surfaces the most specific error message available.
fn classify_search(http_ok: bool, status: u16, body: Option<SearchResponse>) -> SearchOutcome {
    match body {
        Some(body) => {
            let server_error = body.error;
            match body.answer {
                Some(answer) if http_ok && !answer.is_empty() => SearchOutcome::Answer {
                    answer,
                    sources: body.sources.into_iter().map(Source::from).collect(),
                },
                _ => SearchOutcome::Failed(
                    server_error.unwrap_or_else(|| "Unknown error occurred".to_string()),
                ),
            }
        }
        None if http_ok => SearchOutcome::Unreachable,
        None => SearchOutcome::Failed(format!("Search failed with status: {}", status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SearchResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_bare_label_sources_deserialize() {
        let body = parse(r#"{"answer": "X is ...", "sources": ["doc.pdf (p.3)"]}"#);
        let outcome = classify_search(true, 200, Some(body));
        match outcome {
            SearchOutcome::Answer { answer, sources } => {
                assert_eq!(answer, "X is ...");
                assert_eq!(sources, vec![Source::Label("doc.pdf (p.3)".into())]);
            }
            other => panic!("expected answer, got {:?}", other),
        }
    }

    #[test]
    fn test_structured_sources_deserialize() {
        let body = parse(
            r#"{"answer": "ok", "sources": [
                {"file": "guide.pdf", "page": 4, "type": "text", "content": "snippet"},
                {"file": "readme.md"}
            ]}"#,
        );
        let outcome = classify_search(true, 200, Some(body));
        let SearchOutcome::Answer { sources, .. } = outcome else {
            panic!("expected answer");
        };
        assert_eq!(
            sources[0],
            Source::Citation {
                file: "guide.pdf".into(),
                page: Some(4),
                kind: Some("text".into()),
                excerpt: Some("snippet".into()),
            }
        );
        assert_eq!(
            sources[1],
            Source::Citation {
                file: "readme.md".into(),
                page: None,
                kind: None,
                excerpt: None,
            }
        );
    }

    #[test]
    fn test_server_error_is_surfaced_verbatim() {
        let body = parse(r#"{"error": "index not found"}"#);
        assert_eq!(
            classify_search(false, 500, Some(body)),
            SearchOutcome::Failed("index not found".into())
        );
    }

    #[test]
    fn test_missing_answer_on_ok_response_is_failure() {
        let body = parse(r#"{"sources": []}"#);
        assert_eq!(
            classify_search(true, 200, Some(body)),
            SearchOutcome::Failed("Unknown error occurred".into())
        );
    }

    #[test]
    fn test_empty_answer_is_failure() {
        let body = parse(r#"{"answer": ""}"#);
        assert_eq!(
            classify_search(true, 200, Some(body)),
            SearchOutcome::Failed("Unknown error occurred".into())
        );
    }

    #[test]
    fn test_unparsable_error_body_reports_status() {
        assert_eq!(
            classify_search(false, 502, None),
            SearchOutcome::Failed("Search failed with status: 502".into())
        );
    }

    #[test]
    fn test_unparsable_ok_body_is_unreachable() {
        assert_eq!(classify_search(true, 200, None), SearchOutcome::Unreachable);
    }

    #[test]
    fn test_status_response_tolerates_missing_database_status() {
        let body: StatusResponse = serde_json::from_str(r#"{"system_ready": true}"#).unwrap();
        assert!(body.system_ready);
        assert!(body.database_status.is_none());
    }
}
