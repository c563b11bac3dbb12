use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::stream::{self, StreamExt};
use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::ConsoleError;
use crate::links::{normalize_path, validate_segments, NewLink};

// ─── Reply shapes ─────────────────────────────────────────────────────────────

/// Upstream body as relayed to the browser: parsed JSON when it parses,
/// otherwise the raw text wrapped as `{"raw": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Json(Value),
    Raw { raw: String },
}

impl Envelope {
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Envelope::Json(value),
            Err(_) => Envelope::Raw { raw: text },
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Envelope,
}

impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CACHE_CONTROL, "no-store")],
            Json(self.body),
        )
            .into_response()
    }
}

/// Per-path result of a batch delete, in the order the paths were given.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BatchDeleteOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Client for the upstream admin API. Holds the bearer token; nothing it
/// holds is ever sent to the browser.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl AdminClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("API_BASE_URL is not a valid URL: {base_url}"))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            bail!("API_BASE_URL must be an http(s) origin, got {base_url}");
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build upstream HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token: token.to_string(),
        })
    }

    /// `None` when the base URL or the token is not configured.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        let (Some(base_url), Some(token)) = (cfg.api_base_url(), cfg.admin_token()) else {
            return Ok(None);
        };
        let timeout = Duration::from_secs(cfg.upstream_timeout_secs.max(1));
        Self::new(base_url, token, timeout).map(Some)
    }

    pub async fn list(&self, query: Option<&str>) -> Result<UpstreamReply, ConsoleError> {
        let mut url = self.links_url(None);
        url.set_query(query.filter(|q| !q.is_empty()));
        self.send(self.http.request(Method::GET, url)).await
    }

    pub async fn create(&self, link: &NewLink) -> Result<UpstreamReply, ConsoleError> {
        let url = self.links_url(None);
        self.send(self.http.request(Method::POST, url).json(link))
            .await
    }

    pub async fn get(&self, path: &str) -> Result<UpstreamReply, ConsoleError> {
        let url = self.links_url(Some(path));
        self.send(self.http.request(Method::GET, url)).await
    }

    pub async fn delete(&self, path: &str) -> Result<UpstreamReply, ConsoleError> {
        let url = self.links_url(Some(path));
        self.send(self.http.request(Method::DELETE, url)).await
    }

    /// Deletes each path with at most `concurrency` calls in flight.
    /// Paths that normalize to the same link are collapsed onto the first
    /// one given, and completed deletes are never undone.
    pub async fn delete_many(&self, paths: &[String], concurrency: usize) -> BatchDeleteOutcome {
        let mut seen = HashSet::new();
        let unique: Vec<String> = paths
            .iter()
            .filter(|raw| seen.insert(normalize_path(raw)))
            .cloned()
            .collect();

        let results: Vec<(String, bool)> = stream::iter(unique)
            .map(|raw: String| async move {
                let path = normalize_path(&raw);
                if path.is_empty() || validate_segments(&path).is_err() {
                    return (raw, false);
                }
                let ok = match self.delete(&path).await {
                    Ok(reply) => {
                        if !reply.status.is_success() {
                            tracing::debug!(%path, status = %reply.status, "upstream refused delete");
                        }
                        reply.status.is_success()
                    }
                    Err(err) => {
                        tracing::warn!(%path, error = %err, "upstream delete failed");
                        false
                    }
                };
                (raw, ok)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let mut outcome = BatchDeleteOutcome::default();
        for (path, ok) in results {
            if ok {
                outcome.succeeded.push(path);
            } else {
                outcome.failed.push(path);
            }
        }
        outcome
    }

    fn links_url(&self, path: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        // checked in `new`: the base URL can carry path segments
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("links");
            if let Some(path) = path {
                segments.extend(path.split('/'));
            }
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<UpstreamReply, ConsoleError> {
        let resp = request
            .bearer_auth(&self.token)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        Ok(UpstreamReply {
            status,
            body: Envelope::from_text(text),
        })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(endpoint: &str) -> AdminClient {
        AdminClient::new(endpoint, "tok_test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_envelope_parses_json() {
        let env = Envelope::from_text(r#"{"items":[]}"#.to_string());
        assert_eq!(env, Envelope::Json(json!({"items": []})));
    }

    #[test]
    fn test_envelope_wraps_non_json() {
        let env = Envelope::from_text("not-json".to_string());
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"raw": "not-json"})
        );
    }

    #[test]
    fn test_envelope_wraps_empty_body() {
        let env = Envelope::from_text(String::new());
        assert_eq!(env, Envelope::Raw { raw: String::new() });
    }

    #[test]
    fn test_rejects_non_http_base() {
        assert!(AdminClient::new("ftp://x", "t", Duration::from_secs(1)).is_err());
        assert!(AdminClient::new("not a url", "t", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_links_url_joins_base_path() {
        let c = client("https://api.example.com/v1/");
        assert_eq!(
            c.links_url(Some("foo/bar")).as_str(),
            "https://api.example.com/v1/links/foo/bar"
        );
        let c = client("https://api.example.com");
        assert_eq!(c.links_url(None).as_str(), "https://api.example.com/links");
    }

    #[test]
    fn test_links_url_encodes_segments() {
        let c = client("https://api.example.com");
        assert_eq!(
            c.links_url(Some("a b/c?d")).as_str(),
            "https://api.example.com/links/a%20b/c%3Fd"
        );
    }

    #[test]
    fn test_from_config_requires_both_settings() {
        use clap::Parser;
        let cfg = Config::parse_from(["link-console", "--api-base-url", "https://x.dev"]);
        assert!(AdminClient::from_config(&cfg).unwrap().is_none());
        let cfg = Config::parse_from([
            "link-console",
            "--api-base-url",
            "https://x.dev",
            "--admin-token",
            "t",
        ]);
        assert!(AdminClient::from_config(&cfg).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_forwards_query_and_token() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/links")
            .match_query(Matcher::Exact("limit=10&nextToken=abc".into()))
            .match_header("authorization", "Bearer tok_test")
            .match_header("cache-control", "no-store")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items":[{"path":"hello","targetUrl":"https://example.com"}],"nextToken":"def"}"#)
            .create_async()
            .await;

        let reply = client(&server.url())
            .list(Some("limit=10&nextToken=abc"))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(
            reply.body,
            Envelope::Json(json!({
                "items": [{"path": "hello", "targetUrl": "https://example.com"}],
                "nextToken": "def"
            }))
        );
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_preserves_conflict_status() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/links")
            .match_body(Matcher::Json(json!({
                "path": "hello",
                "targetUrl": "https://example.com",
                "randomSubdomain": true,
                "subdomainLength": 6
            })))
            .with_status(409)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"path already exists"}"#)
            .create_async()
            .await;

        let link = NewLink {
            path: "hello".into(),
            target_url: "https://example.com".into(),
            random_subdomain: Some(true),
            subdomain_length: Some(6),
        };
        let reply = client(&server.url()).create(&link).await.unwrap();
        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(
            reply.body,
            Envelope::Json(json!({"error": "path already exists"}))
        );
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_wraps_unparsable_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/links/foo/bar")
            .with_status(502)
            .with_body("not-json")
            .create_async()
            .await;

        let reply = client(&server.url()).get("foo/bar").await.unwrap();
        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            reply.body,
            Envelope::Raw {
                raw: "not-json".into()
            }
        );
    }

    #[tokio::test]
    async fn test_network_failure_is_an_error() {
        // nothing listens on port 9 locally
        let reply = client("http://127.0.0.1:9").delete("gone").await;
        assert!(matches!(reply, Err(ConsoleError::Network(_))));
    }

    #[tokio::test]
    async fn test_delete_many_reports_partial_failure_in_order() {
        let mut server = mockito::Server::new_async().await;
        let a = server
            .mock("DELETE", "/links/a")
            .with_status(200)
            .with_body(r#"{"deleted":true}"#)
            .create_async()
            .await;
        let b = server
            .mock("DELETE", "/links/b")
            .with_status(500)
            .with_body(r#"{"error":"boom"}"#)
            .create_async()
            .await;
        let c = server
            .mock("DELETE", "/links/c")
            .with_status(200)
            .with_body(r#"{"deleted":true}"#)
            .create_async()
            .await;

        let paths = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let outcome = client(&server.url()).delete_many(&paths, 3).await;
        assert_eq!(outcome.succeeded, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(outcome.failed, vec!["b".to_string()]);
        a.assert_async().await;
        b.assert_async().await;
        c.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_many_sequential_collapses_duplicates() {
        let mut server = mockito::Server::new_async().await;
        let a = server
            .mock("DELETE", "/links/a")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let paths = vec!["a".to_string(), "a".to_string(), "  ".to_string()];
        let outcome = client(&server.url()).delete_many(&paths, 1).await;
        assert_eq!(outcome.succeeded, vec!["a".to_string()]);
        assert_eq!(outcome.failed, vec!["  ".to_string()]);
        a.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_many_collapses_paths_naming_the_same_link() {
        let mut server = mockito::Server::new_async().await;
        let a = server
            .mock("DELETE", "/links/a")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let paths = vec!["/a".to_string(), "a/".to_string()];
        let outcome = client(&server.url()).delete_many(&paths, 2).await;
        assert_eq!(outcome.succeeded, vec!["/a".to_string()]);
        assert!(outcome.failed.is_empty());
        a.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_many_refuses_dot_segments() {
        let mut server = mockito::Server::new_async().await;
        let promo = server
            .mock("DELETE", "/links/promo")
            .expect(0)
            .create_async()
            .await;

        let paths = vec!["promo/..".to_string(), "promo/.".to_string()];
        let outcome = client(&server.url()).delete_many(&paths, 1).await;
        assert!(outcome.succeeded.is_empty());
        assert_eq!(outcome.failed, paths);
        promo.assert_async().await;
    }
}
