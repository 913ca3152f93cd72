use std::env;
use std::path::PathBuf;

use async_trait::async_trait;
use quiz_core::model::Quiz;
use reqwest::Client;
use serde::Deserialize;

use crate::error::CatalogError;

pub const PRODUCTION_BASE_URL: &str = "https://bac-quizz.vercel.app/";
pub const DEVELOPMENT_BASE_URL: &str = "http://localhost:3000/";
pub const CATALOG_PATH: &str = "data.json";

/// Where the quiz catalog is published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogConfig {
    pub base_url: String,
    pub path: String,
}

impl CatalogConfig {
    /// Reads `QUIZ_API_URL`, falling back to the production or development
    /// host depending on `QUIZ_ENV`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::resolve(
            env::var("QUIZ_API_URL").ok(),
            env::var("QUIZ_ENV").ok().as_deref(),
        )
    }

    #[must_use]
    pub fn resolve(api_url: Option<String>, environment: Option<&str>) -> Self {
        let base_url = api_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| match environment {
                Some("production") => PRODUCTION_BASE_URL.into(),
                _ => DEVELOPMENT_BASE_URL.into(),
            });
        Self {
            base_url,
            path: CATALOG_PATH.into(),
        }
    }

    /// Full catalog URL with exactly one `/` between host and path.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

/// Body published at the catalog endpoint.
#[derive(Debug, Deserialize)]
struct CatalogResponse {
    quizzes: Vec<Quiz>,
}

/// Produces the list of available quizzes.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the full, ordered catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the catalog cannot be retrieved or decoded.
    async fn fetch_quizzes(&self) -> Result<Vec<Quiz>, CatalogError>;
}

/// Fetches the catalog over HTTP.
#[derive(Clone)]
pub struct HttpCatalogSource {
    client: Client,
    config: CatalogConfig,
}

impl HttpCatalogSource {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(CatalogConfig::from_env())
    }

    #[must_use]
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_quizzes(&self) -> Result<Vec<Quiz>, CatalogError> {
        let response = self.client.get(self.config.url()).send().await?;

        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus(response.status()));
        }

        let bytes = response.bytes().await?;
        let body: CatalogResponse = serde_json::from_slice(&bytes)?;
        Ok(body.quizzes)
    }
}

/// Reads the catalog from a local JSON file with the same shape as the HTTP body.
#[derive(Clone, Debug)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch_quizzes(&self) -> Result<Vec<Quiz>, CatalogError> {
        let raw = tokio::fs::read(&self.path).await?;
        let body: CatalogResponse = serde_json::from_slice(&raw)?;
        Ok(body.quizzes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves a single HTTP response on a random local port and returns a source
    /// pointed at it.
    async fn serve_once(status: &'static str, body: &'static str) -> HttpCatalogSource {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let read = socket.read(&mut buf).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        HttpCatalogSource::new(CatalogConfig::resolve(
            Some(format!("http://{addr}/")),
            None,
        ))
    }

    #[tokio::test]
    async fn http_source_reads_quizzes_field() {
        let source = serve_once(
            "200 OK",
            r#"{ "quizzes": [ { "id": 3, "title": "Rust", "questions": [ { "id": 1, "question": "Borrow?", "options": ["&", "*"], "answer": "&" } ] } ] }"#,
        )
        .await;
        assert!(source.config().url().ends_with("/data.json"));

        let quizzes = source.fetch_quizzes().await.unwrap();
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].title(), "Rust");
        assert_eq!(quizzes[0].question_count(), 1);
    }

    #[tokio::test]
    async fn http_source_maps_error_status() {
        let source = serve_once("500 Internal Server Error", "oops").await;
        let err = source.fetch_quizzes().await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::HttpStatus(status) if status == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn http_source_rejects_malformed_body() {
        let source = serve_once("200 OK", r#"{ "quizzes": "#).await;
        let err = source.fetch_quizzes().await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn explicit_api_url_wins() {
        let config = CatalogConfig::resolve(Some("https://quiz.example".into()), Some("production"));
        assert_eq!(config.url(), "https://quiz.example/data.json");
    }

    #[test]
    fn environment_selects_default_host() {
        let prod = CatalogConfig::resolve(None, Some("production"));
        assert_eq!(prod.url(), "https://bac-quizz.vercel.app/data.json");

        let dev = CatalogConfig::resolve(Some("  ".into()), None);
        assert_eq!(dev.url(), "http://localhost:3000/data.json");
    }

    #[tokio::test]
    async fn file_source_reads_quizzes_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "quizzes": [ {{ "id": 1, "title": "One", "questions": [] }}, {{ "id": 2, "title": "Two", "questions": [] }} ] }}"#
        )
        .unwrap();

        let quizzes = FileCatalogSource::new(file.path()).fetch_quizzes().await.unwrap();
        let titles: Vec<_> = quizzes.iter().map(Quiz::title).collect();
        assert_eq!(titles, ["One", "Two"]);
    }

    #[tokio::test]
    async fn file_source_rejects_wrong_shape() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "items": [] }}"#).unwrap();

        let err = FileCatalogSource::new(file.path()).fetch_quizzes().await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[tokio::test]
    async fn file_source_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileCatalogSource::new(dir.path().join("missing.json"))
            .fetch_quizzes()
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
