use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry_if, RetryConfig};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("API request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<u64> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl GitHubError {
    /// Whether replaying the same request could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GitHubError::RequestFailed { status, .. } => StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            GitHubError::NetworkError(e) => !e.is_decode() && !e.is_builder(),
            GitHubError::RateLimitExceeded { .. }
            | GitHubError::NotFound(_)
            | GitHubError::ParseError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// Repository as returned by `/search/repositories`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: GitHubOwner,
    #[serde(default)]
    pub description: Option<String>,
    pub stargazers_count: u32,
    pub forks_count: u32,
    #[serde(default)]
    pub language: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub html_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
    pub avatar_url: String,
}

/// Envelope of the search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total_count: u64,
    pub items: Vec<GitHubRepo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubContributor {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
    pub contributions: u32,
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
    retry_config: RetryConfig,
}

impl GitHubClient {
    /// `base_url` is usually `GITHUB_API_BASE`; Enterprise and tests point elsewhere
    pub fn with_base_url(token: Option<String>, base_url: String) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("RepoDeck/0.1.0"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// One page of `/search/repositories`
    pub async fn search_repositories(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchResponse> {
        let url = format!("{}/search/repositories", self.base_url);
        let params = [
            ("q", query.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];

        debug!("Searching '{}' page {} ({} per page)", query, page, per_page);

        self.get_json::<SearchResponse>(&url, &params, query)
            .await?
            .ok_or_else(|| GitHubError::RequestFailed {
                status: StatusCode::NO_CONTENT.as_u16(),
                body: "empty search response".to_string(),
            })
    }

    /// One page of `/repos/{owner}/{repo}/contributors`
    ///
    /// Empty repositories answer 204 with no body; that's just an empty page.
    pub async fn get_contributors(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitHubContributor>> {
        let url = format!(
            "{}/repos/{}/{}/contributors",
            self.base_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        );
        let params = [("page", page.to_string()), ("per_page", per_page.to_string())];
        let full_name = format!("{}/{}", owner, repo);

        debug!("Listing contributors of {} page {}", full_name, page);

        Ok(self
            .get_json::<Vec<GitHubContributor>>(&url, &params, &full_name)
            .await?
            .unwrap_or_default())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        what: &str,
    ) -> Result<Option<T>> {
        let client = &self.client;
        let token = self.token.as_deref();

        with_retry_if(
            &self.retry_config,
            || async move {
                let mut request = client.get(url).query(params);

                if let Some(token) = token {
                    request = request.header(AUTHORIZATION, format!("Bearer {}", token));
                }

                let response = request.send().await?;
                let status = response.status();

                if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(GitHubError::RateLimitExceeded {
                        retry_after: retry_after_secs(response.headers(), Utc::now()),
                    });
                }

                if status == StatusCode::NOT_FOUND {
                    return Err(GitHubError::NotFound(what.to_string()));
                }

                if status == StatusCode::NO_CONTENT {
                    return Ok(None);
                }

                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GitHubError::RequestFailed {
                        status: status.as_u16(),
                        body,
                    });
                }

                let bytes = response.bytes().await?;
                let parsed = serde_json::from_slice(&bytes)?;
                Ok(Some(parsed))
            },
            GitHubError::is_retryable,
        )
        .await
    }
}

/// Seconds until the quota window resets.
///
/// Secondary limits send `retry-after`; primary limits only send the
/// reset timestamp.
fn retry_after_secs(headers: &HeaderMap, now: DateTime<Utc>) -> Option<u64> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    if let Some(secs) = header(RETRY_AFTER.as_str()) {
        return Some(secs.max(0) as u64);
    }

    header("x-ratelimit-reset").map(|reset| (reset - now.timestamp()).max(0) as u64)
}
