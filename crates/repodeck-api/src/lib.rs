// GitHub REST client used by the search and contributor sessions
pub mod github;
pub mod retry;

// Re-export common types
pub use github::{
    GitHubClient, GitHubContributor, GitHubError, GitHubOwner, GitHubRepo, SearchResponse,
    GITHUB_API_BASE,
};
pub use retry::RetryConfig;
