// Provider implementations of RepositoryApi
pub mod github;

pub use github::GitHubProvider;
