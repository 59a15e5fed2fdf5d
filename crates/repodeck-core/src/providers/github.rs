// GitHub provider - bridges the API client with the RepositoryApi trait
use async_trait::async_trait;
use repodeck_api::{GitHubClient, GitHubContributor, GitHubRepo, RetryConfig};

use crate::{
    api::RepositoryApi,
    config::GitHubConfig,
    models::{Contributor, Owner, Page, Repository},
    Result,
};

/// Wrapper around GitHubClient that implements RepositoryApi
pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &GitHubConfig, retry: RetryConfig) -> Result<Self> {
        let client = GitHubClient::with_base_url(config.token.clone(), config.api_url.clone())?
            .with_retry_config(retry);
        Ok(Self::new(client))
    }
}

#[async_trait]
impl RepositoryApi for GitHubProvider {
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Repository>> {
        let response = self
            .client
            .search_repositories(query, page, per_page)
            .await?;

        let items = response.items.into_iter().map(github_to_repo).collect();
        Ok(Page::new(items).with_total(response.total_count))
    }

    async fn list_contributors(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Contributor>> {
        let contributors = self
            .client
            .get_contributors(owner, repo, page, per_page)
            .await?;

        Ok(Page::new(
            contributors.into_iter().map(github_to_contributor).collect(),
        ))
    }
}

/// Convert GitHub API repo to our internal Repository model
fn github_to_repo(gh: GitHubRepo) -> Repository {
    Repository {
        id: gh.id,
        name: gh.name,
        full_name: gh.full_name,
        owner: Owner {
            login: gh.owner.login,
            avatar_url: gh.owner.avatar_url,
        },
        description: gh.description,
        stars: gh.stargazers_count,
        forks: gh.forks_count,
        language: gh.language,
        updated_at: gh.updated_at,
        url: gh.html_url,
    }
}

fn github_to_contributor(gh: GitHubContributor) -> Contributor {
    Contributor {
        id: gh.id,
        login: gh.login,
        avatar_url: gh.avatar_url,
        contributions: gh.contributions,
    }
}
