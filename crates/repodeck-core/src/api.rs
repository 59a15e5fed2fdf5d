use crate::{
    models::{Contributor, Page, Repository},
    Result,
};

/// Remote repository API as the sessions see it
///
/// `GitHubProvider` talks to the real thing; tests use the generated
/// `MockRepositoryApi` or a hand-rolled fake. Both calls are idempotent
/// and safe to replay with the same page cursor.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RepositoryApi: Send + Sync {
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Repository>>;

    async fn list_contributors(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Contributor>>;
}
