// Fixtures shared by the unit tests
use crate::models::{Contributor, Owner, Page, Repository};
use crate::session::FetchOutcome;

pub(crate) fn repo(id: u64) -> Repository {
    Repository {
        id,
        name: format!("repo-{}", id),
        full_name: format!("octo/repo-{}", id),
        owner: Owner {
            login: "octo".into(),
            avatar_url: "https://avatars.example/octo".into(),
        },
        description: Some("test repository".into()),
        stars: 10,
        forks: 1,
        language: Some("Rust".into()),
        updated_at: chrono::Utc::now(),
        url: format!("https://github.com/octo/repo-{}", id),
    }
}

/// `count` repositories with ids starting at `first`
pub(crate) fn repos(first: u64, count: usize) -> Vec<Repository> {
    (first..first + count as u64).map(repo).collect()
}

pub(crate) fn contributors(first: u64, count: usize) -> Vec<Contributor> {
    (first..first + count as u64)
        .map(|id| Contributor {
            id,
            login: format!("dev-{}", id),
            avatar_url: format!("https://avatars.example/{}", id),
            contributions: 1,
        })
        .collect()
}

/// A successful fetch of `items`, no total reported
pub(crate) fn fetched<T>(items: Vec<T>) -> FetchOutcome<T> {
    FetchOutcome::Succeeded(Page::new(items))
}
