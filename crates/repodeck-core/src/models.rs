use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository model - immutable once fetched, identified by `id`
///
/// There is intentionally no favorite flag here. Whether a repository is a
/// favorite is answered by `FavoritesStore`, so every view agrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub description: Option<String>,
    pub stars: u32,
    pub forks: u32,
    pub language: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    pub avatar_url: String,
}

/// Someone who committed to a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
    pub contributions: u32,
}

impl Contributor {
    /// List key for rendering.
    ///
    /// Pages can overlap while a repository is being pushed to, so the same
    /// id may show up twice; the index keeps the keys unique.
    pub fn list_key(&self, index: usize) -> String {
        format!("{}-{}", self.id, index)
    }
}

/// One page of results from the remote API
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Only search reports a total
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            total_count: None,
        }
    }

    pub fn with_total(mut self, total_count: u64) -> Self {
        self.total_count = Some(total_count);
        self
    }
}

/// Split `owner/repo` into its two halves
pub fn parse_full_name(full_name: &str) -> Option<(&str, &str)> {
    let (owner, repo) = full_name.trim().split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner, repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contributor_list_key_disambiguates_duplicates() {
        let c = Contributor {
            id: 7,
            login: "octocat".into(),
            avatar_url: String::new(),
            contributions: 3,
        };
        assert_ne!(c.list_key(0), c.list_key(20));
        assert_eq!(c.list_key(3), "7-3");
    }

    #[test]
    fn test_parse_full_name() {
        assert_eq!(parse_full_name("rust-lang/rust"), Some(("rust-lang", "rust")));
        assert_eq!(parse_full_name("rust-lang"), None);
        assert_eq!(parse_full_name("/rust"), None);
        assert_eq!(parse_full_name("a/b/c"), None);
    }
}
