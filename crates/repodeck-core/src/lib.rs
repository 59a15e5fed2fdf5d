// Search, paging and favorites - everything that isn't I/O plumbing
pub mod api;
pub mod config;
pub mod error;
pub mod favorites;
pub mod models;
pub mod providers;
pub mod session;
pub mod theme;

#[cfg(test)]
mod test_support;

pub use api::RepositoryApi;
pub use config::Config;
pub use error::Error;
pub use favorites::FavoritesStore;
pub use models::{Contributor, Owner, Page, Repository};
pub use providers::GitHubProvider;
pub use session::{
    Applied, ContributorSession, Notice, PageState, SearchController, SearchHandle, SearchSession,
};
pub use theme::{ThemePreference, ThemeStore};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
