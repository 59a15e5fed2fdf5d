use repodeck_store::KeyValueStore;
use tracing::{debug, info, warn};

use crate::{models::Repository, Result};

pub const FAVORITES_KEY: &str = "favorites";

/// Favorite repositories, mirrored to a key-value store
///
/// This is the single answer to "is this repository a favorite?". The
/// search list, the favorites list and the detail view all ask it by id,
/// so toggling in one place shows up everywhere.
///
/// The persisted form is a JSON array in the order favorites were added.
/// Every mutation rewrites the whole array before returning.
pub struct FavoritesStore<S: KeyValueStore> {
    items: Vec<Repository>,
    storage: S,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    /// Load whatever was persisted. Missing or unreadable data means no
    /// favorites - it never stops the app from starting.
    pub fn load(storage: S) -> Self {
        let items = match storage.get_string(FAVORITES_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Repository>>(&raw) {
                Ok(items) => dedup_by_id(items),
                Err(e) => {
                    warn!("Ignoring malformed favorites: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not read favorites, starting empty: {}", e);
                Vec::new()
            }
        };

        debug!("Loaded {} favorites", items.len());
        Self { items, storage }
    }

    pub fn is_favorite(&self, id: u64) -> bool {
        self.items.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: u64) -> Option<&Repository> {
        self.items.iter().find(|r| r.id == id)
    }

    /// Favorites in the order they were added
    pub fn items(&self) -> &[Repository] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append `repo` unless its id is already there. Returns whether it was added.
    pub fn add(&mut self, repo: Repository) -> Result<bool> {
        if self.is_favorite(repo.id) {
            return Ok(false);
        }

        let mut next = self.items.clone();
        info!("Adding {} to favorites", repo.full_name);
        next.push(repo);
        self.commit(next)?;
        Ok(true)
    }

    /// Drop `id` from the favorites. Persists even when nothing matched.
    /// Returns whether something was removed.
    pub fn remove(&mut self, id: u64) -> Result<bool> {
        let next: Vec<Repository> = self.items.iter().filter(|r| r.id != id).cloned().collect();
        let removed = next.len() != self.items.len();

        if removed {
            info!("Removing repository {} from favorites", id);
        }

        self.commit(next)?;
        Ok(removed)
    }

    /// Flip the favorite state of `repo`; returns the new state
    pub fn toggle(&mut self, repo: &Repository) -> Result<bool> {
        if self.is_favorite(repo.id) {
            self.remove(repo.id)?;
            Ok(false)
        } else {
            self.add(repo.clone())?;
            Ok(true)
        }
    }

    // Memory only changes once the write went through, so a failed write
    // leaves both sides at the previous state.
    fn commit(&mut self, next: Vec<Repository>) -> Result<()> {
        let encoded = serde_json::to_string(&next)?;
        self.storage.set(FAVORITES_KEY, &encoded)?;
        self.items = next;
        Ok(())
    }
}

fn dedup_by_id(items: Vec<Repository>) -> Vec<Repository> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|r| seen.insert(r.id)).collect()
}
