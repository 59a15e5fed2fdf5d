use repodeck_store::KeyValueStore;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::Result;

pub const THEME_KEY: &str = "theme";

/// Light or dark, nothing fancier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    #[default]
    Light,
    Dark,
}

impl ThemePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Light,
        }
    }
}

impl std::fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ThemePreference {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            other => Err(crate::Error::ConfigError(format!(
                "Unknown theme '{}', expected light or dark",
                other
            ))),
        }
    }
}

/// Process-wide theme preference
///
/// Persisted under `theme`; views subscribe and get every change pushed.
pub struct ThemeStore<S: KeyValueStore> {
    storage: S,
    sender: watch::Sender<ThemePreference>,
}

impl<S: KeyValueStore> ThemeStore<S> {
    /// Read the stored preference. First run (or junk in the store) means
    /// light, and light gets written back so the next start agrees.
    pub fn load(storage: S) -> Self {
        let stored = match storage.get_string(THEME_KEY) {
            Ok(value) => value.and_then(|v| v.parse::<ThemePreference>().ok()),
            Err(e) => {
                warn!("Could not read theme, using default: {}", e);
                None
            }
        };

        let theme = match stored {
            Some(theme) => theme,
            None => {
                let theme = ThemePreference::default();
                if let Err(e) = storage.set(THEME_KEY, theme.as_str()) {
                    warn!("Could not persist default theme: {}", e);
                }
                theme
            }
        };

        debug!("Theme is {}", theme);
        let (sender, _) = watch::channel(theme);
        Self { storage, sender }
    }

    pub fn current(&self) -> ThemePreference {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemePreference> {
        self.sender.subscribe()
    }

    pub fn set(&self, theme: ThemePreference) -> Result<()> {
        self.storage.set(THEME_KEY, theme.as_str())?;
        self.sender.send_replace(theme);
        Ok(())
    }

    pub fn toggle(&self) -> Result<ThemePreference> {
        let next = self.current().toggled();
        self.set(next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repodeck_store::MemoryStore;

    #[test]
    fn test_first_run_defaults_to_light_and_persists_it() {
        let storage = MemoryStore::new();
        let themes = ThemeStore::load(storage.clone());

        assert_eq!(themes.current(), ThemePreference::Light);
        assert_eq!(storage.get_string(THEME_KEY).unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn test_garbage_value_falls_back_to_light() {
        let storage = MemoryStore::new();
        storage.set(THEME_KEY, "solarized").unwrap();

        assert_eq!(ThemeStore::load(storage).current(), ThemePreference::Light);
    }

    #[test]
    fn test_toggle_persists_and_broadcasts() {
        let storage = MemoryStore::new();
        let themes = ThemeStore::load(storage.clone());
        let mut view = themes.subscribe();

        assert_eq!(themes.toggle().unwrap(), ThemePreference::Dark);

        assert!(view.has_changed().unwrap());
        assert_eq!(*view.borrow_and_update(), ThemePreference::Dark);
        assert_eq!(ThemeStore::load(storage).current(), ThemePreference::Dark);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Dark".parse::<ThemePreference>().unwrap(), ThemePreference::Dark);
        assert!("blue".parse::<ThemePreference>().is_err());
    }
}
