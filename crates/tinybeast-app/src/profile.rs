use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tinybeast_config::Settings;

/// Represents a user profile
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Settings,
}

/// Location of one named profile file
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
    name: String,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// `<config dir>/TinyBeast/profiles`
    pub fn user(name: &str) -> anyhow::Result<Self> {
        let dir = dirs::config_dir()
            .context("no config directory on this platform")?
            .join("TinyBeast")
            .join("profiles");
        Ok(Self::new(dir, name))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }

    /// Missing or unreadable profiles fall back to defaults
    pub fn load(&self) -> Settings {
        let path = self.path();
        if !path.exists() {
            tracing::info!("Profile {} not found, starting with defaults", self.name);
            return Settings::default();
        }

        match read_profile(&path) {
            Ok(profile) => profile.value,
            Err(e) => {
                tracing::warn!("Ignoring unreadable profile {}: {e:#}", path.display());
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let profile = Profile {
            name: self.name.clone(),
            value: settings.clone(),
        };
        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(&profile)?)
            .with_context(|| format!("writing {}", path.display()))?;

        tracing::debug!("Saved profile {}", self.name);
        Ok(())
    }
}

fn read_profile(path: &Path) -> anyhow::Result<Profile> {
    let data = fs::read_to_string(path)?;
    let profile = serde_json::from_str(&data)?;
    Ok(profile)
}
