use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::{Config, Theme};
use crate::error::SettingsError;

/// Persists the [`Config`] record as pretty JSON.
///
/// Reads never fail: a missing or unreadable file yields defaults. Writes go
/// through a `.json.tmp` sibling and a rename so a crash mid-write leaves
/// either the old or the new record on disk.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SettingsStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn open_default() -> Result<Self, SettingsError> {
        Ok(Self::open(Config::config_file_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Config {
        match self.try_load().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(path = %self.path.display(), "no settings file yet, using defaults");
                Config::default()
            }
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "failed to load settings, using defaults");
                Config::default()
            }
        }
    }

    async fn try_load(&self) -> Result<Option<Config>, SettingsError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "corrupted settings, trying tmp fallback");
                let tmp_bytes = tokio::fs::read(self.tmp_path()).await?;
                Ok(Some(serde_json::from_slice::<Config>(&tmp_bytes)?))
            }
        }
    }

    /// Overwrites symbol and theme, keeping the API key and news settings.
    pub async fn save(&self, symbol: &str, theme: Theme) -> Result<(), SettingsError> {
        self.update(|config| {
            config.symbol = symbol.to_owned();
            config.theme = theme;
        })
        .await
    }

    pub async fn save_api_key(&self, api_key: &str) -> Result<(), SettingsError> {
        self.update(|config| config.currents_api_key = api_key.trim().to_owned())
            .await
    }

    async fn update(&self, apply: impl FnOnce(&mut Config)) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().await;
        let mut config = self.load().await;
        apply(&mut config);
        self.persist(&config).await
    }

    async fn persist(&self, config: &Config) -> Result<(), SettingsError> {
        let bytes = serde_json::to_vec_pretty(config)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "settings persisted");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}
