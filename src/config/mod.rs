use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Configuration manager for loading and saving the YAML settings file.
///
/// Settings live in a single file (`lenslate.yaml`) under the data
/// directory. A missing file is not an error; defaults are used and the
/// operator can persist them with [`ConfigManager::save_settings`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing the settings file (e.g., "lenslate-data")
    ///
    /// # Returns
    /// A new ConfigManager instance
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join("lenslate.yaml"),
            config_dir,
        })
    }

    /// Load and validate the settings file.
    ///
    /// # Returns
    /// The loaded [`Settings`], or defaults if the file doesn't exist.
    /// A file that parses but fails validation is an error; running with a
    /// zero interval or an empty OCR command would only fail later and
    /// further from the cause.
    pub fn load_settings(&self) -> Result<Settings> {
        let settings = if self.settings_path.exists() {
            let file_contents = fs::read_to_string(&self.settings_path)
                .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

            let settings: Settings = serde_yaml_ng::from_str(&file_contents)
                .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

            tracing::info!("Loaded settings from {}", self.settings_path);
            settings
        } else {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            Settings::default()
        };

        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", self.settings_path))?;
        Ok(settings)
    }

    /// Save the settings file.
    ///
    /// # Arguments
    /// * `settings` - The [`Settings`] to save
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Path of the settings file, whether or not it exists yet.
    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}
