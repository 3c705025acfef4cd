use crate::models::{MAX_PREVIEW_DIMENSION, PreviewSettings, UserConfig};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Prefix of environment variables overriding preview settings,
/// e.g. `SCANPREVIEW__DEFAULT_DEVICE=feeder-0`
pub const ENV_PREFIX: &str = "SCANPREVIEW";

/// Configuration manager for loading and saving the YAML configuration file.
///
/// Manages `ScanPreview Config.yaml`: controller settings plus the devices
/// served by the simulated backend. Settings can additionally be overridden
/// from the environment.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    user_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "ScanPreview Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            user_config_path: config_dir.join("ScanPreview Config.yaml"),
            config_dir,
        })
    }

    /// Load the user configuration file.
    ///
    /// # Returns
    /// The loaded UserConfig, or default if file doesn't exist
    pub fn load_user_config(&self) -> Result<UserConfig> {
        if !self.user_config_path.exists() {
            tracing::warn!(
                "User config file not found at {}, using defaults",
                self.user_config_path
            );
            return Ok(UserConfig::default());
        }

        let file_contents = fs::read_to_string(&self.user_config_path)
            .with_context(|| format!("Failed to read user config: {}", self.user_config_path))?;

        let mut config: UserConfig = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse user config: {}", self.user_config_path))?;

        for id in config.clamp_preview_dimensions() {
            tracing::warn!(
                "Preview size of device {} clamped to 1..={} pixels",
                id,
                MAX_PREVIEW_DIMENSION
            );
        }

        tracing::info!(
            "Loaded user config from {} ({} devices)",
            self.user_config_path,
            config.devices.len()
        );
        Ok(config)
    }

    /// Load the user configuration and apply `SCANPREVIEW__*` overrides
    /// from the process environment to its settings.
    pub fn load_effective_config(&self) -> Result<UserConfig> {
        let mut config = self.load_user_config()?;
        config.settings = apply_env_overrides(&config.settings, None)?;
        Ok(config)
    }

    /// Save the user configuration file.
    pub fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize user config to YAML")?;

        fs::write(&self.user_config_path, yaml_string)
            .with_context(|| format!("Failed to write user config: {}", self.user_config_path))?;

        tracing::info!("Saved user config to {}", self.user_config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn user_config_path(&self) -> &Utf8Path {
        &self.user_config_path
    }
}

/// Layer environment overrides on top of `settings`.
///
/// `vars` replaces the process environment when given, which keeps callers
/// and tests independent of global state.
pub fn apply_env_overrides(
    settings: &PreviewSettings,
    vars: Option<config::Map<String, String>>,
) -> Result<PreviewSettings> {
    let base = config::Config::try_from(settings)
        .context("Failed to convert preview settings into a config source")?;

    let merged = config::Config::builder()
        .add_source(base)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(vars),
        )
        .build()
        .context("Failed to merge environment overrides")?;

    let effective: PreviewSettings = merged
        .try_deserialize()
        .context("Invalid preview settings in environment overrides")?;

    if effective != *settings {
        tracing::info!("Applied environment overrides to preview settings");
    }

    Ok(effective)
}
