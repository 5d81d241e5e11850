use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    /// Load `~/.hostwarden/config.toml`, writing defaults on first run, then
    /// apply environment overrides.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let data_dir = home.join(".hostwarden");

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).context("Failed to create .hostwarden directory")?;
        }

        let mut config = Self::load_from(&data_dir.join("config.toml"))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load a config file at `config_path`, creating it with defaults if it
    /// does not exist yet.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let data_dir = config_path
            .parent()
            .map_or_else(|| Path::new(".").to_path_buf(), Path::to_path_buf);

        if config_path.exists() {
            let contents = fs::read_to_string(config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.to_path_buf();
            config.data_dir = data_dir;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                data_dir,
                ..Self::default()
            };
            config.validate()?;
            config.save()?;
            tracing::info!(path = %config_path.display(), "wrote default config");
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
