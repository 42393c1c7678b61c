//! Configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window title
    #[serde(default = "default_title")]
    pub title: String,
    /// Default window width in logical pixels
    #[serde(default = "default_width")]
    pub width: f64,
    /// Default window height in logical pixels
    #[serde(default = "default_height")]
    pub height: f64,
}

fn default_title() -> String {
    "Lum Terminal".to_string()
}
fn default_width() -> f64 {
    800.0
}
fn default_height() -> f64 {
    500.0
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
        }
    }
}

/// Shell configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Shell binary to spawn. Empty means auto-detect ($SHELL, then /bin/bash).
    #[serde(default)]
    pub program: String,
    /// Working directory for the shell. Empty means the user's home directory.
    #[serde(default)]
    pub working_directory: String,
}

/// Terminal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Number of lines kept in the scrollback buffer
    #[serde(default = "default_scrollback")]
    pub scrollback_lines: usize,
}

fn default_font_size() -> f32 {
    11.0
}

fn default_scrollback() -> usize {
    10_000
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            scrollback_lines: default_scrollback(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Window configuration
    #[serde(default)]
    pub window: WindowConfig,
    /// Shell configuration
    #[serde(default)]
    pub shell: ShellConfig,
    /// Terminal configuration
    #[serde(default)]
    pub terminal: TerminalConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
            Ok(config)
        } else {
            // Return default config if file doesn't exist
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Create parent directories if needed
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "lumterm", "LumTerm")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.title, "Lum Terminal");
        assert_eq!(config.window.width, 800.0);
        assert_eq!(config.window.height, 500.0);
        assert!(config.shell.program.is_empty());
        assert_eq!(config.terminal.font_size, 11.0);
        assert_eq!(config.terminal.scrollback_lines, 10_000);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.window.title, config.window.title);
        assert_eq!(parsed.terminal.scrollback_lines, config.terminal.scrollback_lines);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[shell]\nprogram = \"/bin/zsh\"\n").unwrap();
        assert_eq!(parsed.shell.program, "/bin/zsh");
        assert_eq!(parsed.window.title, "Lum Terminal");
        assert_eq!(parsed.terminal.font_size, 11.0);
    }
}
