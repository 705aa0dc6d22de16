// =============================================================================
// CONFIGURATION - Startup constants with an optional vre.toml override
// =============================================================================
//
// The defaults below are the engine's compiled-in startup configuration.
// A vre.toml in the working directory may override the window, shader and
// debug sections; the required extension and feature sets never change.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "vre.toml";

pub const WINDOW_TITLE: &str = "VULKAN RENDERING ENGINE";
pub const WINDOW_WIDTH: u32 = 1920;
pub const WINDOW_HEIGHT: u32 = 1080;

pub const SHADER_PATH: &str = "shaders/slang.spv";

/// Validation layers are only ever compiled into non-optimized builds.
pub const VALIDATION_AVAILABLE: bool = cfg!(debug_assertions);

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: WINDOW_TITLE.to_string(),
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
        }
    }
}

/// Which rendering backend drives the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsApi {
    #[default]
    Vulkan,
}

/// Graphics settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub api: GraphicsApi,
    pub shader_path: PathBuf,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            api: GraphicsApi::default(),
            shader_path: PathBuf::from(SHADER_PATH),
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a specific path; a missing file means defaults.
    ///
    /// Runs before the logger exists, so it reports through the returned
    /// error instead of logging.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validation is requested by config but gated on the build profile.
    pub fn validation_enabled(&self) -> bool {
        VALIDATION_AVAILABLE && self.debug.validation_layers
    }
}
