// src/config.rs

//! Defines the configuration structures for the image worker and screen buffers.
//!
//! Every struct deserializes with `#[serde(default)]`, so a configuration file
//! only needs to name the settings it changes. The process-wide [`CONFIG`] is
//! loaded once from the JSON file named by `CORE_TERM_IMAGE_CONFIG`, or falls
//! back to defaults.

use crate::palette::PaletteName;
use anyhow::{Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "CORE_TERM_IMAGE_CONFIG";

/// Hard ceiling for a single decoded image, whatever the config file says.
pub const HARD_MAX_IMAGE_BYTES: usize = 256 * 1024 * 1024;

/// Default output limit: a 4096x4096 RGBA image.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 4096 * 4096 * 4;

/// Process-wide configuration, loaded on first access.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::load_or_default);

// --- Top-Level Configuration Structure ---

/// Represents the complete configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Image worker settings.
    pub worker: WorkerConfig,
    /// Defaults for decode sessions started by the client.
    pub decoder: DecoderConfig,
    /// Screen buffer settings.
    pub screen: ScreenConfig,
}

impl Config {
    /// Loads the config from `CORE_TERM_IMAGE_CONFIG` if set, else defaults.
    ///
    /// A missing or malformed file is logged and replaced by defaults; the
    /// terminal should still start with a broken config file.
    pub fn load_or_default() -> Self {
        let Ok(path) = std::env::var(CONFIG_PATH_ENV) else {
            info!("Config: {} not set, using defaults", CONFIG_PATH_ENV);
            return Config::default();
        };

        match Config::from_file(Path::new(&path)) {
            Ok(config) => {
                info!("Config: loaded from {}", path);
                config
            }
            Err(e) => {
                warn!("Config: failed to load {}: {:#}. Using defaults.", path, e);
                Config::default()
            }
        }
    }

    /// Reads and validates a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Config::from_json(&text)
    }

    /// Parses a JSON config string and clamps values to safe ranges.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut config: Config =
            serde_json::from_str(text).context("Failed to parse config JSON")?;
        config.worker.clamp();
        Ok(config)
    }
}

// --- Worker Configuration ---

/// Settings for the decode worker thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Largest RGBA output the worker will allocate for one image.
    /// Clamped to `HARD_MAX_IMAGE_BYTES`.
    pub max_image_bytes: usize,
    /// Capacity of the request channel into the worker thread.
    pub request_queue_depth: usize,
    /// Size of the reusable chunk buffer the client streams `PUT`s with.
    pub chunk_size: usize,
    /// How long `ping` waits for a `PONG`.
    pub ping_timeout_ms: u64,
}

impl WorkerConfig {
    fn clamp(&mut self) {
        if self.max_image_bytes > HARD_MAX_IMAGE_BYTES {
            warn!(
                "Config: max_image_bytes {} exceeds hard limit, clamping to {}",
                self.max_image_bytes, HARD_MAX_IMAGE_BYTES
            );
            self.max_image_bytes = HARD_MAX_IMAGE_BYTES;
        }
        self.request_queue_depth = self.request_queue_depth.max(1);
        self.chunk_size = self.chunk_size.max(1);
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            request_queue_depth: 16,
            chunk_size: 64 * 1024,
            ping_timeout_ms: 1000,
        }
    }
}

// --- Decoder Configuration ---

/// Session parameters the client uses when the caller does not supply any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoderConfig {
    /// Background fill, packed RGBA (`r | g << 8 | b << 16 | a << 24`).
    pub fill_color: u32,
    /// Palette the engine starts with.
    pub palette: PaletteName,
    /// Number of color registers the engine may use.
    pub palette_limit: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            fill_color: 0xFF00_0000, // opaque black
            palette: PaletteName::Vt340Color,
            palette_limit: 256,
        }
    }
}

// --- Screen Configuration ---

/// Settings for the normal/alternate screen buffer pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreenConfig {
    pub columns: usize,
    pub rows: usize,
    /// Scrollback lines kept by the normal buffer. The alternate buffer keeps none.
    pub scrollback_lines: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        ScreenConfig {
            columns: 80,
            rows: 24,
            scrollback_lines: 1000,
        }
    }
}
