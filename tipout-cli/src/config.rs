//! Configuration loading and parsing

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tipout_core::{PulseOptions, RenderOptions};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub strip: StripConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripConfig {
    /// Number of LED pixels on the strip
    #[serde(default = "default_led_count")]
    pub led_count: u16,
    /// SPI bus driving the strip (0 = /dev/spidev0.0)
    #[serde(default)]
    pub spi_bus: u8,
    /// Global brightness, 0.0 to 1.0
    #[serde(default = "default_brightness")]
    pub brightness: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BehaviorConfig {
    /// Clear the active bin automatically after this many seconds
    #[serde(default)]
    pub auto_clear_secs: Option<u64>,
    /// Turn the strip off when the process exits
    #[serde(default = "default_true")]
    pub clear_on_exit: bool,
    /// Pulse (breathe) the active bin instead of holding it solid
    #[serde(default)]
    pub pulse: bool,
    /// Duration of one pulse cycle in seconds
    #[serde(default = "default_pulse_period")]
    pub pulse_period_secs: u64,
    /// Frames per second while pulsing
    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DataConfig {
    /// Bin mapping CSV (code, bin_id, led_indices, color)
    pub bins: Option<PathBuf>,
    /// Sales order CSV (sales_order_id, code)
    pub orders: Option<PathBuf>,
}

fn default_led_count() -> u16 {
    55
}

fn default_brightness() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_pulse_period() -> u64 {
    5
}

fn default_fps() -> u32 {
    30
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            led_count: default_led_count(),
            spi_bus: 0,
            brightness: default_brightness(),
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            auto_clear_secs: None,
            clear_on_exit: default_true(),
            pulse: false,
            pulse_period_secs: default_pulse_period(),
            fps: default_fps(),
        }
    }
}

impl BehaviorConfig {
    /// Translate the configured behavior into render loop options
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            auto_clear: self.auto_clear_secs.map(Duration::from_secs),
            clear_on_exit: self.clear_on_exit,
            pulse: self.pulse.then(|| PulseOptions {
                period: Duration::from_secs(self.pulse_period_secs.max(1)),
                fps: self.fps.max(1),
            }),
            ..RenderOptions::default()
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
