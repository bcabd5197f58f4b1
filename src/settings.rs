use crate::selection::expanded::ExpandedGeometry;
use crate::selection::placement::MenuGeometry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Timing constants of the selection heuristics, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Minimum press duration for a down/up pair to count as a drag-selection.
    #[serde(default = "default_drag_threshold_ms")]
    pub drag_threshold_ms: u64,
    /// Delay between a plain click and the resulting click-outside signal.
    #[serde(default = "default_click_outside_delay_ms")]
    pub click_outside_delay_ms: u64,
    /// Time given to the foreign application to write the clipboard after the
    /// copy chord was sent.
    #[serde(default = "default_copy_settle_ms")]
    pub copy_settle_ms: u64,
    /// Pause before the single extraction retry.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_drag_threshold_ms() -> u64 {
    200
}

fn default_click_outside_delay_ms() -> u64 {
    200
}

fn default_copy_settle_ms() -> u64 {
    50
}

fn default_retry_delay_ms() -> u64 {
    50
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            drag_threshold_ms: default_drag_threshold_ms(),
            click_outside_delay_ms: default_click_outside_delay_ms(),
            copy_settle_ms: default_copy_settle_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Master switch of the selection menu. Toggling it installs or removes the
    /// global mouse hook and creates or destroys both overlay windows.
    #[serde(default)]
    pub glider_enabled: bool,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional log file. When absent logs only go to stderr.
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub menu: MenuGeometry,
    #[serde(default)]
    pub expanded: ExpandedGeometry,
    #[serde(default)]
    pub timing: TimingSettings,
    /// Vertical distance (logical px) between consecutive selections above
    /// which the placement bias resets to "above".
    #[serde(default = "default_band_reset_px")]
    pub band_reset_px: i32,
    /// Helper executable reporting whether the OS has an active text
    /// selection. Only consulted on Windows.
    #[serde(default)]
    pub selection_probe_path: Option<String>,
}

fn default_band_reset_px() -> i32 {
    200
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            glider_enabled: false,
            debug_logging: false,
            log_file: None,
            menu: MenuGeometry::default(),
            expanded: ExpandedGeometry::default(),
            timing: TimingSettings::default(),
            band_reset_px: default_band_reset_px(),
            selection_probe_path: None,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Log file to use: the configured one, else `glider.log` in the user's
    /// local data directory when debug logging is on.
    pub fn resolved_log_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.log_file {
            return Some(PathBuf::from(path));
        }
        if !self.debug_logging {
            return None;
        }
        dirs_next::data_local_dir().map(|dir| dir.join("glider").join("glider.log"))
    }
}
