//! Application configuration.

use anyhow::{Context, bail};
use caseboard_core::{FileClient, SerializableColor};
use caseboard_render::ExportOptions;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings read from an optional JSON file and overridden by flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding one JSON file per board.
    pub data_dir: PathBuf,
    /// Where exported images are written.
    pub export_dir: PathBuf,
    /// Device pixels per canvas unit in exports.
    pub pixel_ratio: f64,
    /// Smallest exported image, in device pixels.
    pub min_export_width: f64,
    pub min_export_height: f64,
    /// Fill beneath exported content.
    pub background: SerializableColor,
    /// Draw text in exports using system fonts.
    pub system_fonts: bool,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let export = ExportOptions::default();
        Self {
            data_dir: FileClient::default_path()
                .unwrap_or_else(|_| PathBuf::from("caseboard").join("boards")),
            export_dir: PathBuf::from("."),
            pixel_ratio: export.pixel_ratio,
            min_export_width: export.min_size.width,
            min_export_height: export.min_size.height,
            background: SerializableColor::white(),
            system_fonts: export.load_system_fonts,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Read `path`, or fall back to defaults when none is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0) {
            bail!("pixel_ratio must be a positive number, got {}", self.pixel_ratio);
        }
        if self.min_export_width < 0.0 || self.min_export_height < 0.0 {
            bail!("minimum export size cannot be negative");
        }
        Ok(())
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions::default()
            .with_pixel_ratio(self.pixel_ratio)
            .with_min_size(Size::new(self.min_export_width, self.min_export_height))
            .with_background(self.background.into())
            .with_system_fonts(self.system_fonts)
    }
}

/// Parse a CSS color string like "#ff0000".
pub fn parse_color(s: &str) -> Option<SerializableColor> {
    let hex = s.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(SerializableColor::new(channel(0)?, channel(2)?, channel(4)?, 255))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_export_pipeline() {
        let options = AppConfig::default().export_options();
        assert_eq!(options.pixel_ratio, 2.0);
        assert_eq!(options.min_size, Size::new(800.0, 600.0));
        assert_eq!(options.background, peniko::Color::WHITE);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "pixel_ratio": 3.0, "background": {{ "r": 1, "g": 2, "b": 3, "a": 255 }} }}"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.pixel_ratio, 3.0);
        assert_eq!(config.background, SerializableColor::new(1, 2, 3, 255));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "pixel_ratio": 0 }}"#).unwrap();
        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#0a0B0c"), Some(SerializableColor::new(10, 11, 12, 255)));
        assert_eq!(parse_color("red"), None);
    }

    #[test]
    fn test_parse_color_rejects_multibyte_input() {
        // Seven bytes, but the second char spans two of them.
        assert_eq!("#1\u{e9}234".len(), 7);
        assert_eq!(parse_color("#1\u{e9}234"), None);
        assert_eq!(parse_color("#12345\u{e9}"), None);
    }
}
