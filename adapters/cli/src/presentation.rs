//! Presentation settings read from a TOML file.

use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use crystals_core::TileTransform;
use serde::Deserialize;

/// Settings that control how rooms map onto pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PresentationConfig {
    /// Tile size and origin shared by every room.
    pub(crate) transform: TileTransform,
}

impl PresentationConfig {
    /// Reads and validates the configuration stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read presentation file at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid presentation file at {}", path.display()))
    }

    /// Parses configuration text. Missing keys keep their defaults.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("malformed presentation TOML")?;
        ensure!(
            config.transform.tile_size() > 0,
            "transform.tile_size must be positive"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::PresentationConfig;
    use crystals_core::{TileTransform, ORIGIN_X, ORIGIN_Y, TILE_SIZE};

    #[test]
    fn empty_file_uses_default_transform() {
        let config = PresentationConfig::parse("").expect("empty config is valid");
        assert_eq!(
            config.transform,
            TileTransform::new(TILE_SIZE, ORIGIN_X, ORIGIN_Y)
        );
    }

    #[test]
    fn partial_transform_keeps_remaining_defaults() {
        let config = PresentationConfig::parse("[transform]\ntile_size = 32\n")
            .expect("partial config is valid");
        assert_eq!(config.transform, TileTransform::new(32, ORIGIN_X, ORIGIN_Y));
    }

    #[test]
    fn full_transform_is_read() {
        let config = PresentationConfig::parse(
            "[transform]\ntile_size = 16\norigin_x = 0\norigin_y = -8\n",
        )
        .expect("full config is valid");
        assert_eq!(config.transform, TileTransform::new(16, 0, -8));
    }

    #[test]
    fn zero_tile_size_is_rejected() {
        assert!(PresentationConfig::parse("[transform]\ntile_size = 0\n").is_err());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(PresentationConfig::parse("[camera]\nzoom = 2\n").is_err());
    }
}
