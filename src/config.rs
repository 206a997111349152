//! Renderer configuration, loaded from TOML.
//!
//! ```toml
//! width = 640
//! height = 400
//! fov_degrees = 90
//! max_steps = 64
//!
//! [shade]
//! distance_shift = 11
//! side_bias = 2
//! levels = 32
//! ```
//!
//! Every key is optional; missing keys fall back to the defaults below.

use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

use crate::fixed::Fixed;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Frame-buffer width in pixels.
    pub width: usize,
    /// Frame-buffer height in pixels.
    pub height: usize,
    /// Horizontal field of view.
    pub fov_degrees: i32,
    /// DDA gives up after this many cell crossings per column.
    pub max_steps: usize,
    /// Plane heights are bucketed by `raw >> plane_height_shift`.
    pub plane_height_shift: u32,
    /// `1 << texels_per_unit_shift` texels cover one world unit (one cell).
    pub texels_per_unit_shift: u32,
    pub shade: ShadeConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadeConfig {
    /// One shade level per `1 << distance_shift` raw depth units.
    pub distance_shift: u32,
    /// Extra darkening applied to walls crossed on the Y side.
    pub side_bias: u8,
    /// Number of shade tables the provider exposes (`0` = brightest).
    pub levels: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 200,
            fov_degrees: 90,
            max_steps: 64,
            plane_height_shift: 2,
            texels_per_unit_shift: 6,
            shade: ShadeConfig::default(),
        }
    }
}

impl Default for ShadeConfig {
    fn default() -> Self {
        Self {
            distance_shift: 11,
            side_bias: 2,
            levels: 32,
        }
    }
}

impl ShadeConfig {
    /// Shade table index for a surface `depth` away; walls crossed on the
    /// Y side get `side_bias` extra levels.
    #[inline(always)]
    pub fn level(&self, depth: Fixed, y_side: bool) -> u8 {
        let mut level = depth.raw().max(0) as u32 >> self.distance_shift.min(31);
        if y_side {
            level += self.side_bias as u32;
        }
        level.min(self.levels.max(1) as u32 - 1) as u8
    }
}

impl RenderConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(src)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "resolution {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if self.width > i16::MAX as usize || self.height > i16::MAX as usize {
            return Err(ConfigError::Invalid(format!(
                "resolution {}x{} too large",
                self.width, self.height
            )));
        }
        if !(1..180).contains(&self.fov_degrees) {
            return Err(ConfigError::Invalid(format!(
                "fov_degrees {} outside 1..180",
                self.fov_degrees
            )));
        }
        if self.shade.levels == 0 || self.shade.levels > 256 {
            return Err(ConfigError::Invalid(format!(
                "shade.levels {} outside 1..=256",
                self.shade.levels
            )));
        }
        if self.shade.distance_shift > 31 {
            return Err(ConfigError::Invalid(format!(
                "shade.distance_shift {} above 31",
                self.shade.distance_shift
            )));
        }
        if self.texels_per_unit_shift > 10 {
            return Err(ConfigError::Invalid(
                "texels_per_unit_shift above 10 exceeds fixed-point precision".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(RenderConfig::from_toml_str("").unwrap(), RenderConfig::default());
    }

    #[test]
    fn partial_override() {
        let cfg = RenderConfig::from_toml_str(
            r#"
            width = 640
            [shade]
            side_bias = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.width, 640);
        assert_eq!(cfg.height, 200);
        assert_eq!(cfg.shade.side_bias, 0);
        assert_eq!(cfg.shade.levels, 32);
    }

    #[test]
    fn shade_level_grows_with_depth() {
        let shade = ShadeConfig::default();
        assert_eq!(shade.level(Fixed::ONE, false), 0);
        assert_eq!(shade.level(Fixed::ONE, true), 2);
        assert_eq!(shade.level(Fixed::from_int(8), false), 4);
        assert_eq!(shade.level(Fixed::from_int(1000), true), 31);
        assert_eq!(shade.level(-Fixed::ONE, false), 0);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            RenderConfig::from_toml_str("fov_degrees = 180"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RenderConfig::from_toml_str("width = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RenderConfig::from_toml_str("width = \"wide\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
