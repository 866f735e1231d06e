//! Provides the run configuration and background parsing.
//!
//! A [`RunConfig`] is built once at startup (usually from the command line),
//! validated with [`RunConfig::validate`], and then shared read-only by every
//! stage of the batch.
//!
//! # Examples
//! ```
//! use thumbkit::config::{Background, RunConfig};
//!
//! let config = RunConfig {
//!     background: Background::parse("#fff"),
//!     ..RunConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(config.background, Background::Color([1.0, 1.0, 1.0, 1.0]));
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Flat background used when the background string is not recognized.
pub const FALLBACK_BACKGROUND: [f32; 4] = [0.05, 0.05, 0.05, 1.0];

/// Largest accepted output edge length, in pixels.
pub const MAX_RESOLUTION: u32 = 8192;

/// Errors raised while validating a [`RunConfig`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("resolution must be a positive number of pixels")]
    ZeroResolution,
    #[error("resolution {0} exceeds the maximum of {max} pixels", max = MAX_RESOLUTION)]
    ResolutionTooLarge(u32),
    #[error("margin must be a finite factor >= 1.0, got {0}")]
    InvalidMargin(f32),
    #[error("camera angle must be finite, got ({0}, {1})")]
    InvalidAngle(f32, f32),
    #[error("at least one file extension is required")]
    NoExtensions,
    #[error("sample count must be at least 1")]
    ZeroSamples,
    #[error("camera offset must be finite, got {0}")]
    InvalidOffset(f32),
    #[error("invalid shard '{0}', expected INDEX/COUNT with INDEX < COUNT")]
    InvalidShard(String),
}

/// How the area around the model is filled.
///
/// # Examples
/// ```
/// use thumbkit::config::Background;
///
/// assert_eq!(Background::parse("transparent"), Background::Transparent);
/// assert_eq!(Background::parse("black").fill(), Some([0.0, 0.0, 0.0, 1.0]));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Background {
    /// Per-pixel alpha; pixels not covered by geometry stay fully transparent.
    Transparent,
    /// Opaque flat fill with a normalized RGBA color.
    Color([f32; 4]),
}

impl Background {
    /// Parses a background string.
    ///
    /// Accepts `transparent`, `white`, `black` (all case-insensitive) and
    /// 3- or 6-digit hex colors with an optional leading `#`. Anything else
    /// maps to a dark gray fill rather than failing.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value.to_lowercase().as_str() {
            "transparent" => Background::Transparent,
            "white" => Background::Color([1.0, 1.0, 1.0, 1.0]),
            "black" => Background::Color([0.0, 0.0, 0.0, 1.0]),
            _ => Background::Color(color_from_hex(value).unwrap_or(FALLBACK_BACKGROUND)),
        }
    }

    /// Returns the flat fill color, or `None` for a transparent background.
    pub fn fill(&self) -> Option<[f32; 4]> {
        match self {
            Background::Transparent => None,
            Background::Color(rgba) => Some(*rgba),
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Background::Transparent
    }
}

/// Parses a hex color (`#rgb`, `#rrggbb`, with or without `#`) to normalized RGBA.
///
/// The shorthand form doubles each digit, so `abc` reads as `aabbcc`.
///
/// # Examples
/// ```
/// use thumbkit::config::color_from_hex;
///
/// assert_eq!(color_from_hex("#abc"), color_from_hex("AABBCC"));
/// assert_eq!(color_from_hex("#ff0000"), Some([1.0, 0.0, 0.0, 1.0]));
/// assert_eq!(color_from_hex("#12345"), None);
/// ```
pub fn color_from_hex(value: &str) -> Option<[f32; 4]> {
    let digits = value.strip_prefix('#').unwrap_or(value);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };

    let channel = |i: usize| -> Option<f32> {
        u8::from_str_radix(&expanded[i..i + 2], 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };

    Some([channel(0)?, channel(2)?, channel(4)?, 1.0])
}

/// Camera direction as elevation above the XY plane and azimuth around Z, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraAngle {
    pub elevation_deg: f32,
    pub azimuth_deg: f32,
}

impl CameraAngle {
    pub fn new(elevation_deg: f32, azimuth_deg: f32) -> Self {
        Self {
            elevation_deg,
            azimuth_deg,
        }
    }

    /// Returns `(elevation, azimuth)` in radians.
    pub fn radians(&self) -> (f32, f32) {
        (self.elevation_deg.to_radians(), self.azimuth_deg.to_radians())
    }
}

impl Default for CameraAngle {
    fn default() -> Self {
        Self::new(60.0, 30.0)
    }
}

/// Selects one disjoint slice of the discovered files for multi-process runs.
///
/// Shard `index` of `count` keeps every `count`-th file starting at `index`.
///
/// # Examples
/// ```
/// use thumbkit::config::Shard;
///
/// let shard: Shard = "1/3".parse().unwrap();
/// assert_eq!(shard.select(vec!['a', 'b', 'c', 'd', 'e']), vec!['b', 'e']);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shard {
    pub index: usize,
    pub count: usize,
}

impl Shard {
    pub fn select<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .enumerate()
            .filter(|(i, _)| i % self.count == self.index)
            .map(|(_, item)| item)
            .collect()
    }
}

impl FromStr for Shard {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidShard(s.to_string());
        let (index, count) = s.split_once('/').ok_or_else(invalid)?;
        let index: usize = index.trim().parse().map_err(|_| invalid())?;
        let count: usize = count.trim().parse().map_err(|_| invalid())?;
        if count == 0 || index >= count {
            return Err(invalid());
        }
        Ok(Shard { index, count })
    }
}

/// Settings for one batch run. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Edge length of the square output image, in pixels.
    pub resolution: u32,
    pub background: Background,
    pub angle: CameraAngle,
    /// Ortho-scale padding factor applied to the model footprint.
    pub margin: f32,
    /// Accepted file extensions, lower-case and without the dot.
    pub extensions: Vec<String>,
    /// Constant shift of the camera along world X after spherical placement.
    pub camera_offset: f32,
    /// Renderer sample budget per pixel.
    pub samples: u32,
    pub shard: Option<Shard>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("thumbnails"),
            resolution: 512,
            background: Background::Transparent,
            angle: CameraAngle::default(),
            margin: 1.15,
            extensions: vec!["obj".to_string()],
            camera_offset: -100.0,
            samples: 64,
            shard: None,
        }
    }
}

impl RunConfig {
    /// Checks every field that could make the run meaningless.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution == 0 {
            return Err(ConfigError::ZeroResolution);
        }
        if self.resolution > MAX_RESOLUTION {
            return Err(ConfigError::ResolutionTooLarge(self.resolution));
        }
        if !self.margin.is_finite() || self.margin < 1.0 {
            return Err(ConfigError::InvalidMargin(self.margin));
        }
        if !self.angle.elevation_deg.is_finite() || !self.angle.azimuth_deg.is_finite() {
            return Err(ConfigError::InvalidAngle(
                self.angle.elevation_deg,
                self.angle.azimuth_deg,
            ));
        }
        if self.extensions.iter().all(|e| e.is_empty()) {
            return Err(ConfigError::NoExtensions);
        }
        if self.samples == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if !self.camera_offset.is_finite() {
            return Err(ConfigError::InvalidOffset(self.camera_offset));
        }
        if let Some(shard) = self.shard {
            if shard.count == 0 || shard.index >= shard.count {
                return Err(ConfigError::InvalidShard(format!(
                    "{}/{}",
                    shard.index, shard.count
                )));
            }
        }
        Ok(())
    }
}

/// Lower-cases extensions, strips a leading dot and drops blanks and duplicates.
///
/// # Examples
/// ```
/// use thumbkit::config::normalize_extensions;
///
/// assert_eq!(normalize_extensions([".OBJ", "fbx", "obj", " "]), vec!["obj", "fbx"]);
/// ```
pub fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for ext in extensions {
        let ext = ext.as_ref().trim();
        let ext = ext.strip_prefix('.').unwrap_or(ext).to_lowercase();
        if !ext.is_empty() && !out.contains(&ext) {
            out.push(ext);
        }
    }
    out
}
