use serde::Deserialize;

/// Immutable description of one tile pyramid plus the viewer's zoom range.
///
/// Zoom convention: level 1 is full resolution, each higher integer level
/// halves the image. `min_tile_zoom..=max_tile_zoom` is the range for which
/// tiles exist on disk; `min_zoom..=max_zoom` is the continuous range the
/// viewer may animate through.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PyramidConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    #[serde(default = "default_min_tile_zoom")]
    pub min_tile_zoom: u32,
    #[serde(default = "default_max_tile_zoom")]
    pub max_tile_zoom: u32,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,
    #[serde(default)]
    pub tile_path: String,
    /// Optional initial center in image coordinates; image midpoint if absent.
    #[serde(default)]
    pub center: Option<[f64; 2]>,
}

fn default_width() -> u32 {
    158_701
}

fn default_height() -> u32 {
    26_180
}

fn default_tile_size() -> u32 {
    512
}

fn default_min_tile_zoom() -> u32 {
    1
}

fn default_max_tile_zoom() -> u32 {
    8
}

fn default_min_zoom() -> f64 {
    1.0
}

fn default_max_zoom() -> f64 {
    8.0
}

fn default_zoom() -> f64 {
    6.0
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            tile_size: default_tile_size(),
            min_tile_zoom: default_min_tile_zoom(),
            max_tile_zoom: default_max_tile_zoom(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            default_zoom: default_zoom(),
            tile_path: String::new(),
            center: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    TileZoomRangeInverted { min: u32, max: u32 },
    ZeroTileSize,
    EmptyImage { width: u32, height: u32 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::TileZoomRangeInverted { min, max } => {
                write!(f, "tile zoom range is inverted: min={min} max={max}")
            }
            ConfigError::ZeroTileSize => write!(f, "tile edge length must be positive"),
            ConfigError::EmptyImage { width, height } => {
                write!(f, "image dimensions must be positive: {width}x{height}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl PyramidConfig {
    /// Fatal checks performed once at session construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_tile_zoom > self.max_tile_zoom {
            return Err(ConfigError::TileZoomRangeInverted {
                min: self.min_tile_zoom,
                max: self.max_tile_zoom,
            });
        }
        if self.tile_size == 0 {
            return Err(ConfigError::ZeroTileSize);
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}
