//! qrcanvas
//!
//! Turns text into QR code images: a symbol source encodes the text into a
//! module grid, the rasterizer paints that grid into an RGBA bitmap, and the
//! exporter serializes the bitmap as PNG, JPEG or SVG with a filesystem-safe
//! filename.
//!
//! # Features
//!
//! - **qr** (default): `QrCodeSource`, a symbol source backed by the `qrcode` crate
//! - **Session state**: a caller-owned [`Session`] keeps the current symbol so
//!   exports never re-encode
//! - **Async facade**: [`Studio`] runs a session on a worker thread with
//!   last-request-wins semantics
//!
//! # Example
//!
//! ```no_run
//! use qrcanvas::{ErrorCorrectionLevel, ImageFormat, RasterConfig, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(qrcanvas::new_symbol_source());
//! session.generate(
//!     "https://example.com",
//!     ErrorCorrectionLevel::M,
//!     RasterConfig::default(),
//!     ImageFormat::Png,
//! )?;
//! let artifact = session.export_current(None)?;
//! println!("{} ({} bytes)", artifact.suggested_filename, artifact.bytes.len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod classify;
pub mod export;
pub mod platform;
pub mod rendering;
pub mod session;

// Symbol source backed by the `qrcode` crate
#[cfg(feature = "qr")]
pub mod qr;

// Async-friendly session API (worker-backed abstraction)
pub mod async_api;

pub use async_api::Studio;
pub use classify::{classify, ContentKind};
pub use export::{derive_filename, ExportArtifact};
pub use rendering::{raster::rasterize, Bitmap};
pub use session::{Adjustment, Outcome, RequestKind, Session};

/// Longest source text accepted by [`Session::generate`], in characters.
pub const MAX_SOURCE_CHARS: usize = 2000;

/// Output sizes offered by the size selector. Any positive size up to
/// [`MAX_TARGET_SIZE_PX`] is accepted.
pub const SIZE_PRESETS: [u32; 4] = [200, 300, 400, 500];

/// Largest bitmap side the rasterizer will allocate (256 MiB of RGBA8).
pub const MAX_TARGET_SIZE_PX: u32 = 8192;

/// An RGBA8 color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (leading `#` optional)
    pub fn from_hex(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(Error::InvalidConfig(format!("invalid color '{}'", s)));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| Error::InvalidConfig(format!("invalid color '{}'", s)))
        };
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }

    /// `#rrggbb`, ignoring alpha
    pub fn to_rgb_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "{}", self.to_rgb_hex())
        } else {
            write!(f, "{}{:02x}", self.to_rgb_hex(), self.a)
        }
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Color::from_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Color::from_hex(&s)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

/// Raster configuration
///
/// `target_size_px` is the requested side length of the output image. The
/// rasterizer rounds it down to a whole number of pixels per module, so the
/// actual image is usually a little smaller than requested.
///
/// # Examples
///
/// ```
/// let cfg = qrcanvas::RasterConfig::default();
/// assert_eq!(cfg.target_size_px, 300);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterConfig {
    /// Requested side length in pixels (must be > 0)
    pub target_size_px: u32,
    /// Color of dark modules
    pub foreground: Color,
    /// Color of light modules and the rest of the canvas
    pub background: Color,
}

impl RasterConfig {
    pub fn with_size(target_size_px: u32) -> Self {
        Self {
            target_size_px,
            ..Default::default()
        }
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            target_size_px: 300,
            foreground: Color::BLACK,
            background: Color::WHITE,
        }
    }
}

/// QR error-correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorCorrectionLevel {
    /// ~7% recovery
    L,
    /// ~15% recovery
    #[default]
    M,
    /// ~25% recovery
    Q,
    /// ~30% recovery
    H,
}

impl fmt::Display for ErrorCorrectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCorrectionLevel::L => "L",
            ErrorCorrectionLevel::M => "M",
            ErrorCorrectionLevel::Q => "Q",
            ErrorCorrectionLevel::H => "H",
        };
        f.write_str(s)
    }
}

impl FromStr for ErrorCorrectionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(ErrorCorrectionLevel::L),
            "M" => Ok(ErrorCorrectionLevel::M),
            "Q" => Ok(ErrorCorrectionLevel::Q),
            "H" => Ok(ErrorCorrectionLevel::H),
            other => Err(Error::InvalidConfig(format!(
                "unknown error-correction level '{}'",
                other
            ))),
        }
    }
}

/// Export image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Svg,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Svg];

    /// Lowercase filename extension (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Svg => "svg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "svg" => Ok(ImageFormat::Svg),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// An immutable square grid of QR modules
///
/// Modules are stored row-major; `true` means dark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolGrid {
    size: usize,
    modules: Vec<bool>,
}

impl SymbolGrid {
    /// Build a grid of `size × size` modules from row-major data
    pub fn new(size: usize, modules: Vec<bool>) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidGrid("module count must be at least 1".into()));
        }
        let expected = size.checked_mul(size).ok_or_else(|| {
            Error::InvalidGrid(format!("module count {} is too large", size))
        })?;
        if modules.len() != expected {
            return Err(Error::InvalidGrid(format!(
                "expected {} modules for a {}x{} grid, got {}",
                expected,
                size,
                size,
                modules.len()
            )));
        }
        Ok(Self { size, modules })
    }

    /// Build a grid from rows; every row must be as long as there are rows
    pub fn from_rows(rows: &[Vec<bool>]) -> Result<Self> {
        let size = rows.len();
        if rows.iter().any(|r| r.len() != size) {
            return Err(Error::InvalidGrid("grid rows must form a square".into()));
        }
        Self::new(size, rows.concat())
    }

    /// Side length N of the grid
    pub fn module_count(&self) -> usize {
        self.size
    }

    /// Whether the module at `(row, col)` is dark. Out-of-range lookups are light.
    pub fn dark(&self, row: usize, col: usize) -> bool {
        if row >= self.size || col >= self.size {
            return false;
        }
        self.modules[row * self.size + col]
    }

    /// Number of dark modules
    pub fn dark_count(&self) -> usize {
        self.modules.iter().filter(|d| **d).count()
    }
}

/// Produces module grids for text at a given error-correction level
///
/// The QR algorithm itself lives behind this trait; the rest of the crate
/// only consumes finished grids.
pub trait SymbolSource: Send {
    /// Encode `text`, failing with [`Error::EncodingError`] when it does not
    /// fit at `level`.
    fn encode(&self, text: &str, level: ErrorCorrectionLevel) -> Result<SymbolGrid>;
}

impl<S: SymbolSource + ?Sized> SymbolSource for Box<S> {
    fn encode(&self, text: &str, level: ErrorCorrectionLevel) -> Result<SymbolGrid> {
        (**self).encode(text, level)
    }
}

/// Adapts a closure into a [`SymbolSource`] (handy for fixtures)
pub struct FnSource<F>(pub F);

impl<F> SymbolSource for FnSource<F>
where
    F: Fn(&str, ErrorCorrectionLevel) -> Result<SymbolGrid> + Send,
{
    fn encode(&self, text: &str, level: ErrorCorrectionLevel) -> Result<SymbolGrid> {
        (self.0)(text, level)
    }
}

/// Create the default symbol source
#[cfg(feature = "qr")]
pub fn new_symbol_source() -> qr::QrCodeSource {
    qr::QrCodeSource::new()
}

/// User-facing generation settings
///
/// Loaded from JSON by the CLI; every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub size: u32,
    pub level: ErrorCorrectionLevel,
    pub format: ImageFormat,
    pub foreground: Color,
    pub background: Color,
}

impl Default for Settings {
    fn default() -> Self {
        let raster = RasterConfig::default();
        Self {
            size: raster.target_size_px,
            level: ErrorCorrectionLevel::default(),
            format: ImageFormat::default(),
            foreground: raster.foreground,
            background: raster.background,
        }
    }
}

impl Settings {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(s)
            .map_err(|e| Error::InvalidConfig(format!("settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidConfig("size must be greater than 0".into()));
        }
        if self.size > MAX_TARGET_SIZE_PX {
            return Err(Error::InvalidConfig(format!(
                "size {} exceeds the maximum of {}",
                self.size, MAX_TARGET_SIZE_PX
            )));
        }
        Ok(())
    }

    pub fn raster_config(&self) -> RasterConfig {
        RasterConfig {
            target_size_px: self.size,
            foreground: self.foreground,
            background: self.background,
        }
    }
}
