//! Exporter: bitmap → encoded image bytes, plus filename derivation.

use std::fmt::Write as _;
use std::str::FromStr;

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use log::debug;

use crate::rendering::paint::PaintCommand;
use crate::rendering::Bitmap;
use crate::{Color, Error, ImageFormat, Result};

/// Longest filename stem produced by [`derive_filename`]
pub const MAX_FILENAME_STEM: usize = 50;

/// Stem used when nothing usable is left of the source text
pub const FALLBACK_STEM: &str = "qrcode";

const JPEG_QUALITY: u8 = 100;

/// An encoded image ready to hand to a download, clipboard or print sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub suggested_filename: String,
}

impl ExportArtifact {
    /// `data:<mime>;base64,...` form, for embedding or pasting
    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.mime_type, encoded)
    }
}

/// Encode `bitmap` in `format`, returning the bytes and their MIME type
pub fn encode(bitmap: &Bitmap, format: ImageFormat) -> Result<(Vec<u8>, &'static str)> {
    let bytes = match format {
        ImageFormat::Png => encode_png(bitmap)?,
        ImageFormat::Jpeg => encode_jpeg(bitmap)?,
        ImageFormat::Svg => encode_svg(bitmap).into_bytes(),
    };
    debug!("encoded {}x{} bitmap as {} ({} bytes)", bitmap.width, bitmap.height, format, bytes.len());
    Ok((bytes, format.mime_type()))
}

/// Like [`encode`] but takes the format by name (`png`, `jpeg`/`jpg`, `svg`)
pub fn encode_named(bitmap: &Bitmap, format: &str) -> Result<(Vec<u8>, &'static str)> {
    encode(bitmap, ImageFormat::from_str(format)?)
}

/// Encode `bitmap` and name it after `source_text`
pub fn export(bitmap: &Bitmap, format: ImageFormat, source_text: &str) -> Result<ExportArtifact> {
    let (bytes, mime_type) = encode(bitmap, format)?;
    Ok(ExportArtifact {
        bytes,
        mime_type,
        suggested_filename: derive_filename(source_text, format),
    })
}

fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, bitmap.width, bitmap.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| Error::Other(format!("PNG header: {}", e)))?;
        writer
            .write_image_data(&bitmap.pixels)
            .map_err(|e| Error::Other(format!("PNG data: {}", e)))?;
    }
    Ok(buf)
}

fn encode_jpeg(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .encode(
            &bitmap.to_rgb8(),
            bitmap.width,
            bitmap.height,
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| Error::Other(format!("JPEG: {}", e)))?;
    Ok(buf)
}

fn svg_fill(color: &Color) -> String {
    if color.a == 255 {
        format!("fill=\"{}\"", color.to_rgb_hex())
    } else {
        format!(
            "fill=\"{}\" fill-opacity=\"{:.3}\"",
            color.to_rgb_hex(),
            color.a as f32 / 255.0
        )
    }
}

fn encode_svg(bitmap: &Bitmap) -> String {
    let (w, h) = (bitmap.width, bitmap.height);
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = write!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" shape-rendering=\"crispEdges\">"
    );
    for cmd in bitmap.display_list() {
        match cmd {
            PaintCommand::Clear { color } => {
                let _ = write!(out, "<rect x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\" {}/>", svg_fill(color));
            }
            PaintCommand::SolidRect { rect, color } => {
                let _ = write!(
                    out,
                    "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" {}/>",
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    svg_fill(color)
                );
            }
        }
    }
    out.push_str("</svg>\n");
    out
}

/// Derive a filesystem-safe filename from arbitrary source text.
///
/// Drops a leading `http://`/`https://` and `www.`, maps every character
/// outside `[A-Za-z0-9.-]` to `_`, keeps at most 50 characters and falls back
/// to `qrcode` when nothing is left. Never fails.
///
/// ```
/// use qrcanvas::{derive_filename, ImageFormat};
/// assert_eq!(
///     derive_filename("https://www.example.com/page?x=1", ImageFormat::Png),
///     "example.com_page_x_1.png"
/// );
/// ```
pub fn derive_filename(source_text: &str, format: ImageFormat) -> String {
    let rest = source_text
        .strip_prefix("http://")
        .or_else(|| source_text.strip_prefix("https://"))
        .unwrap_or(source_text);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);

    let mut stem: String = rest
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_STEM)
        .collect();
    if stem.is_empty() {
        stem.push_str(FALLBACK_STEM);
    }

    format!("{}.{}", stem, format.extension())
}
