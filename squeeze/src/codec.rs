//! Image decode / JPEG encode on top of the `image` crate.
//!
//! The set of accepted source formats is fixed at compile time: it is the intersection of the
//! `image` features enabled in `Cargo.toml` and [`SourceFormat::REGISTERED`]. Nothing here is
//! mutated after startup.

use image::{DynamicImage, ImageFormat, codecs::jpeg::JpegEncoder, io::Reader as ImageReader};
use serde::Serialize;
use std::io::{Cursor, Write};
use std::num::IntErrorKind;
use thiserror::Error;

/// Source formats the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    #[serde(rename = "webp")]
    WebP,
}

impl SourceFormat {
    pub const REGISTERED: [SourceFormat; 4] = [SourceFormat::Jpeg, SourceFormat::Png, SourceFormat::Gif, SourceFormat::WebP];

    fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(SourceFormat::Jpeg),
            ImageFormat::Png => Some(SourceFormat::Png),
            ImageFormat::Gif => Some(SourceFormat::Gif),
            ImageFormat::WebP => Some(SourceFormat::WebP),
            _ => None,
        }
    }

    /// Short lowercase name reported to clients
    pub fn name(self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Png => "png",
            SourceFormat::Gif => "gif",
            SourceFormat::WebP => "webp",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// JPEG quality as requested by the client.
///
/// No upper bound is applied when parsing; the encoder receives at most 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    /// Parse a form value, substituting `default` for missing, non-numeric or non-positive input.
    ///
    /// Digit strings too large for an integer saturate instead of falling back.
    pub fn parse_or(raw: Option<&str>, default: u32) -> Self {
        let parsed = match raw.map(str::parse::<i64>) {
            Some(Ok(q)) => q,
            Some(Err(e)) if *e.kind() == IntErrorKind::PosOverflow => i64::MAX,
            _ => return Quality(default),
        };

        if parsed < 1 {
            return Quality(default);
        }
        Quality(u32::try_from(parsed).unwrap_or(u32::MAX))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    fn encoder_value(self) -> u8 {
        self.0.clamp(1, 100) as u8
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("image format could not be determined")]
    UnknownFormat,

    #[error("{0:?} images are not accepted")]
    Unregistered(ImageFormat),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A decoded upload together with the format it was sniffed as.
pub struct Decoded {
    pub image: DynamicImage,
    pub format: SourceFormat,
}

/// Decode `data` by sniffing its magic bytes. No fallback is attempted on failure.
pub fn decode(data: &[u8]) -> Result<Decoded, CodecError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let image_format = reader.format().ok_or(CodecError::UnknownFormat)?;
    let format = SourceFormat::from_image_format(image_format).ok_or(CodecError::Unregistered(image_format))?;
    let image = reader.decode()?;

    Ok(Decoded { image, format })
}

/// Encode `image` as baseline JPEG into `writer`.
///
/// JPEG has no alpha channel; transparent pixels keep their colour values and lose their alpha.
pub fn encode_jpeg<W: Write>(image: &DynamicImage, quality: Quality, writer: W) -> Result<(), CodecError> {
    let mut encoder = JpegEncoder::new_with_quality(writer, quality.encoder_value());

    if image.color().has_color() {
        encoder.encode_image(&image.to_rgb8())?;
    } else {
        encoder.encode_image(&image.to_luma8())?;
    }

    Ok(())
}
