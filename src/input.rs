//! Image input coercion.
//!
//! Engine entry points accept any of four image representations and
//! internally coerce to whichever one the backend needs: a file path for
//! the CLI and desktop-service engines, a decoded image for the model
//! engines. A conversion that is already satisfied is an identity
//! pass-through; a temp file is materialized only when a path is required
//! and the input lives in memory.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::OcrError;

/// Pixel layout of a raw [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

/// A decoded in-memory pixel array.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    /// Raw pixel data, row-major, no padding.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel layout of `data`.
    pub format: PixelFormat,
}

impl PixelBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// Dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn into_image(self) -> Result<DynamicImage, OcrError> {
        let (width, height) = (self.width, self.height);
        match self.format {
            PixelFormat::Rgb8 => RgbImage::from_raw(width, height, self.data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| pixel_size_error(width, height, 3)),
            PixelFormat::Rgba8 => RgbaImage::from_raw(width, height, self.data)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(|| pixel_size_error(width, height, 4)),
        }
    }
}

fn pixel_size_error(width: u32, height: u32, channels: u32) -> OcrError {
    OcrError::InvalidImage(format!(
        "pixel buffer too small for {width}x{height}x{channels}"
    ))
}

/// Any image representation an engine entry point accepts.
#[derive(Debug)]
pub enum ImageInput {
    /// Path to an encoded image file.
    Path(PathBuf),
    /// Raw encoded bytes (PNG, JPEG, ...).
    Bytes(Vec<u8>),
    /// Decoded raw pixel array.
    Pixels(PixelBuffer),
    /// Decoded high-level image object.
    Image(DynamicImage),
}

/// A file path usable by a backend, either borrowed from an on-disk input
/// or backed by a temp file that lives as long as this handle.
pub enum ImagePath<'a> {
    Existing(&'a Path),
    Temp(NamedTempFile),
}

impl ImagePath<'_> {
    pub fn as_path(&self) -> &Path {
        match self {
            ImagePath::Existing(path) => path,
            ImagePath::Temp(file) => file.path(),
        }
    }
}

impl ImageInput {
    /// Coerce to a file path. A path input passes through untouched;
    /// anything in-memory is PNG-encoded into a named temp file that is
    /// deleted when the returned handle drops.
    pub fn to_path(&self) -> Result<ImagePath<'_>, OcrError> {
        if let ImageInput::Path(path) = self {
            return Ok(ImagePath::Existing(path));
        }
        let image = self.to_image()?;
        let file = tempfile::Builder::new()
            .prefix("anyocr-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(file.path(), ImageFormat::Png)?;
        debug!("materialized in-memory image at {:?}", file.path());
        Ok(ImagePath::Temp(file))
    }

    /// Coerce to a decoded image. An `Image` input is borrowed as-is;
    /// paths and bytes are decoded, pixel buffers wrapped.
    pub fn to_image(&self) -> Result<Cow<'_, DynamicImage>, OcrError> {
        match self {
            ImageInput::Image(image) => Ok(Cow::Borrowed(image)),
            ImageInput::Path(path) => Ok(Cow::Owned(image::open(path)?)),
            ImageInput::Bytes(bytes) => Ok(Cow::Owned(image::load_from_memory(bytes)?)),
            ImageInput::Pixels(pixels) => Ok(Cow::Owned(pixels.clone().into_image()?)),
        }
    }

    /// Coerce to a raw pixel array. A `Pixels` input is borrowed as-is;
    /// everything else is decoded and flattened to RGBA8.
    pub fn to_pixels(&self) -> Result<Cow<'_, PixelBuffer>, OcrError> {
        if let ImageInput::Pixels(pixels) = self {
            return Ok(Cow::Borrowed(pixels));
        }
        let image = self.to_image()?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Cow::Owned(PixelBuffer::new(
            rgba.into_raw(),
            width,
            height,
            PixelFormat::Rgba8,
        )))
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Path(path)
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        ImageInput::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(image: DynamicImage) -> Self {
        ImageInput::Image(image)
    }
}

impl From<PixelBuffer> for ImageInput {
    fn from(pixels: PixelBuffer) -> Self {
        ImageInput::Pixels(pixels)
    }
}
