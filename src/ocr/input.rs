//! Input Dispatch
//!
//! Turns an upload into what the engine consumes: paginated documents go to
//! disk and are passed by path, everything else is decoded as an image.

use std::path::Path;

use super::artifact::TempArtifact;
use super::types::{InputError, PixelBuffer};

/// Extensions (lowercase, without dot) handled as paginated documents
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

/// Upload classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Document,
}

impl InputKind {
    /// Classify by filename suffix, case-insensitively
    pub fn classify(filename: &str) -> Self {
        let is_document = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                DOCUMENT_EXTENSIONS
                    .iter()
                    .any(|doc| ext.eq_ignore_ascii_case(doc))
            })
            .unwrap_or(false);

        if is_document {
            Self::Document
        } else {
            Self::Image
        }
    }
}

/// Engine-ready representation of an upload
#[derive(Debug)]
pub enum PreparedInput {
    /// Decoded single image
    Pixels(PixelBuffer),
    /// Multi-page document materialized on disk
    Document(TempArtifact),
}

impl PreparedInput {
    pub fn kind(&self) -> InputKind {
        match self {
            Self::Pixels(_) => InputKind::Image,
            Self::Document(_) => InputKind::Document,
        }
    }
}

/// Prepare an upload for recognition
pub async fn prepare(
    temp_dir: &Path,
    filename: &str,
    contents: Vec<u8>,
) -> Result<PreparedInput, InputError> {
    match InputKind::classify(filename) {
        InputKind::Document => {
            let artifact = TempArtifact::acquire(temp_dir, filename, &contents).await?;
            Ok(PreparedInput::Document(artifact))
        }
        InputKind::Image => {
            let pixels = tokio::task::spawn_blocking(move || decode_bgr(&contents))
                .await
                .map_err(|e| InputError::Task(e.to_string()))??;
            Ok(PreparedInput::Pixels(pixels))
        }
    }
}

/// Decode an image and reorder it to 3-channel BGR
pub fn decode_bgr(contents: &[u8]) -> Result<PixelBuffer, InputError> {
    let rgb = image::load_from_memory(contents)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut data = rgb.into_raw();
    for pixel in data.chunks_exact_mut(3) {
        pixel.swap(0, 2);
    }

    Ok(PixelBuffer {
        width,
        height,
        data,
    })
}

#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}
