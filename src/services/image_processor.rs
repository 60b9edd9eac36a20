use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use std::io::{Cursor, Write};
use tokio::process::Command;

use crate::errors::{AppError, Result};

pub const LOW_RES_HEIGHT: u32 = 480;
pub const HIGH_RES_HEIGHT: u32 = 1080;
const JPEG_QUALITY: u8 = 90;

/// Encodings photos are written back out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Derives the format from a file name's extension, falling back to JPEG.
    pub fn from_file_name(file_name: &str) -> Self {
        match crate::utils::file::extension(file_name).as_deref() {
            Some("png") => OutputFormat::Png,
            _ => OutputFormat::Jpeg,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn decode(data: &[u8]) -> Result<DynamicImage> {
        Ok(image::load_from_memory(data)?)
    }

    /// Scales `img` down to `max_height`, keeping the aspect ratio. Images
    /// already within the bound are returned unchanged.
    pub fn thumbnail(img: &DynamicImage, max_height: u32) -> DynamicImage {
        let (width, height) = (img.width(), img.height());
        if height <= max_height {
            return img.clone();
        }

        let new_width = ((max_height as f64 / height as f64) * width as f64).round() as u32;
        img.resize_exact(new_width.max(1), max_height, FilterType::Lanczos3)
    }

    pub fn encode(img: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        match format {
            OutputFormat::Jpeg => {
                // The JPEG encoder rejects alpha channels.
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                rgb.write_to(&mut buffer, ImageOutputFormat::Jpeg(JPEG_QUALITY))?;
            }
            OutputFormat::Png => img.write_to(&mut buffer, ImageOutputFormat::Png)?,
        }
        Ok(buffer.into_inner())
    }

    /// Decodes `data` and returns a JPEG no taller than `max_height`.
    pub fn thumbnail_jpeg(data: &[u8], max_height: u32) -> Result<Vec<u8>> {
        let img = Self::decode(data)?;
        Self::encode(&Self::thumbnail(&img, max_height), OutputFormat::Jpeg)
    }

    pub fn reencode(data: &[u8], format: OutputFormat) -> Result<Vec<u8>> {
        Self::encode(&Self::decode(data)?, format)
    }

    pub fn rotate_clockwise(data: &[u8], format: OutputFormat) -> Result<Vec<u8>> {
        Self::encode(&Self::decode(data)?.rotate90(), format)
    }

    /// Converts a Canon raw file to JPEG by piping it through `dcraw -c`.
    pub async fn convert_cr2(dcraw_path: &str, data: &[u8]) -> Result<Vec<u8>> {
        let mut raw_file = tempfile::Builder::new().suffix(".cr2").tempfile()?;
        raw_file.write_all(data)?;
        raw_file.flush()?;

        let output = Command::new(dcraw_path)
            .arg("-c")
            .arg(raw_file.path())
            .output()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, dcraw = %dcraw_path, "Failed to execute dcraw");
                AppError::FileProcessing("Failed to convert CR2 to JPEG.".to_string())
            })?;

        if !output.status.success() {
            tracing::error!(
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "dcraw conversion failed"
            );
            return Err(AppError::FileProcessing(
                "Failed to convert CR2 to JPEG.".to_string(),
            ));
        }

        tokio::task::spawn_blocking(move || {
            let img = image::load_from_memory_with_format(&output.stdout, ImageFormat::Pnm)?;
            Self::encode(&img, OutputFormat::Jpeg)
        })
        .await
        .map_err(|e| AppError::Internal(e.into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
        ImageProcessor::encode(&DynamicImage::ImageRgb8(img), OutputFormat::Png).unwrap()
    }

    #[test]
    fn test_thumbnail_bounds_height() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4000, 3000));
        let thumb = ImageProcessor::thumbnail(&img, LOW_RES_HEIGHT);
        assert_eq!(thumb.dimensions(), (640, 480));
    }

    #[test]
    fn test_thumbnail_never_upscales() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(300, 200));
        let thumb = ImageProcessor::thumbnail(&img, HIGH_RES_HEIGHT);
        assert_eq!(thumb.dimensions(), (300, 200));
    }

    #[test]
    fn test_thumbnail_jpeg_output() {
        let data = sample_png(200, 1200);
        let jpeg = ImageProcessor::thumbnail_jpeg(&data, LOW_RES_HEIGHT).unwrap();

        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (80, 480));
    }

    #[test]
    fn test_rotate_clockwise_swaps_dimensions() {
        let data = sample_png(30, 10);
        let rotated = ImageProcessor::rotate_clockwise(&data, OutputFormat::Png).unwrap();
        let decoded = image::load_from_memory(&rotated).unwrap();
        assert_eq!(decoded.dimensions(), (10, 30));
    }

    #[test]
    fn test_jpeg_encoding_drops_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 128])));
        let jpeg = ImageProcessor::encode(&img, OutputFormat::Jpeg).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(ImageProcessor::decode(b"definitely not an image").is_err());
    }

    #[test]
    fn test_output_format_from_name() {
        assert_eq!(OutputFormat::from_file_name("a.PNG"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_file_name("a.jpeg"), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_file_name("noext"), OutputFormat::Jpeg);
    }

    #[tokio::test]
    async fn test_convert_cr2_missing_binary() {
        let err = ImageProcessor::convert_cr2("/nonexistent/dcraw", b"raw")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "File processing error: Failed to convert CR2 to JPEG.");
    }
}
