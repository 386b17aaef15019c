//! Cover art processing and embedding
//!
//! Artwork is embedded byte-for-byte by default. When a maximum size is
//! configured (small portable players often choke on large covers) the
//! image is decoded, downscaled and re-encoded as baseline JPEG.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// JPEG quality (0-100) used when re-encoding
const JPEG_QUALITY: u8 = 85;

/// Description stored alongside the embedded picture
const COVER_DESCRIPTION: &str = "Cover";

/// Downscale cover art to fit within `max_size` and re-encode as JPEG
pub fn process_cover_art(data: &[u8], max_size: u32) -> Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("Failed to guess image format")?
        .decode()
        .context("Failed to decode cover art")?;

    let img = resize_to_fit(img, max_size);

    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY);
    encoder
        .encode_image(&img)
        .context("Failed to encode cover art as JPEG")?;

    debug!(
        "Processed cover art: {}x{} -> {} bytes",
        img.width(),
        img.height(),
        output.len()
    );
    Ok(output)
}

/// Resize image to fit within `max_size` while maintaining aspect ratio
fn resize_to_fit(img: DynamicImage, max_size: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= max_size && height <= max_size {
        return img;
    }

    let (new_width, new_height) = if width > height {
        let ratio = max_size as f64 / width as f64;
        (max_size, ((height as f64 * ratio) as u32).max(1))
    } else {
        let ratio = max_size as f64 / height as f64;
        (((width as f64 * ratio) as u32).max(1), max_size)
    };

    debug!(
        "Resizing cover art: {}x{} -> {}x{}",
        width, height, new_width, new_height
    );

    img.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

/// Guess the MIME type of image bytes from their magic number
pub fn sniff_mime(data: &[u8]) -> MimeType {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        MimeType::Png
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        MimeType::Unknown("image/webp".to_string())
    } else {
        MimeType::Jpeg
    }
}

/// Embed cover art into an audio file, replacing any existing front cover
pub fn embed_cover_art(audio_path: &Path, cover_data: Vec<u8>) -> Result<()> {
    let mut tagged_file = Probe::open(audio_path)
        .context("Failed to open audio file")?
        .read()
        .context("Failed to read audio file tags")?;

    let picture = Picture::new_unchecked(
        PictureType::CoverFront,
        Some(sniff_mime(&cover_data)),
        Some(COVER_DESCRIPTION.to_string()),
        cover_data,
    );

    let tag = match tagged_file.primary_tag_mut() {
        Some(tag) => tag,
        None => {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(lofty::tag::Tag::new(tag_type));
            tagged_file
                .primary_tag_mut()
                .context("Failed to create tag")?
        }
    };

    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(picture);

    tagged_file
        .save_to_path(audio_path, WriteOptions::default())
        .context("Failed to save audio file with embedded cover")?;

    debug!("Embedded cover art in: {}", audio_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_small_image() {
        let img = DynamicImage::new_rgb8(100, 100);
        let resized = resize_to_fit(img, 300);
        assert_eq!(resized.width(), 100);
        assert_eq!(resized.height(), 100);
    }

    #[test]
    fn test_resize_large_image() {
        let img = DynamicImage::new_rgb8(1500, 1000);
        let resized = resize_to_fit(img, 300);
        assert_eq!(resized.width(), 300);
        assert!(resized.height() <= 300);
    }

    #[test]
    fn test_resize_thin_image_keeps_a_pixel() {
        let resized = resize_to_fit(DynamicImage::new_rgb8(3000, 1), 300);
        assert_eq!((resized.width(), resized.height()), (300, 1));

        let resized = resize_to_fit(DynamicImage::new_rgb8(1, 3000), 300);
        assert_eq!((resized.width(), resized.height()), (1, 300));
    }

    #[test]
    fn test_process_thin_cover_art() {
        let mut png = Vec::new();
        DynamicImage::new_rgb8(3000, 1)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let jpeg = process_cover_art(&png, 300).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_process_cover_art_outputs_jpeg() {
        let mut png = Vec::new();
        DynamicImage::new_rgb8(640, 640)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let jpeg = process_cover_art(&png, 300).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert!(matches!(sniff_mime(&jpeg), MimeType::Jpeg));
    }

    #[test]
    fn test_sniff_mime() {
        assert!(matches!(sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D]), MimeType::Png));
        assert!(matches!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), MimeType::Jpeg));
        assert!(matches!(
            sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "),
            MimeType::Unknown(ref m) if m == "image/webp"
        ));
    }
}
