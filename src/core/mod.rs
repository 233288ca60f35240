use std::io::Cursor;

use anyhow::Error;
use anyhow::Result;
use image::ImageFormat;
pub mod ai;
pub mod data_url;

/// Formats the generation API accepts as inline input.
pub static SUPPORT_IMAGE_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

/// A decoded sketch ready to be sent upstream.
#[derive(Debug, Clone)]
pub struct SketchImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl SketchImage {
    /// Identifies the image from its leading bytes. Anything the API cannot
    /// take directly is re-encoded as PNG.
    pub fn from_bytes(blob: Vec<u8>) -> Result<SketchImage> {
        let format = image::guess_format(&blob)
            .map_err(|e| Error::msg(format!("cannot identify image file: {e}")))?;

        if SUPPORT_IMAGE_FORMATS.contains(&format) {
            return Ok(SketchImage {
                mime_type: format.to_mime_type().to_string(),
                data: blob,
            });
        }

        let image = image::load_from_memory_with_format(&blob, format)?;
        let data = transform(&image, ImageFormat::Png)?;

        Ok(SketchImage {
            mime_type: ImageFormat::Png.to_mime_type().to_string(),
            data,
        })
    }
}

/// Shared builder for outbound clients.
pub fn http_client() -> Result<reqwest::Client> {
    let mut c = reqwest::ClientBuilder::new();

    #[cfg(not(feature = "use-proxy"))]
    {
        c = c.no_proxy();
    }

    Ok(c.build()?)
}

pub fn transform(image: &image::DynamicImage, target_format: ImageFormat) -> Result<Vec<u8>> {
    if !SUPPORT_IMAGE_FORMATS.contains(&target_format) {
        return Err(Error::msg(format!(
            "image format {} is not support",
            target_format.to_mime_type()
        )));
    }

    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, target_format)?;

    Ok(buffer.into_inner())
}

#[cfg(test)]
pub(crate) mod test_images {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbImage};

    pub fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255])));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }
}
