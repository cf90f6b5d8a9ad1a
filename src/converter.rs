use crate::types::{ConversionError, OutputFormat};
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;

/// Nominal icon resolutions embedded in an ICO container.
const ICO_SIZES: [u32; 5] = [16, 24, 32, 48, 64];

/// ICO base images are shrunk so neither dimension exceeds this.
const ICO_MAX_DIM: u32 = 64;

const JPEG_QUALITY: u8 = 85;

/// Decode `data` and re-encode it as `format`.
///
/// This is the single error boundary around the imaging library: any decode,
/// resample or encode failure comes back as a `ConversionError` carrying the
/// underlying message, with no distinction between causes.
pub fn convert(data: &[u8], format: OutputFormat) -> Result<Vec<u8>, ConversionError> {
    let img = image::load_from_memory(data)?;
    log::info!(
        "Decoded {}x{} ({:?}) input, encoding as {:?}",
        img.width(),
        img.height(),
        img.color(),
        format
    );

    match format {
        OutputFormat::Jpeg => encode_jpeg(&img),
        OutputFormat::Png => encode(&img, ImageOutputFormat::Png),
        OutputFormat::Tiff => encode(&img, ImageOutputFormat::Tiff),
        OutputFormat::Ico => encode_ico(img),
    }
}

/// Encode into an in-memory buffer.
fn encode(img: &DynamicImage, format: ImageOutputFormat) -> Result<Vec<u8>, ConversionError> {
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), format)?;
    Ok(output)
}

/// The JPEG encoder rejects alpha channels and 16-bit samples, so flatten
/// anything that is not already 8-bit grayscale or RGB.
fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, ConversionError> {
    let flattened;
    let img = match img.color() {
        ColorType::L8 | ColorType::Rgb8 => img,
        _ => {
            flattened = DynamicImage::ImageRgb8(img.to_rgb8());
            &flattened
        }
    };
    encode(img, ImageOutputFormat::Jpeg(JPEG_QUALITY))
}

/// Shrink the image to fit the icon bounds, then emit one ICO container
/// embedding the nominal sizes derived from the shrunk base.
fn encode_ico(img: DynamicImage) -> Result<Vec<u8>, ConversionError> {
    let base = if img.width() > ICO_MAX_DIM || img.height() > ICO_MAX_DIM {
        img.resize(ICO_MAX_DIM, ICO_MAX_DIM, FilterType::Lanczos3)
    } else {
        // Never upscale small inputs.
        img
    };

    // PNG-compressed ICO frames must be 32-bit RGBA.
    let base = DynamicImage::ImageRgba8(base.to_rgba8());

    let max_dim = base.width().max(base.height());
    let mut scaled: Vec<DynamicImage> = Vec::with_capacity(ICO_SIZES.len());
    for &size in &ICO_SIZES {
        let frame = if size < max_dim {
            base.resize(size, size, FilterType::Lanczos3)
        } else {
            base.clone()
        };
        // Nominal sizes at or above the base all collapse to the base frame.
        if !scaled.iter().any(|f| f.dimensions() == frame.dimensions()) {
            scaled.push(frame);
        }
    }

    let mut frames = Vec::with_capacity(scaled.len());
    for frame in &scaled {
        frames.push(IcoFrame::as_png(
            frame.as_bytes(),
            frame.width(),
            frame.height(),
            frame.color(),
        )?);
    }

    let mut output = Vec::new();
    IcoEncoder::new(Cursor::new(&mut output)).encode_images(&frames)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    fn sample_rgb(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let img = sample_rgb(37, 23);
        let converted = convert(&png_bytes(&img), OutputFormat::Png).unwrap();

        let decoded = image::load_from_memory(&converted).unwrap();
        assert_eq!(decoded.dimensions(), (37, 23));
        assert_eq!(decoded.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn ico_shrinks_to_64_preserving_aspect_ratio() {
        let img = sample_rgb(200, 100);
        let converted = convert(&png_bytes(&img), OutputFormat::Ico).unwrap();

        // The ICO decoder picks the largest embedded frame.
        let decoded = image::load_from_memory(&converted).unwrap();
        assert_eq!(decoded.dimensions(), (64, 32));
    }

    #[test]
    fn ico_never_upscales_small_inputs() {
        let img = sample_rgb(20, 10);
        let converted = convert(&png_bytes(&img), OutputFormat::Ico).unwrap();

        let decoded = image::load_from_memory(&converted).unwrap();
        assert_eq!(decoded.dimensions(), (20, 10));
    }

    #[test]
    fn ico_frames_from_rgb_input_decode_as_rgba() {
        let img = sample_rgb(64, 64);
        let converted = convert(&png_bytes(&img), OutputFormat::Ico).unwrap();

        let decoded = image::load_from_memory(&converted).unwrap();
        assert_eq!(decoded.dimensions(), (64, 64));
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn ico_accepts_grayscale_input() {
        let gray = DynamicImage::ImageLuma8(ImageBuffer::from_fn(80, 80, |x, _| {
            image::Luma([(x % 256) as u8])
        }));
        let converted = convert(&png_bytes(&gray), OutputFormat::Ico).unwrap();

        let decoded = image::load_from_memory(&converted).unwrap();
        assert_eq!(decoded.dimensions(), (64, 64));
    }

    #[test]
    fn jpeg_flattens_alpha_channel() {
        let rgba = DynamicImage::ImageRgba8(ImageBuffer::from_fn(50, 40, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 100])
        }));
        let converted = convert(&png_bytes(&rgba), OutputFormat::Jpeg).unwrap();

        let decoded = image::load_from_memory(&converted).unwrap();
        assert_eq!(decoded.dimensions(), (50, 40));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn tiff_output_is_decodable() {
        let img = sample_rgb(12, 9);
        let converted = convert(&png_bytes(&img), OutputFormat::Tiff).unwrap();

        let decoded = image::load_from_memory(&converted).unwrap();
        assert_eq!(decoded.dimensions(), (12, 9));
    }

    #[test]
    fn corrupt_input_is_an_error() {
        assert!(convert(b"definitely not an image", OutputFormat::Png).is_err());
    }
}
