//! Image Normalization
//!
//! Format sniffing and the RGB/RGBA → PNG canonicalization applied to every upload.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use furble_core::error::{FurbleError, Result};

/// Formats accepted after sniffing
pub const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::WebP,
];

/// Decoded upload in canonical pixel layout
#[derive(Debug)]
pub struct NormalizedImage {
    pub pixels: DynamicImage,
    pub has_alpha: bool,
}

/// Identify the real format from magic bytes, ignoring what the client claimed.
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat> {
    let format = image::guess_format(bytes)
        .map_err(|e| FurbleError::UnsupportedMediaType(format!("unrecognized image data: {e}")))?;

    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(FurbleError::UnsupportedMediaType(format!("{format:?} is not accepted")));
    }
    Ok(format)
}

/// Decode and convert to RGBA when the source carries transparency, RGB otherwise.
pub fn normalize(bytes: &[u8], format: ImageFormat) -> Result<NormalizedImage> {
    // the bytes already passed sniffing, so a decode failure is ours to report
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| FurbleError::Image(format!("undecodable {format:?}: {e}")))?;

    let has_alpha = has_transparency(&decoded, format, bytes);
    let pixels = if has_alpha {
        DynamicImage::ImageRgba8(decoded.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(decoded.to_rgb8())
    };

    Ok(NormalizedImage { pixels, has_alpha })
}

/// Palette GIFs count as transparent when a graphic control extension
/// declares a transparent index, whether or not any pixel uses it.
fn has_transparency(image: &DynamicImage, format: ImageFormat, bytes: &[u8]) -> bool {
    match format {
        ImageFormat::Gif => gif_declares_transparency(bytes),
        _ => image.color().has_alpha(),
    }
}

const GIF_HEADER_LEN: usize = 6;
const GIF_EXTENSION: u8 = 0x21;
const GIF_GRAPHIC_CONTROL: u8 = 0xF9;
const GIF_IMAGE_DESCRIPTOR: u8 = 0x2C;

/// Walk the GIF block stream looking for a graphic control extension with
/// the transparency flag set.
fn gif_declares_transparency(bytes: &[u8]) -> bool {
    // logical screen descriptor: width(2) height(2) packed(1) bg(1) aspect(1)
    let Some(&screen_flags) = bytes.get(GIF_HEADER_LEN + 4) else {
        return false;
    };
    let mut pos = GIF_HEADER_LEN + 7 + color_table_len(screen_flags);

    while let Some(&block) = bytes.get(pos) {
        match block {
            GIF_EXTENSION => {
                // 0x21 0xF9 size(=4) flags delay(2) index terminator
                let is_gce = bytes.get(pos + 1) == Some(&GIF_GRAPHIC_CONTROL);
                if is_gce && bytes.get(pos + 3).is_some_and(|flags| flags & 0x01 != 0) {
                    return true;
                }
                pos = skip_sub_blocks(bytes, pos + 2);
            }
            GIF_IMAGE_DESCRIPTOR => {
                // 0x2C left(2) top(2) width(2) height(2) flags, [table], lzw size, data
                let Some(&image_flags) = bytes.get(pos + 9) else {
                    return false;
                };
                pos = skip_sub_blocks(bytes, pos + 10 + color_table_len(image_flags) + 1);
            }
            // trailer (0x3B) or anything unexpected
            _ => return false,
        }
    }

    false
}

fn color_table_len(flags: u8) -> usize {
    if flags & 0x80 == 0 {
        0
    } else {
        3 << ((flags & 0x07) + 1)
    }
}

fn skip_sub_blocks(bytes: &[u8], mut pos: usize) -> usize {
    while let Some(&len) = bytes.get(pos) {
        pos += 1 + usize::from(len);
        if len == 0 {
            break;
        }
    }
    pos
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| FurbleError::Image(format!("PNG encoding failed: {e}")))?;
    Ok(buffer.into_inner())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use image::ColorType;

    #[test]
    fn test_sniff_accepts_allowed_formats() {
        assert_eq!(sniff_format(&opaque_jpeg()).unwrap(), ImageFormat::Jpeg);
        assert_eq!(sniff_format(&translucent_png()).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_sniff_rejects_other_formats() {
        assert!(matches!(sniff_format(&tiff_header()), Err(FurbleError::UnsupportedMediaType(_))));
        assert!(matches!(sniff_format(b"hello, world"), Err(FurbleError::UnsupportedMediaType(_))));
    }

    #[test]
    fn test_alpha_kept_as_rgba() {
        let normalized = normalize(&translucent_png(), ImageFormat::Png).unwrap();
        assert!(normalized.has_alpha);
        assert_eq!(normalized.pixels.color(), ColorType::Rgba8);
    }

    #[test]
    fn test_opaque_becomes_rgb() {
        let normalized = normalize(&opaque_jpeg(), ImageFormat::Jpeg).unwrap();
        assert!(!normalized.has_alpha);
        assert_eq!(normalized.pixels.color(), ColorType::Rgb8);
    }

    #[test]
    fn test_png_roundtrip_preserves_dimensions() {
        let normalized = normalize(&opaque_png(), ImageFormat::Png).unwrap();
        let png = encode_png(&normalized.pixels).unwrap();
        let back = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!((back.width(), back.height()), (3, 2));
    }

    #[test]
    fn test_gif_transparent_index_becomes_rgba() {
        // the transparent index is declared but no pixel uses it
        let gif = palette_gif(Some(1));
        let normalized = normalize(&gif, sniff_format(&gif).unwrap()).unwrap();
        assert!(normalized.has_alpha);
        assert_eq!(normalized.pixels.color(), ColorType::Rgba8);
    }

    #[test]
    fn test_gif_without_transparency_becomes_rgb() {
        let gif = palette_gif(None);
        let normalized = normalize(&gif, ImageFormat::Gif).unwrap();
        assert!(!normalized.has_alpha);
        assert_eq!(normalized.pixels.color(), ColorType::Rgb8);
    }

    #[test]
    fn test_png_palette_with_trns_becomes_rgba() {
        let png = palette_png_with_trns();
        let normalized = normalize(&png, sniff_format(&png).unwrap()).unwrap();
        assert!(normalized.has_alpha);
        assert_eq!(normalized.pixels.color(), ColorType::Rgba8);
    }

    #[test]
    fn test_corrupt_body_after_valid_magic_is_internal() {
        let mut truncated = opaque_png();
        truncated.truncate(20);
        assert_eq!(sniff_format(&truncated).unwrap(), ImageFormat::Png);

        let err = normalize(&truncated, ImageFormat::Png).unwrap_err();
        assert!(matches!(err, FurbleError::Image(_)));
        assert_eq!(err.kind(), furble_core::ErrorKind::Internal);
    }
}
