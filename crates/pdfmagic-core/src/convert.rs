//! Image to PDF conversion
//!
//! Decoding is the gate for non-PDF uploads: whatever the `image` crate
//! cannot decode is rejected here. Decoded pixels go through an explicit
//! color normalization stage, then are embedded as a Flate-compressed image
//! XObject on a single page sized to the image at 72 dpi.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::debug;

use crate::error::PdfMagicError;

/// Resource name of the image on the generated page.
const IMAGE_RESOURCE: &[u8] = b"Im0";

/// Color spaces the PDF encoder writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfColorSpace {
    DeviceGray,
    DeviceRgb,
}

impl PdfColorSpace {
    fn name(self) -> &'static [u8] {
        match self {
            PdfColorSpace::DeviceGray => b"DeviceGray",
            PdfColorSpace::DeviceRgb => b"DeviceRGB",
        }
    }
}

/// Opaque 8-bit samples ready to be embedded.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: PdfColorSpace,
    pub samples: Vec<u8>,
}

/// Reduce a decoded image to a color model the PDF encoder accepts.
///
/// Alpha channels (RGBA, LA) are dropped by converting to RGB. Palette
/// images reach us already expanded to RGB or RGBA by the decoders and take
/// the same path. 8-bit grayscale stays gray; 16-bit gray is narrowed to
/// 8 bits. Every other model becomes 8-bit RGB.
pub fn normalize_color(image: DynamicImage) -> NormalizedImage {
    let (width, height) = (image.width(), image.height());
    match image {
        DynamicImage::ImageLuma8(gray) => NormalizedImage {
            width,
            height,
            color_space: PdfColorSpace::DeviceGray,
            samples: gray.into_raw(),
        },
        wide @ DynamicImage::ImageLuma16(_) => NormalizedImage {
            width,
            height,
            color_space: PdfColorSpace::DeviceGray,
            samples: wide.to_luma8().into_raw(),
        },
        DynamicImage::ImageRgb8(rgb) => NormalizedImage {
            width,
            height,
            color_space: PdfColorSpace::DeviceRgb,
            samples: rgb.into_raw(),
        },
        other => NormalizedImage {
            width,
            height,
            color_space: PdfColorSpace::DeviceRgb,
            samples: other.to_rgb8().into_raw(),
        },
    }
}

/// Decode `data` as an image and return a one-page PDF showing it.
///
/// `name` is only used to label errors.
pub fn image_to_pdf(name: &str, data: &[u8]) -> Result<Vec<u8>, PdfMagicError> {
    let decoded =
        image::load_from_memory(data).map_err(|e| PdfMagicError::UnsupportedImage {
            filename: name.to_string(),
            reason: e.to_string(),
        })?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(PdfMagicError::UnsupportedImage {
            filename: name.to_string(),
            reason: "image has no pixels".into(),
        });
    }

    debug!(
        "Decoded {}: {}x{} {:?}",
        name,
        decoded.width(),
        decoded.height(),
        decoded.color()
    );

    encode_single_page(&normalize_color(decoded))
}

/// Write a normalized image as a complete single-page PDF.
pub fn encode_single_page(image: &NormalizedImage) -> Result<Vec<u8>, PdfMagicError> {
    let width = image.width as i64;
    let height = image.height as i64;

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    // Image XObject
    let mut image_dict = Dictionary::new();
    image_dict.set("Type", Object::Name(b"XObject".to_vec()));
    image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
    image_dict.set("Width", Object::Integer(width));
    image_dict.set("Height", Object::Integer(height));
    image_dict.set(
        "ColorSpace",
        Object::Name(image.color_space.name().to_vec()),
    );
    image_dict.set("BitsPerComponent", Object::Integer(8));
    image_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    let image_id = doc.add_object(Stream::new(image_dict, deflate(&image.samples)?));

    // Scale the unit square to the page and paint the image
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content
        .encode()
        .map_err(|e| PdfMagicError::Serialization(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content_bytes));

    let mut xobjects = Dictionary::new();
    xobjects.set(IMAGE_RESOURCE.to_vec(), Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(pages_id));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ]),
    );
    page_dict.set("Resources", Object::Dictionary(resources));
    page_dict.set("Contents", Object::Reference(content_id));
    let page_id = doc.add_object(Object::Dictionary(page_dict));

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages_dict.set("Count", Object::Integer(1));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog_dict));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfMagicError::Serialization(e.to_string()))?;

    Ok(buffer)
}

fn deflate(samples: &[u8]) -> Result<Vec<u8>, PdfMagicError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(samples)
        .and_then(|_| encoder.finish())
        .map_err(|e| PdfMagicError::Serialization(format!("Failed to compress image: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{encode_image, image_samples_on_page};
    use image::{GrayAlphaImage, GrayImage, ImageFormat, LumaA, Rgb, RgbImage, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_png_becomes_single_page_pdf() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([10, 20, 30])));
        let pdf = image_to_pdf("x.png", &encode_image(&img, ImageFormat::Png)).unwrap();

        assert!(pdf.starts_with(b"%PDF-1.7"));
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let (w, h, samples) = image_samples_on_page(&doc, 1);
        assert_eq!((w, h), (4, 3));
        assert_eq!(samples, img.to_rgb8().into_raw());
    }

    #[test]
    fn test_page_is_sized_to_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(200, 100));
        let pdf = image_to_pdf("wide.bmp", &encode_image(&img, ImageFormat::Bmp)).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let page_id = doc.get_pages()[&1];
        let media_box = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(media_box, vec![0, 0, 200, 100]);
    }

    #[test]
    fn test_alpha_is_dropped() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 0])));
        let normalized = normalize_color(img);
        assert_eq!(normalized.color_space, PdfColorSpace::DeviceRgb);
        assert_eq!(normalized.samples, [200u8, 100, 50].repeat(4));
    }

    #[test]
    fn test_gray_alpha_becomes_rgb() {
        let img = DynamicImage::ImageLumaA8(GrayAlphaImage::from_pixel(1, 1, LumaA([90, 10])));
        let normalized = normalize_color(img);
        assert_eq!(normalized.color_space, PdfColorSpace::DeviceRgb);
        assert_eq!(normalized.samples, vec![90, 90, 90]);
    }

    #[test]
    fn test_plain_gray_stays_gray() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 1, image::Luma([7])));
        let pdf = image_to_pdf("g.png", &encode_image(&img, ImageFormat::Png)).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let (_, _, samples) = image_samples_on_page(&doc, 1);
        assert_eq!(samples, vec![7, 7, 7]);
    }

    #[test]
    fn test_rgba_png_converts() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 5, Rgba([1, 2, 3, 128])));
        let pdf = image_to_pdf("t.png", &encode_image(&img, ImageFormat::Png)).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let (w, h, samples) = image_samples_on_page(&doc, 1);
        assert_eq!((w, h), (5, 5));
        assert_eq!(samples, [1u8, 2, 3].repeat(25));
    }

    #[test]
    fn test_palette_gif_converts() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 255])));
        let pdf = image_to_pdf("anim.gif", &encode_image(&img, ImageFormat::Gif)).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let (w, h, samples) = image_samples_on_page(&doc, 1);
        assert_eq!((w, h), (3, 2));
        assert_eq!(samples.len(), 3 * 2 * 3);
    }

    #[test]
    fn test_jpeg_converts() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, Rgb([128, 128, 128])));
        let pdf = image_to_pdf("y.jpg", &encode_image(&img, ImageFormat::Jpeg)).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let (w, h, _) = image_samples_on_page(&doc, 1);
        assert_eq!((w, h), (16, 8));
    }

    #[test]
    fn test_tiff_converts() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 4, Rgb([12, 34, 56])));
        let pdf = image_to_pdf("scan.tiff", &encode_image(&img, ImageFormat::Tiff)).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let (w, h, samples) = image_samples_on_page(&doc, 1);
        assert_eq!((w, h), (5, 4));
        assert_eq!(samples, [12u8, 34, 56].repeat(20));
    }

    #[test]
    fn test_webp_converts() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 3, Rgb([200, 10, 90])));
        let pdf = image_to_pdf("photo.webp", &encode_image(&img, ImageFormat::WebP)).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let (w, h, samples) = image_samples_on_page(&doc, 1);
        assert_eq!((w, h), (6, 3));
        assert_eq!(samples, [200u8, 10, 90].repeat(18));
    }

    #[test]
    fn test_garbage_is_unsupported() {
        let err = image_to_pdf("corrupt.png", b"definitely not an image").unwrap_err();
        assert!(matches!(
            err,
            PdfMagicError::UnsupportedImage { ref filename, .. } if filename == "corrupt.png"
        ));
    }

    #[test]
    fn test_truncated_png_is_unsupported() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(32, 32));
        let mut png = encode_image(&img, ImageFormat::Png);
        png.truncate(20);
        assert!(matches!(
            image_to_pdf("cut.png", &png),
            Err(PdfMagicError::UnsupportedImage { .. })
        ));
    }
}
