use image::{DynamicImage, GrayImage, Luma};

/// Flattens transparency onto white and converts to a contrast-stretched
/// grayscale image.
pub(super) fn normalize_for_ocr(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut luma = GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let r = r as f32 * alpha + 255.0 * (1.0 - alpha);
        let g = g as f32 * alpha + 255.0 * (1.0 - alpha);
        let b = b as f32 * alpha + 255.0 * (1.0 - alpha);
        let value = (0.299 * r + 0.587 * g + 0.114 * b).round() as u8;
        luma.put_pixel(x, y, Luma([value]));
    }

    DynamicImage::ImageLuma8(contrast_stretch(luma))
}

fn contrast_stretch(mut image: GrayImage) -> GrayImage {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(min, max), pixel| {
            (min.min(pixel[0]), max.max(pixel[0]))
        });
    if max <= min {
        return image;
    }

    let scale = 255.0 / (max as f32 - min as f32);
    for pixel in image.pixels_mut() {
        pixel[0] = ((pixel[0] - min) as f32 * scale).round() as u8;
    }
    image
}
