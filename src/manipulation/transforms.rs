use std::io::Cursor;

use image::{DynamicImage, Rgb, RgbImage, imageops::FilterType};
use imageproc::{
    drawing::draw_filled_circle_mut,
    filter::gaussian_blur_f32,
    geometric_transformations::{Interpolation, rotate_about_center},
};
use rand::Rng;

use crate::{error::Result, image_utils::rgb_to_gray};

/// Sigma OpenCV derives for a 7x7 kernel when sigma is left at 0.
pub const BLUR_SIGMA: f32 = 1.4;
pub const CANVAS_BORDER: u32 = 50;
pub const NOISE_FRACTION: f64 = 0.02;

pub fn crop_edges(image: &RgbImage, percent: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let crop_x = width * percent / 100;
    let crop_y = height * percent / 100;
    let new_width = width.saturating_sub(2 * crop_x).max(1);
    let new_height = height.saturating_sub(2 * crop_y).max(1);

    image::imageops::crop_imm(image, crop_x, crop_y, new_width, new_height).to_image()
}

/// Counter-clockwise rotation onto a canvas large enough to hold the result.
pub fn rotate_expand(image: &RgbImage, degrees: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());

    let new_width = (width as f32 * cos + height as f32 * sin).ceil() as u32;
    let new_height = (width as f32 * sin + height as f32 * cos).ceil() as u32;

    let mut canvas = RgbImage::new(new_width.max(width), new_height.max(height));
    let offset_x = (canvas.width() - width) / 2;
    let offset_y = (canvas.height() - height) / 2;
    image::imageops::overlay(&mut canvas, image, offset_x as i64, offset_y as i64);

    // imageproc rotates clockwise for positive angles
    rotate_about_center(&canvas, -theta, Interpolation::Bilinear, Rgb([0, 0, 0]))
}

pub fn flip_horizontal(image: &RgbImage) -> RgbImage {
    image::imageops::flip_horizontal(image)
}

pub fn adjust_brightness(image: &RgbImage, factor: f32) -> RgbImage {
    map_channels(image, |v| v * factor)
}

/// Blends towards a flat image of the mean luminance.
pub fn adjust_contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let gray = rgb_to_gray(image);
    let count = (gray.width() as u64 * gray.height() as u64).max(1);
    let sum = gray.pixels().map(|p| p[0] as u64).sum::<u64>();
    let mean = (sum as f64 / count as f64 + 0.5).floor() as f32;

    map_channels(image, |v| mean + factor * (v - mean))
}

pub fn gaussian_blur(image: &RgbImage, sigma: f32) -> RgbImage {
    gaussian_blur_f32(image, sigma)
}

/// Sets `fraction` of all samples to white and as many again to black.
pub fn salt_and_pepper<R: Rng>(image: &RgbImage, fraction: f64, rng: &mut R) -> RgbImage {
    let mut noisy = image.clone();
    let (width, height) = noisy.dimensions();
    if width == 0 || height == 0 {
        return noisy;
    }

    let samples = width as u64 * height as u64 * 3;
    let count = (fraction * samples as f64).ceil() as u64;

    for value in [255u8, 0u8] {
        for _ in 0..count {
            let x = rng.gen_range(0..width);
            let y = rng.gen_range(0..height);
            let channel = rng.gen_range(0..3usize);
            noisy.get_pixel_mut(x, y)[channel] = value;
        }
    }

    noisy
}

pub fn color_filter(image: &RgbImage, gains: [f32; 3]) -> RgbImage {
    let mut filtered = image.clone();
    for pixel in filtered.pixels_mut() {
        for (channel, gain) in pixel.0.iter_mut().zip(gains) {
            *channel = (*channel as f32 * gain).round().clamp(0.0, 255.0) as u8;
        }
    }
    filtered
}

/// Half-opaque red banner in the top-left corner, standing in for a
/// rendered caption.
pub fn watermark(image: &RgbImage) -> RgbImage {
    let mut marked = image.clone();
    let (width, height) = marked.dimensions();
    let (x0, y0) = (10u32, 10u32);
    let banner_width = 220u32;
    let banner_height = 40u32;
    let opacity = 128.0 / 255.0;
    let color = [255.0f32, 0.0, 0.0];

    for y in y0..(y0 + banner_height).min(height) {
        for x in x0..(x0 + banner_width).min(width) {
            let pixel = marked.get_pixel_mut(x, y);
            for (channel, target) in pixel.0.iter_mut().zip(color) {
                *channel = ((1.0 - opacity) * *channel as f32 + opacity * target).round() as u8;
            }
        }
    }

    marked
}

pub fn expand_canvas(image: &RgbImage, border: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut canvas = RgbImage::from_pixel(
        width + 2 * border,
        height + 2 * border,
        Rgb([255, 255, 255]),
    );
    image::imageops::replace(&mut canvas, image, border as i64, border as i64);
    canvas
}

/// Round-trips the image through a JPEG encoder at `quality`.
pub fn recompress_jpeg(image: &RgbImage, quality: u8) -> Result<RgbImage> {
    let mut buffer = Cursor::new(Vec::new());

    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    DynamicImage::ImageRgb8(image.clone()).write_with_encoder(encoder)?;

    buffer.set_position(0);
    let recompressed = image::load_from_memory(&buffer.into_inner())?;

    Ok(recompressed.to_rgb8())
}

/// `image` in the top-left quadrant of a 2x white canvas, `others` (resized
/// to match) filling the remaining quadrants left to right, top to bottom.
pub fn collage(image: &RgbImage, others: &[RgbImage; 3]) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut canvas = RgbImage::from_pixel(width * 2, height * 2, Rgb([255, 255, 255]));

    image::imageops::replace(&mut canvas, image, 0, 0);

    let slots = [(width, 0), (0, height), (width, height)];
    for (other, (x, y)) in others.iter().zip(slots) {
        let resized = if other.dimensions() == (width, height) {
            other.clone()
        } else {
            image::imageops::resize(other, width, height, FilterType::CatmullRom)
        };
        image::imageops::replace(&mut canvas, &resized, x as i64, y as i64);
    }

    canvas
}

/// Opaque black disc where the overlay glyph would be drawn.
pub fn text_overlay(image: &RgbImage) -> RgbImage {
    let mut covered = image.clone();
    let (width, height) = covered.dimensions();
    let radius = 25;
    let center = ((width / 4) as i32 + radius, (height / 2) as i32 + radius);

    draw_filled_circle_mut(&mut covered, center, radius, Rgb([0, 0, 0]));
    covered
}

pub fn invert(image: &RgbImage) -> RgbImage {
    let mut inverted = image.clone();
    for pixel in inverted.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = 255 - *channel;
        }
    }
    inverted
}

fn map_channels<F: Fn(f32) -> f32>(image: &RgbImage, f: F) -> RgbImage {
    let mut mapped = image.clone();
    for pixel in mapped.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = f(*channel as f32).round().clamp(0.0, 255.0) as u8;
        }
    }
    mapped
}
