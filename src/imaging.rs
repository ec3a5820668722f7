//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Image decoding and scaling for display.
//!

use image::{imageops::FilterType, DynamicImage, RgbImage};
use std::path::Path;

pub const THUMBNAIL_SIZE: u32 = 100;

pub fn load_file(path: &Path) -> Result<DynamicImage, image::ImageError> {
    image::open(path)
}

pub fn decode(contents: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(contents)
}

/// Returns the largest size with the image's aspect ratio which fits in the frame (`None` if it would be empty).
///
/// Images smaller than the frame are scaled up.
pub fn fit_within(image_width: u32, image_height: u32, frame_width: u32, frame_height: u32) -> Option<(u32, u32)> {
    if image_width == 0 || image_height == 0 || frame_width == 0 || frame_height == 0 {
        return None;
    }

    // compare the aspect ratios without rounding: fw/fh > iw/ih
    let (width, height) = if frame_width as u64 * image_height as u64 > image_width as u64 * frame_height as u64 {
        ((frame_height as u64 * image_width as u64 / image_height as u64) as u32, frame_height)
    } else {
        (frame_width, (frame_width as u64 * image_height as u64 / image_width as u64) as u32)
    };

    if width > 0 && height > 0 { Some((width, height)) } else { None }
}

/// Scales `image` to fit in the frame, preserving the aspect ratio.
pub fn scale_to_fit(image: &DynamicImage, frame_width: u32, frame_height: u32) -> Option<RgbImage> {
    let (width, height) = fit_within(image.width(), image.height(), frame_width, frame_height)?;
    Some(image.resize_exact(width, height, FilterType::Lanczos3).to_rgb8())
}

pub fn thumbnail(image: &DynamicImage) -> RgbImage {
    if image.width() <= THUMBNAIL_SIZE && image.height() <= THUMBNAIL_SIZE {
        image.to_rgb8()
    } else {
        image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE).to_rgb8()
    }
}
