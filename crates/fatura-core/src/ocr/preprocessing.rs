//! Image preprocessing for recognition.

use std::path::Path;

use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use tracing::debug;

use crate::error::FaturaError;
use crate::models::config::PreprocessConfig;

/// Image preprocessor: grayscale, denoise, then global binarization.
pub struct ImagePreprocessor {
    /// Maximum image dimension.
    max_size: u32,
    /// Whether denoising and binarization are applied.
    advanced: bool,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            max_size: 2048,
            advanced: true,
        }
    }

    /// Create a preprocessor from configuration.
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self::new()
            .with_max_size(config.max_image_size)
            .with_advanced(config.advanced)
    }

    /// Set maximum image dimension.
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size;
        self
    }

    /// Enable or disable denoising and binarization.
    pub fn with_advanced(mut self, advanced: bool) -> Self {
        self.advanced = advanced;
        self
    }

    /// Whether denoising and binarization are applied.
    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    /// Read an image from disk and preprocess it.
    pub fn load(&self, path: &Path) -> Result<GrayImage, FaturaError> {
        let image = image::open(path).map_err(|source| FaturaError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.preprocess(&image))
    }

    /// Preprocess an in-memory image.
    pub fn preprocess(&self, image: &DynamicImage) -> GrayImage {
        let (width, height) = image.dimensions();
        let (new_width, new_height) = self.calculate_resize_dimensions(width, height);

        let gray = if (new_width, new_height) != (width, height) {
            debug!(
                "Downscaling {}x{} to {}x{}",
                width, height, new_width, new_height
            );
            image
                .resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
                .to_luma8()
        } else {
            image.to_luma8()
        };

        if !self.advanced {
            debug!("Grayscale-only preprocessing");
            return gray;
        }

        let denoised = median_filter(&gray);
        let threshold = otsu_threshold(&denoised);
        debug!("Otsu threshold: {}", threshold);

        binarize(&denoised, threshold)
    }

    fn calculate_resize_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let max_dim = width.max(height);

        if max_dim <= self.max_size || self.max_size == 0 {
            return (width, height);
        }

        let scale = self.max_size as f32 / max_dim as f32;
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;

        (new_width.max(1), new_height.max(1))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// 3x3 median filter; edge pixels use the clamped neighbourhood.
fn median_filter(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);
    let mut window = Vec::with_capacity(9);

    for y in 0..height {
        for x in 0..width {
            window.clear();

            let y_start = y.saturating_sub(1);
            let y_end = (y + 2).min(height);
            let x_start = x.saturating_sub(1);
            let x_end = (x + 2).min(width);

            for ly in y_start..y_end {
                for lx in x_start..x_end {
                    window.push(image.get_pixel(lx, ly)[0]);
                }
            }

            window.sort_unstable();
            result.put_pixel(x, y, Luma([window[window.len() / 2]]));
        }
    }

    result
}

/// Global threshold maximising between-class variance of the histogram.
pub fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }

    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0.0f64;
    let mut best_variance = 0.0f64;
    let mut best_threshold = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }

        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }

        background_sum += level as f64 * count as f64;

        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_sum - background_sum) / foreground_weight as f64;
        let diff = background_mean - foreground_mean;
        let variance = background_weight as f64 * foreground_weight as f64 * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_threshold = level as u8;
        }
    }

    best_threshold
}

fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let output = if pixel[0] > threshold { 255 } else { 0 };
        result.put_pixel(x, y, Luma([output]));
    }

    result
}
