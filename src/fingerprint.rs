//! DCT perceptual hash.
//!
//! The image is reduced to a small luminance grid, transformed with a 2-D
//! DCT-II, and the top-left `hash_size`x`hash_size` block of low-frequency
//! coefficients is binarised against its own median. With the default
//! configuration (32x32 grid, 8x8 block) this yields a 64-bit fingerprint.

use std::{f64::consts::PI, fmt, path::Path, sync::Arc};

use image::{DynamicImage, GenericImageView, imageops::FilterType};
use ndarray::{Array1, Array2, s};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::{
    error::{Result, RobustnessError},
    image_utils::{load_image, luma_grid},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    bits: u64,
    bit_len: u32,
}

impl Fingerprint {
    pub fn new(bits: u64, bit_len: u32) -> Result<Self> {
        if bit_len == 0 || bit_len > 64 {
            return Err(RobustnessError::InvalidParameter(format!(
                "fingerprint length must be 1..=64 bits, got {}",
                bit_len
            )));
        }
        let mask = if bit_len == 64 { u64::MAX } else { (1u64 << bit_len) - 1 };

        Ok(Self {
            bits: bits & mask,
            bit_len,
        })
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn bit_len(&self) -> u32 {
        self.bit_len
    }

    pub fn to_hex(&self) -> String {
        let digits = self.bit_len.div_ceil(4) as usize;
        format!("{:0width$x}", self.bits, width = digits)
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim();
        if hex.is_empty() || hex.len() > 16 {
            return Err(RobustnessError::InvalidParameter(format!(
                "fingerprint hex must be 1..=16 digits, got '{}'",
                hex
            )));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RobustnessError::InvalidParameter(format!(
                "invalid fingerprint hex '{}'",
                hex
            )));
        }
        let bits = u64::from_str_radix(hex, 16).map_err(|e| {
            RobustnessError::InvalidParameter(format!("invalid fingerprint hex '{}': {}", hex, e))
        })?;

        Self::new(bits, hex.len() as u32 * 4)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone)]
pub struct PhashConfig {
    pub grid_size: u32,
    pub hash_size: u32,
    pub filter: FilterType,
}

impl Default for PhashConfig {
    fn default() -> Self {
        Self {
            grid_size: 32,
            hash_size: 8,
            filter: FilterType::Lanczos3,
        }
    }
}

impl PhashConfig {
    pub fn bit_len(&self) -> u32 {
        self.hash_size * self.hash_size
    }

    fn validate(&self) -> Result<()> {
        if !(2..=8).contains(&self.hash_size) {
            return Err(RobustnessError::InvalidParameter(
                "hash size must be between 2 and 8".into(),
            ));
        }
        if self.grid_size < self.hash_size {
            return Err(RobustnessError::InvalidParameter(
                "grid size must not be smaller than hash size".into(),
            ));
        }
        Ok(())
    }
}

/// Computes fingerprints. Both sides of a comparison must come from
/// extractors with the same configuration.
#[derive(Clone)]
pub struct FingerprintExtractor {
    config: PhashConfig,
    fft: Arc<dyn Fft<f64>>,
}

impl FingerprintExtractor {
    pub fn new() -> Self {
        Self::build(PhashConfig::default())
    }

    pub fn with_config(config: PhashConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PhashConfig) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(2 * config.grid_size as usize);

        Self { config, fft }
    }

    pub fn config(&self) -> &PhashConfig {
        &self.config
    }

    pub fn bit_len(&self) -> u32 {
        self.config.bit_len()
    }

    pub fn extract(&self, image: &DynamicImage) -> Result<Fingerprint> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RobustnessError::ImageTooSmall(1));
        }

        let mut grid = luma_grid(image, self.config.grid_size, self.config.filter);
        self.dct_2d(&mut grid);

        let n = self.config.hash_size as usize;
        let low_freq = grid.slice(s![..n, ..n]).iter().copied().collect::<Vec<_>>();
        let median = median(&low_freq);

        let bit_len = self.bit_len();
        let mut bits = 0u64;
        for (i, &coeff) in low_freq.iter().enumerate() {
            if coeff > median {
                bits |= 1 << (bit_len as usize - 1 - i);
            }
        }

        Fingerprint::new(bits, bit_len)
    }

    pub fn extract_path<P: AsRef<Path>>(&self, path: P) -> Result<Fingerprint> {
        let image = load_image(path)?;
        self.extract(&image)
    }

    /// Separable unnormalised DCT-II, columns first then rows.
    fn dct_2d(&self, grid: &mut Array2<f64>) {
        let mut buffer = Vec::with_capacity(2 * self.config.grid_size as usize);

        for mut column in grid.columns_mut() {
            let out = self.dct_ii(column.to_vec(), &mut buffer);
            column.assign(&out);
        }

        for mut row in grid.rows_mut() {
            let out = self.dct_ii(row.to_vec(), &mut buffer);
            row.assign(&out);
        }
    }

    /// DCT-II of `input` through a 2N-point FFT of its mirrored extension:
    /// `y[k] = Re(exp(-i*pi*k / 2N) * FFT(x ++ reverse(x))[k])`.
    fn dct_ii(&self, input: Vec<f64>, buffer: &mut Vec<Complex<f64>>) -> Array1<f64> {
        let n = input.len();

        buffer.clear();
        buffer.extend(input.iter().map(|&v| Complex::new(v, 0.0)));
        buffer.extend(input.iter().rev().map(|&v| Complex::new(v, 0.0)));

        self.fft.process(buffer);

        (0..n)
            .map(|k| {
                let twiddle = Complex::from_polar(1.0, -PI * k as f64 / (2.0 * n as f64));
                (buffer[k] * twiddle).re
            })
            .collect()
    }
}

impl Default for FingerprintExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FingerprintExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FingerprintExtractor")
            .field("config", &self.config)
            .finish()
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
