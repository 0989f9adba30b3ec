//! Generation of manipulated variants ahead of an evaluation run.
//!
//! Catalogue names double as transform descriptions: parameterised
//! manipulations carry their argument after the last underscore
//! (`crop_20`, `rotate_10`, `brightness_1.3`, `contrast_0.7`).

pub mod transforms;

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use image::{DynamicImage, RgbImage};
use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    catalogue::{ManipulationCatalogue, manipulated_file_name},
    error::{Result, RobustnessError},
    image_utils::{default_extensions, file_stem, list_images, load_image},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManipulationKind {
    Crop { percent: u32 },
    Rotate { degrees: f32 },
    FlipHorizontal,
    Brightness { factor: f32 },
    Contrast { factor: f32 },
    GaussianBlur,
    SaltAndPepper,
    ColorFilter,
    Watermark,
    CanvasExpand,
    JpegCompression,
    Collage,
    TextOverlay,
    InvertColors,
}

impl ManipulationKind {
    pub fn parse(name: &str) -> Result<Self> {
        let kind = match name {
            "flip_h" => Self::FlipHorizontal,
            "gaussian_blur" => Self::GaussianBlur,
            "noise_saltpepper" => Self::SaltAndPepper,
            "color_filter" => Self::ColorFilter,
            "watermark" => Self::Watermark,
            "canvas_expand" => Self::CanvasExpand,
            "jpeg_compression" => Self::JpegCompression,
            "collage" => Self::Collage,
            "text_obfuscation" => Self::TextOverlay,
            "invert_colors" => Self::InvertColors,
            _ => return Self::parse_parameterised(name),
        };

        Ok(kind)
    }

    fn parse_parameterised(name: &str) -> Result<Self> {
        let unknown = || RobustnessError::UnknownManipulation(name.to_string());
        let (prefix, arg) = name.rsplit_once('_').ok_or_else(unknown)?;

        let kind = match prefix {
            "crop" => {
                let percent = arg.parse::<u32>().map_err(|_| unknown())?;
                if percent >= 50 {
                    return Err(RobustnessError::InvalidParameter(format!(
                        "{}: crop must remove less than 50% per edge",
                        name
                    )));
                }
                Self::Crop { percent }
            }
            "rotate" => Self::Rotate {
                degrees: arg.parse().map_err(|_| unknown())?,
            },
            "brightness" => Self::Brightness {
                factor: parse_factor(name, arg)?,
            },
            "contrast" => Self::Contrast {
                factor: parse_factor(name, arg)?,
            },
            _ => return Err(unknown()),
        };

        Ok(kind)
    }
}

fn parse_factor(name: &str, arg: &str) -> Result<f32> {
    let factor = arg
        .parse::<f32>()
        .map_err(|_| RobustnessError::UnknownManipulation(name.to_string()))?;
    if !factor.is_finite() || factor < 0.0 {
        return Err(RobustnessError::InvalidParameter(format!(
            "{}: factor must be a non-negative number",
            name
        )));
    }
    Ok(factor)
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub output_quality: u8,
    pub recompress_quality: u8,
    pub original_extensions: Vec<String>,
    pub parallel: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            output_quality: 75,
            recompress_quality: 20,
            original_extensions: default_extensions(),
            parallel: true,
        }
    }
}

impl GeneratorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Writes `{image_id}{code}.jpg` for every original and catalogue entry.
#[derive(Debug, Clone)]
pub struct ManipulationGenerator {
    steps: Vec<(char, ManipulationKind)>,
    config: GeneratorConfig,
}

impl ManipulationGenerator {
    pub fn new(catalogue: &ManipulationCatalogue, config: GeneratorConfig) -> Result<Self> {
        if !(1..=100).contains(&config.output_quality) || !(1..=100).contains(&config.recompress_quality) {
            return Err(RobustnessError::InvalidParameter(
                "JPEG quality must be between 1 and 100".into(),
            ));
        }

        let steps = catalogue
            .iter()
            .map(|m| Ok((m.code, ManipulationKind::parse(&m.name)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { steps, config })
    }

    /// Applies one manipulation. `pool` supplies the other images a collage
    /// is assembled from.
    pub fn apply(
        &self,
        kind: ManipulationKind,
        image: &RgbImage,
        pool: &[PathBuf],
        rng: &mut StdRng,
    ) -> Result<RgbImage> {
        let result = match kind {
            ManipulationKind::Crop { percent } => transforms::crop_edges(image, percent),
            ManipulationKind::Rotate { degrees } => transforms::rotate_expand(image, degrees),
            ManipulationKind::FlipHorizontal => transforms::flip_horizontal(image),
            ManipulationKind::Brightness { factor } => transforms::adjust_brightness(image, factor),
            ManipulationKind::Contrast { factor } => transforms::adjust_contrast(image, factor),
            ManipulationKind::GaussianBlur => transforms::gaussian_blur(image, transforms::BLUR_SIGMA),
            ManipulationKind::SaltAndPepper => {
                transforms::salt_and_pepper(image, transforms::NOISE_FRACTION, rng)
            }
            ManipulationKind::ColorFilter => transforms::color_filter(image, [1.2, 0.9, 1.1]),
            ManipulationKind::Watermark => transforms::watermark(image),
            ManipulationKind::CanvasExpand => transforms::expand_canvas(image, transforms::CANVAS_BORDER),
            ManipulationKind::JpegCompression => {
                transforms::recompress_jpeg(image, self.config.recompress_quality)?
            }
            ManipulationKind::Collage => {
                let others = self.pick_collage_tiles(image, pool, rng);
                transforms::collage(image, &others)
            }
            ManipulationKind::TextOverlay => transforms::text_overlay(image),
            ManipulationKind::InvertColors => transforms::invert(image),
        };

        Ok(result)
    }

    /// Returns the number of files written. Originals that fail to decode
    /// are skipped with a warning.
    pub fn generate<P: AsRef<Path>, Q: AsRef<Path>>(&self, originals_dir: P, output_dir: Q) -> Result<usize> {
        let originals = list_images(originals_dir, &self.config.original_extensions)?;
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        info!(
            "Generating {} manipulations for {} originals into {}",
            self.steps.len(),
            originals.len(),
            output_dir.display()
        );

        let written = if self.config.parallel {
            originals
                .par_iter()
                .map(|path| self.generate_for(path, &originals, output_dir))
                .collect::<Result<Vec<_>>>()?
        } else {
            originals
                .iter()
                .map(|path| self.generate_for(path, &originals, output_dir))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(written.into_iter().sum())
    }

    fn generate_for(&self, original: &Path, pool: &[PathBuf], output_dir: &Path) -> Result<usize> {
        let image = match load_image(original) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                warn!("Skipping undecodable original {}: {}", original.display(), e);
                return Ok(0);
            }
        };
        let image_id = file_stem(original);

        for &(code, kind) in &self.steps {
            let mut rng = StdRng::seed_from_u64(self.seed_for(&image_id, code));
            let manipulated = self.apply(kind, &image, pool, &mut rng)?;
            let path = output_dir.join(manipulated_file_name(&image_id, code, "jpg"));
            self.save_jpeg(&manipulated, &path)?;
        }

        info!("Processed {} with {} manipulations", image_id, self.steps.len());
        Ok(self.steps.len())
    }

    fn pick_collage_tiles(&self, image: &RgbImage, pool: &[PathBuf], rng: &mut StdRng) -> [RgbImage; 3] {
        let mut tiles = pool
            .choose_multiple(rng, 3)
            .filter_map(|path| match load_image(path) {
                Ok(tile) => Some(tile.to_rgb8()),
                Err(e) => {
                    warn!("Collage tile {} unusable: {}", path.display(), e);
                    None
                }
            })
            .collect::<Vec<_>>();

        while tiles.len() < 3 {
            tiles.push(image.clone());
        }

        [tiles[0].clone(), tiles[1].clone(), tiles[2].clone()]
    }

    /// Independent of processing order, so parallel and sequential runs
    /// produce identical files.
    fn seed_for(&self, image_id: &str, code: char) -> u64 {
        // FNV-1a over the id and code, mixed with the configured seed
        let mut hash = 0xcbf2_9ce4_8422_2325u64 ^ self.config.seed;
        let mut code_buf = [0u8; 4];
        for byte in image_id.bytes().chain(code.encode_utf8(&mut code_buf).bytes()) {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }

    fn save_jpeg(&self, image: &RgbImage, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, self.config.output_quality);
        DynamicImage::ImageRgb8(image.clone()).write_with_encoder(encoder)?;
        Ok(())
    }
}
