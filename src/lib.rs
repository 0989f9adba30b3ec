use std::path::Path;

use serde::Serialize;

use crate::{
    catalogue::ManipulationCatalogue,
    error::Result,
    evaluation::{Evaluator, ResultTable},
    image_utils::default_extensions,
};

pub mod catalogue;
pub mod error;
pub mod evaluation;
pub mod fingerprint;
pub mod image_utils;
pub mod manipulation;
pub mod report;
pub mod scoring;

pub use catalogue::{Manipulation, manipulated_file_name};
pub use fingerprint::{Fingerprint, FingerprintExtractor, PhashConfig};

#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    /// Extension of generated variants, without the dot.
    pub manipulated_extension: String,
    pub original_extensions: Vec<String>,
    pub parallel: bool,
    pub method: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            manipulated_extension: "jpg".into(),
            original_extensions: default_extensions(),
            parallel: true,
            method: "phash".into(),
        }
    }
}

impl EvaluationConfig {
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_manipulated_extension(mut self, extension: impl Into<String>) -> Self {
        self.manipulated_extension = extension.into();
        self
    }

    pub fn with_original_extensions(mut self, extensions: Vec<String>) -> Self {
        self.original_extensions = extensions;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }
}

/// Scores every original in `originals` against its variants in
/// `manipulated` using the default extractor and configuration.
pub fn evaluate<P: AsRef<Path>, Q: AsRef<Path>>(
    originals: P,
    manipulated: Q,
    catalogue: &ManipulationCatalogue,
) -> Result<ResultTable> {
    Evaluator::new(catalogue.clone()).evaluate(originals, manipulated)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellStatus {
    Scored,
    /// The expected variant file does not exist.
    Missing,
    /// The variant or the original exists but could not be decoded.
    DecodeFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cell {
    pub score: f64,
    pub status: CellStatus,
}

impl Cell {
    pub fn scored(score: f64) -> Self {
        Self {
            score,
            status: CellStatus::Scored,
        }
    }

    pub fn missing() -> Self {
        Self {
            score: 0.0,
            status: CellStatus::Missing,
        }
    }

    pub fn decode_failed() -> Self {
        Self {
            score: 0.0,
            status: CellStatus::DecodeFailed,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.status != CellStatus::Scored
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub image_id: String,
    pub cells: Vec<Cell>,
    pub method: String,
    pub avg_score: f64,
    pub original_readable: bool,
}

impl ResultRow {
    pub fn new(image_id: impl Into<String>, cells: Vec<Cell>, method: impl Into<String>) -> Self {
        let avg_score = if cells.is_empty() {
            0.0
        } else {
            cells.iter().map(|c| c.score).sum::<f64>() / cells.len() as f64
        };

        Self {
            image_id: image_id.into(),
            cells,
            method: method.into(),
            avg_score,
            original_readable: true,
        }
    }

    pub fn with_original_readable(mut self, readable: bool) -> Self {
        self.original_readable = readable;
        self
    }

    pub fn scores(&self) -> Vec<f64> {
        self.cells.iter().map(|c| c.score).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationDiagnostics {
    pub scored: usize,
    pub missing: usize,
    pub decode_failed: usize,
    pub unreadable_originals: Vec<String>,
}

impl EvaluationDiagnostics {
    pub fn total_cells(&self) -> usize {
        self.scored + self.missing + self.decode_failed
    }
}
