pub mod aggregate;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use ndarray::Array2;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    Cell, CellStatus, EvaluationConfig, EvaluationDiagnostics, ResultRow,
    catalogue::{ManipulationCatalogue, manipulated_file_name},
    error::{Result, RobustnessError},
    evaluation::aggregate::{AggregateStat, hardest_manipulation, rank_ascending},
    fingerprint::{Fingerprint, FingerprintExtractor},
    image_utils::{ensure_readable_dir, file_stem, list_images, load_image},
    scoring::score_pair,
};

/// Drives one benchmark run: originals x catalogue into a [`ResultTable`].
#[derive(Debug, Clone)]
pub struct Evaluator {
    catalogue: ManipulationCatalogue,
    extractor: FingerprintExtractor,
    config: EvaluationConfig,
}

impl Evaluator {
    pub fn new(catalogue: ManipulationCatalogue) -> Self {
        Self {
            catalogue,
            extractor: FingerprintExtractor::new(),
            config: EvaluationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EvaluationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_extractor(mut self, extractor: FingerprintExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn catalogue(&self) -> &ManipulationCatalogue {
        &self.catalogue
    }

    /// Both directories must be readable up front; after that, no single
    /// image or variant can abort the run.
    pub fn evaluate<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        originals_dir: P,
        manipulated_dir: Q,
    ) -> Result<ResultTable> {
        let originals_dir = originals_dir.as_ref();
        let manipulated_dir = manipulated_dir.as_ref();

        let originals = list_images(originals_dir, &self.config.original_extensions)?;
        ensure_readable_dir(manipulated_dir)?;

        info!(
            "Evaluating {} originals against {} manipulations ({})",
            originals.len(),
            self.catalogue.len(),
            self.config.method
        );

        let rows = if self.config.parallel {
            originals
                .par_iter()
                .map(|path| self.evaluate_row(path, manipulated_dir))
                .collect::<Vec<_>>()
        } else {
            originals
                .iter()
                .map(|path| self.evaluate_row(path, manipulated_dir))
                .collect::<Vec<_>>()
        };

        let table = ResultTable::new(&self.catalogue, self.config.method.clone(), rows)?;
        let diagnostics = table.diagnostics();
        info!(
            "Scored {} cells ({} missing, {} undecodable)",
            diagnostics.scored, diagnostics.missing, diagnostics.decode_failed
        );

        Ok(table)
    }

    fn evaluate_row(&self, original: &Path, manipulated_dir: &Path) -> ResultRow {
        let image_id = file_stem(original);

        let original_fp = match self.fingerprint_file(original) {
            Ok(fp) => Some(fp),
            Err(e) => {
                warn!("Cannot fingerprint original {}: {}", original.display(), e);
                None
            }
        };

        let cells = self
            .catalogue
            .iter()
            .map(|m| {
                let path = self.variant_path(manipulated_dir, &image_id, m.code);
                if !path.is_file() {
                    debug!("Missing variant {}", path.display());
                    return Cell::missing();
                }

                let Some(original_fp) = original_fp.as_ref() else {
                    return Cell::decode_failed();
                };

                match self.fingerprint_file(&path) {
                    Ok(variant_fp) => Cell::scored(score_pair(Some(original_fp), Some(&variant_fp))),
                    Err(e) => {
                        warn!("Cannot fingerprint variant {}: {}", path.display(), e);
                        Cell::decode_failed()
                    }
                }
            })
            .collect::<Vec<_>>();

        ResultRow::new(image_id, cells, self.config.method.clone())
            .with_original_readable(original_fp.is_some())
    }

    fn fingerprint_file(&self, path: &Path) -> Result<Fingerprint> {
        let image = load_image(path)?;
        self.extractor.extract(&image)
    }

    fn variant_path(&self, manipulated_dir: &Path, image_id: &str, code: char) -> PathBuf {
        manipulated_dir.join(manipulated_file_name(
            image_id,
            code,
            &self.config.manipulated_extension,
        ))
    }
}

/// Scores of one run: a row per original in file-name order, a column per
/// manipulation in catalogue order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    codes: Vec<char>,
    names: Vec<String>,
    method: String,
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Rows must carry one cell per catalogue entry.
    pub fn new(catalogue: &ManipulationCatalogue, method: impl Into<String>, rows: Vec<ResultRow>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.cells.len() != catalogue.len()) {
            return Err(RobustnessError::InvalidParameter(format!(
                "row {} has {} cells, catalogue has {} manipulations",
                row.image_id,
                row.cells.len(),
                catalogue.len()
            )));
        }

        Ok(Self {
            codes: catalogue.iter().map(|m| m.code).collect(),
            names: catalogue.names(),
            method: method.into(),
            rows,
        })
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn manipulation_names(&self) -> &[String] {
        &self.names
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, image_id: &str) -> Option<&ResultRow> {
        self.rows.iter().find(|r| r.image_id == image_id)
    }

    pub fn column(&self, index: usize) -> Vec<Cell> {
        self.rows.iter().map(|r| r.cells[index]).collect()
    }

    pub fn column_by_name(&self, name: &str) -> Option<Vec<Cell>> {
        let index = self.names.iter().position(|n| n == name)?;
        Some(self.column(index))
    }

    /// Images x manipulations.
    pub fn score_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.rows.len(), self.names.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, cell) in row.cells.iter().enumerate() {
                matrix[[i, j]] = cell.score;
            }
        }
        matrix
    }

    pub fn aggregates(&self) -> Vec<AggregateStat> {
        self.codes
            .iter()
            .zip(&self.names)
            .enumerate()
            .map(|(index, (&code, name))| AggregateStat::from_cells(code, name.clone(), &self.column(index)))
            .collect()
    }

    /// `None` when the table has no rows.
    pub fn hardest(&self) -> Option<AggregateStat> {
        if self.rows.is_empty() {
            return None;
        }
        hardest_manipulation(&self.aggregates()).cloned()
    }

    pub fn ranked(&self) -> Vec<AggregateStat> {
        rank_ascending(&self.aggregates()).into_iter().cloned().collect()
    }

    pub fn diagnostics(&self) -> EvaluationDiagnostics {
        let mut diagnostics = EvaluationDiagnostics::default();

        for row in &self.rows {
            if !row.original_readable {
                diagnostics.unreadable_originals.push(row.image_id.clone());
            }
            for cell in &row.cells {
                match cell.status {
                    CellStatus::Scored => diagnostics.scored += 1,
                    CellStatus::Missing => diagnostics.missing += 1,
                    CellStatus::DecodeFailed => diagnostics.decode_failed += 1,
                }
            }
        }

        diagnostics
    }
}
