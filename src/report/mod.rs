pub mod visualization;

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::info;
use serde::Serialize;

use crate::{
    EvaluationDiagnostics,
    error::Result,
    evaluation::{ResultTable, aggregate::AggregateStat},
    report::visualization::Visualizer,
};

#[derive(Serialize)]
pub struct JsonReport {
    pub method: String,
    pub image_count: usize,
    pub manipulations: Vec<AggregateStat>,
    pub hardest: Option<HardestSection>,
    pub diagnostics: EvaluationDiagnostics,
}

#[derive(Serialize)]
pub struct HardestSection {
    pub name: String,
    pub code: char,
    pub mean_score: f64,
}

impl From<&ResultTable> for JsonReport {
    fn from(table: &ResultTable) -> Self {
        Self {
            method: table.method().to_string(),
            image_count: table.row_count(),
            manipulations: table.aggregates(),
            hardest: table.hardest().map(|stat| HardestSection {
                name: stat.name,
                code: stat.code,
                mean_score: stat.mean,
            }),
            diagnostics: table.diagnostics(),
        }
    }
}

impl JsonReport {
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// `image_id,<manipulations...>,method,avg_score`, one line per row.
pub fn write_csv<W: Write>(table: &ResultTable, mut writer: W) -> Result<()> {
    let mut header = vec!["image_id".to_string()];
    header.extend(table.manipulation_names().iter().cloned());
    header.push("method".into());
    header.push("avg_score".into());
    writeln!(writer, "{}", header.join(","))?;

    for row in table.rows() {
        let mut fields = vec![csv_field(&row.image_id)];
        fields.extend(row.cells.iter().map(|c| c.score.to_string()));
        fields.push(csv_field(&row.method));
        fields.push(row.avg_score.to_string());
        writeln!(writer, "{}", fields.join(","))?;
    }

    writer.flush()?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_summary(table: &ResultTable) -> String {
    let rule = "=".repeat(50);
    let mut lines = vec![
        format!("Image Matching Results using {}", table.method().to_uppercase()),
        format!("{}\n", rule),
        "Average Match Scores by Manipulation Type:".to_string(),
        "-".repeat(40),
    ];
    lines.extend(table.ranked().iter().map(|stat| format!("{:15}: {:.2}", stat.name, stat.mean)));

    lines.push(format!("\n{}", rule));
    match table.hardest() {
        Some(hardest) => {
            lines.push(format!("HARDEST MANIPULATION TECHNIQUE: {}", hardest.name));
            lines.push(format!("Average Match Score: {:.2}", hardest.mean));
        }
        None => lines.push("HARDEST MANIPULATION TECHNIQUE: n/a (no images evaluated)".to_string()),
    }
    lines.push(rule);

    let diagnostics = table.diagnostics();
    lines.push(format!(
        "\nCells scored: {}, missing variants: {}, undecodable: {}",
        diagnostics.scored, diagnostics.missing, diagnostics.decode_failed
    ));
    if !diagnostics.unreadable_originals.is_empty() {
        lines.push(format!(
            "Unreadable originals: {}",
            diagnostics.unreadable_originals.join(", ")
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub summary: PathBuf,
    pub json: PathBuf,
    pub plots: Vec<PathBuf>,
}

/// Persists a [`ResultTable`] under one output directory.
pub struct ReportWriter {
    output_dir: PathBuf,
    plots: bool,
    visualizer: Visualizer,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            plots: true,
            visualizer: Visualizer::new(),
        }
    }

    pub fn with_plots(mut self, plots: bool) -> Self {
        self.plots = plots;
        self
    }

    pub fn with_visualizer(mut self, visualizer: Visualizer) -> Self {
        self.visualizer = visualizer;
        self
    }

    pub fn write_all(&self, table: &ResultTable) -> Result<ReportPaths> {
        fs::create_dir_all(&self.output_dir)?;
        let method = table.method();

        let csv = self.output_dir.join(format!("{}_results.csv", method));
        write_csv(table, BufWriter::new(File::create(&csv)?))?;

        let summary = self.output_dir.join(format!("{}_summary.txt", method));
        fs::write(&summary, render_summary(table))?;

        let json = self.output_dir.join(format!("{}_report.json", method));
        fs::write(&json, JsonReport::from(table).to_json()?)?;

        let mut plots = Vec::new();
        if self.plots && !table.is_empty() {
            let bar = self.output_dir.join("average_scores_bar.png");
            self.visualizer.create_bar_chart(&table.aggregates()).save(&bar)?;
            plots.push(bar);

            let heatmap = self.output_dir.join("similarity_heatmap.png");
            self.visualizer.create_score_heatmap(table).save(&heatmap)?;
            plots.push(heatmap);

            let boxplot = self.output_dir.join("scores_boxplot.png");
            self.visualizer.create_box_plot(&table.aggregates()).save(&boxplot)?;
            plots.push(boxplot);
        }

        info!("Reports written to {}", self.output_dir.display());

        Ok(ReportPaths {
            csv,
            summary,
            json,
            plots,
        })
    }
}
