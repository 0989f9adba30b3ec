use image::{Rgb, RgbImage};

use crate::evaluation::{ResultTable, aggregate::AggregateStat};

#[derive(Debug, Clone, Copy)]
pub enum ColorScheme {
    Viridis,
    Grayscale,
    SingleColor(Rgb<u8>),
}

#[derive(Debug, Clone)]
pub struct VisualizationConfig {
    pub color_scheme: ColorScheme,
    /// Side of one image x manipulation cell in the heatmap.
    pub cell_size: u32,
    pub bar_width: u32,
    pub bar_gap: u32,
    pub chart_height: u32,
    pub padding: u32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            color_scheme: ColorScheme::Viridis,
            cell_size: 12,
            bar_width: 32,
            bar_gap: 12,
            chart_height: 320,
            padding: 20,
        }
    }
}

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);

pub struct Visualizer {
    config: VisualizationConfig,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            config: VisualizationConfig::default(),
        }
    }

    pub fn with_config(config: VisualizationConfig) -> Self {
        Self { config }
    }

    /// One cell per (image, manipulation); colour encodes the score on a
    /// 0..100 scale.
    pub fn create_score_heatmap(&self, table: &ResultTable) -> RgbImage {
        let cell = self.config.cell_size.max(1);
        let rows = table.row_count().max(1) as u32;
        let cols = table.column_count().max(1) as u32;
        let mut heatmap = RgbImage::from_pixel(cols * cell, rows * cell, BACKGROUND);

        for (i, row) in table.rows().iter().enumerate() {
            for (j, c) in row.cells.iter().enumerate() {
                let color = self.intensity_to_color((c.score / 100.0) as f32);
                self.fill_rect(&mut heatmap, j as u32 * cell, i as u32 * cell, cell, cell, color);
            }
        }

        heatmap
    }

    /// Mean score per manipulation, bars in catalogue order, with gridlines
    /// every 25 points.
    pub fn create_bar_chart(&self, stats: &[AggregateStat]) -> RgbImage {
        let VisualizationConfig {
            bar_width,
            chart_height,
            ..
        } = self.config;
        let mut chart = self.blank_chart(stats.len());
        let baseline = self.baseline();

        for (i, stat) in stats.iter().enumerate() {
            let fraction = (stat.mean / 100.0).clamp(0.0, 1.0);
            let bar_height = (fraction * chart_height as f64).round() as u32;
            let color = self.intensity_to_color(fraction as f32);
            self.fill_rect(&mut chart, self.slot_x(i), baseline - bar_height, bar_width, bar_height, color);
        }

        self.draw_axes(&mut chart);
        chart
    }

    /// Score spread per manipulation: whiskers span min..max, the box spans
    /// the quartiles and a dark line marks the median.
    pub fn create_box_plot(&self, stats: &[AggregateStat]) -> RgbImage {
        let bar_width = self.config.bar_width;
        let mut chart = self.blank_chart(stats.len());

        for (i, stat) in stats.iter().enumerate().filter(|(_, s)| s.count > 0) {
            let x = self.slot_x(i);
            let center = x + bar_width / 2;
            let cap_x = x + bar_width / 4;
            let cap_width = bar_width / 2;

            let (top, bottom) = (self.score_y(stat.max), self.score_y(stat.min));
            self.fill_rect(&mut chart, center.saturating_sub(1), top, 2, bottom - top + 1, AXIS);

            let (q3, q1) = (self.score_y(stat.upper_quartile), self.score_y(stat.lower_quartile));
            let color = self.intensity_to_color((stat.median / 100.0) as f32);
            self.fill_rect(&mut chart, x, q3, bar_width, (q1 - q3).max(1), color);

            self.fill_rect(&mut chart, cap_x, top, cap_width, 2, AXIS);
            self.fill_rect(&mut chart, cap_x, bottom.saturating_sub(1), cap_width, 2, AXIS);
            self.fill_rect(&mut chart, x, self.score_y(stat.median).saturating_sub(1), bar_width, 2, AXIS);
        }

        self.draw_axes(&mut chart);
        chart
    }

    /// White canvas with one slot per manipulation and gridlines every 25
    /// points.
    fn blank_chart(&self, slots: usize) -> RgbImage {
        let VisualizationConfig {
            bar_width,
            bar_gap,
            chart_height,
            padding,
            ..
        } = self.config;
        let count = slots.max(1) as u32;
        let width = padding * 2 + count * bar_width + (count + 1) * bar_gap;
        let mut chart = RgbImage::from_pixel(width, chart_height + padding * 2, BACKGROUND);

        for step in 1..=4u32 {
            let y = self.baseline() - chart_height * step / 4;
            self.fill_rect(&mut chart, padding, y, width - 2 * padding, 1, GRID);
        }

        chart
    }

    fn draw_axes(&self, chart: &mut RgbImage) {
        let padding = self.config.padding;
        let width = chart.width();
        let baseline = self.baseline();
        self.fill_rect(chart, padding, baseline, width - 2 * padding, 2, AXIS);
        self.fill_rect(chart, padding, padding, 2, self.config.chart_height, AXIS);
    }

    fn baseline(&self) -> u32 {
        self.config.padding + self.config.chart_height
    }

    fn slot_x(&self, index: usize) -> u32 {
        let VisualizationConfig {
            bar_width,
            bar_gap,
            padding,
            ..
        } = self.config;
        padding + bar_gap + index as u32 * (bar_width + bar_gap)
    }

    /// Row of a 0..100 score inside the plot area.
    fn score_y(&self, score: f64) -> u32 {
        let fraction = (score / 100.0).clamp(0.0, 1.0);
        self.baseline() - (fraction * self.config.chart_height as f64).round() as u32
    }

    fn intensity_to_color(&self, intensity: f32) -> Rgb<u8> {
        let intensity = intensity.clamp(0.0, 1.0);

        match self.config.color_scheme {
            ColorScheme::Viridis => {
                let (r, g, b) = Self::viridis_color(intensity);
                Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8])
            }
            ColorScheme::Grayscale => {
                let v = (intensity * 255.0) as u8;
                Rgb([v, v, v])
            }
            ColorScheme::SingleColor(base) => Rgb([
                (base[0] as f32 * intensity) as u8,
                (base[1] as f32 * intensity) as u8,
                (base[2] as f32 * intensity) as u8,
            ]),
        }
    }

    /// Piecewise-linear approximation through five viridis control points.
    fn viridis_color(t: f32) -> (f32, f32, f32) {
        const STOPS: [(f32, f32, f32); 5] = [
            (0.267, 0.005, 0.329),
            (0.230, 0.322, 0.546),
            (0.128, 0.567, 0.551),
            (0.369, 0.789, 0.383),
            (0.993, 0.906, 0.144),
        ];

        let scaled = t.clamp(0.0, 1.0) * (STOPS.len() - 1) as f32;
        let index = (scaled.floor() as usize).min(STOPS.len() - 2);
        let local = scaled - index as f32;
        let (a, b) = (STOPS[index], STOPS[index + 1]);

        (
            a.0 + (b.0 - a.0) * local,
            a.1 + (b.1 - a.1) * local,
            a.2 + (b.2 - a.2) * local,
        )
    }

    fn fill_rect(&self, image: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
        let (image_width, image_height) = image.dimensions();
        for py in y..(y + height).min(image_height) {
            for px in x..(x + width).min(image_width) {
                image.put_pixel(px, py, color);
            }
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
