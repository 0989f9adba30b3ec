use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};

use crate::Cell;

/// Distribution of one manipulation's scores across all images.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStat {
    pub code: char,
    pub name: String,
    pub mean: f64,
    pub median: f64,
    pub lower_quartile: f64,
    pub upper_quartile: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub sentinel_count: usize,
}

impl AggregateStat {
    pub fn from_scores(code: char, name: impl Into<String>, scores: &[f64]) -> Self {
        Self::build(code, name.into(), scores, 0)
    }

    pub fn from_cells(code: char, name: impl Into<String>, cells: &[Cell]) -> Self {
        let scores = cells.iter().map(|c| c.score).collect::<Vec<_>>();
        let sentinels = cells.iter().filter(|c| c.is_sentinel()).count();
        Self::build(code, name.into(), &scores, sentinels)
    }

    fn build(code: char, name: String, scores: &[f64], sentinel_count: usize) -> Self {
        if scores.is_empty() {
            return Self {
                code,
                name,
                mean: 0.0,
                median: 0.0,
                lower_quartile: 0.0,
                upper_quartile: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                count: 0,
                sentinel_count,
            };
        }

        let std_dev = if scores.len() > 1 {
            Statistics::std_dev(scores.iter())
        } else {
            0.0
        };

        let mut data = Data::new(scores.to_vec());

        Self {
            code,
            name,
            mean: Statistics::mean(scores.iter()),
            median: OrderStatistics::median(&mut data),
            lower_quartile: data.lower_quartile(),
            upper_quartile: data.upper_quartile(),
            std_dev,
            min: Statistics::min(scores.iter()),
            max: Statistics::max(scores.iter()),
            count: scores.len(),
            sentinel_count,
        }
    }
}

/// The manipulation with the lowest mean score; the first one in catalogue
/// order wins a tie.
pub fn hardest_manipulation(stats: &[AggregateStat]) -> Option<&AggregateStat> {
    stats.iter().fold(None, |best: Option<&AggregateStat>, stat| match best {
        Some(current) if current.mean <= stat.mean => Some(current),
        _ => Some(stat),
    })
}

/// Stats sorted by ascending mean; equal means keep catalogue order.
pub fn rank_ascending(stats: &[AggregateStat]) -> Vec<&AggregateStat> {
    let mut ranked = stats.iter().collect::<Vec<_>>();
    ranked.sort_by(|a, b| a.mean.total_cmp(&b.mean));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardest_is_minimum_mean() {
        let stats = vec![
            AggregateStat::from_scores('a', "crop", &[80.0]),
            AggregateStat::from_scores('b', "blur", &[40.0]),
            AggregateStat::from_scores('c', "flip", &[95.0]),
        ];

        let hardest = hardest_manipulation(&stats).unwrap();
        assert_eq!(hardest.name, "blur");
        assert_eq!(hardest.mean, 40.0);
    }

    #[test]
    fn test_hardest_tie_goes_to_first() {
        let stats = vec![
            AggregateStat::from_scores('a', "first", &[50.0, 50.0]),
            AggregateStat::from_scores('b', "second", &[25.0, 75.0]),
        ];
        assert_eq!(hardest_manipulation(&stats).unwrap().name, "first");
        assert!(hardest_manipulation(&[]).is_none());
    }

    #[test]
    fn test_stats_of_a_column() {
        let stat = AggregateStat::from_scores('a', "x", &[70.0, 0.0, 0.0]);
        assert!((stat.mean - 70.0 / 3.0).abs() < 1e-12);
        assert_eq!(stat.median, 0.0);
        assert_eq!(stat.min, 0.0);
        assert_eq!(stat.max, 70.0);
        assert_eq!(stat.count, 3);
        assert!(stat.lower_quartile <= stat.median && stat.median <= stat.upper_quartile);
        assert!(stat.upper_quartile <= stat.max);
        assert!((stat.std_dev - (4900.0f64 / 3.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_single_and_empty_columns() {
        let single = AggregateStat::from_scores('a', "x", &[42.0]);
        assert_eq!(single.std_dev, 0.0);
        assert_eq!(single.median, 42.0);
        assert_eq!(single.lower_quartile, 42.0);
        assert_eq!(single.upper_quartile, 42.0);

        let empty = AggregateStat::from_scores('a', "x", &[]);
        assert_eq!(empty.mean, 0.0);
        assert_eq!(empty.count, 0);
    }

    #[test]
    fn test_sentinels_counted_from_cells() {
        let cells = [Cell::scored(90.0), Cell::missing(), Cell::decode_failed()];
        let stat = AggregateStat::from_cells('a', "x", &cells);
        assert_eq!(stat.sentinel_count, 2);
        assert_eq!(stat.mean, 30.0);
    }

    #[test]
    fn test_rank_ascending_is_stable() {
        let stats = vec![
            AggregateStat::from_scores('a', "a", &[60.0]),
            AggregateStat::from_scores('b', "b", &[10.0]),
            AggregateStat::from_scores('c', "c", &[60.0]),
        ];
        let names = rank_ascending(&stats).iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
