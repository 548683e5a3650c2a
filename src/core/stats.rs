//! Descriptive statistics over a category time series.

use crate::core::series::SeriesRow;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Summary of one category's per-window counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    /// Sum over all windows
    pub total: u64,
    /// Mean count per window
    pub mean: f64,
    /// Sample standard deviation (0 with fewer than two windows)
    pub std_dev: f64,
    /// Largest single-window count
    pub max: u64,
}

/// Summarize every category column of a series.
pub fn summarize(categories: &[String], rows: &[SeriesRow]) -> Vec<CategorySummary> {
    categories
        .iter()
        .map(|category| {
            let counts: Vec<u64> = rows.iter().map(|r| r.count(category)).collect();
            let values: Vec<f64> = counts.iter().map(|&c| c as f64).collect();

            let mean = if values.is_empty() {
                0.0
            } else {
                values.iter().mean()
            };
            let std_dev = if values.len() < 2 {
                0.0
            } else {
                values.iter().std_dev()
            };

            CategorySummary {
                category: category.clone(),
                total: counts.iter().sum(),
                mean,
                std_dev,
                max: counts.iter().copied().max().unwrap_or(0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(start: f64, x: u64) -> SeriesRow {
        SeriesRow {
            speaker: "A".to_string(),
            window_start: start,
            window_end: start + 30.0,
            counts: BTreeMap::from([("X".to_string(), x)]),
            placeholder: false,
        }
    }

    #[test]
    fn test_summary_values() {
        let rows = vec![row(0.0, 2), row(15.0, 4), row(30.0, 4), row(45.0, 6)];
        let summary = summarize(&["X".to_string()], &rows);

        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].total, 16);
        assert_eq!(summary[0].max, 6);
        assert!((summary[0].mean - 4.0).abs() < 1e-9);
        // Sample std dev of [2, 4, 4, 6]
        assert!((summary[0].std_dev - (8.0f64 / 3.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_summary_of_empty_series() {
        let summary = summarize(&["X".to_string()], &[]);
        assert_eq!(summary[0].total, 0);
        assert_eq!(summary[0].mean, 0.0);
        assert_eq!(summary[0].std_dev, 0.0);
    }

    #[test]
    fn test_single_row_has_zero_spread() {
        let summary = summarize(&["X".to_string()], &[row(0.0, 3)]);
        assert_eq!(summary[0].mean, 3.0);
        assert_eq!(summary[0].std_dev, 0.0);
    }
}
