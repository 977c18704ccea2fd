use serde::{Deserialize, Serialize};

/// Summary of one metric over a batch, computed over defined values only.
///
/// Every statistic is `None` when no value is defined. `std_dev` is the
/// sample standard deviation and also needs at least two values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub undefined_count: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub median: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

/// Percentile of a **sorted**, non-empty slice by linear interpolation.
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

impl SummaryStatistics {
    /// Summarise `values`, counting `None` as undefined.
    pub fn from_values(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let mut undefined_count = 0;
        let mut defined: Vec<f64> = Vec::new();
        for v in values {
            match v {
                Some(x) if x.is_finite() => defined.push(x),
                _ => undefined_count += 1,
            }
        }
        let count = defined.len();
        if count == 0 {
            return Self {
                undefined_count,
                ..Self::default()
            };
        }

        defined.sort_by(|a, b| a.total_cmp(b));
        let n = count as f64;
        let mean = defined.iter().sum::<f64>() / n;
        let std_dev = (count > 1).then(|| {
            let ss = defined.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
            (ss / (n - 1.0)).sqrt()
        });

        Self {
            count,
            undefined_count,
            mean: Some(mean),
            std_dev,
            min: defined.first().copied(),
            p25: Some(percentile_sorted(&defined, 25.0)),
            median: Some(percentile_sorted(&defined, 50.0)),
            p75: Some(percentile_sorted(&defined, 75.0)),
            max: defined.last().copied(),
        }
    }
}
