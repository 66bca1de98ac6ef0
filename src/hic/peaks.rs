//! Interaction peak search over contact matrices.
//!
//! Rows of the matrix are bins of the query region, columns are bins of the
//! searched region. Each row contributes its local maxima above a per-row
//! percentile; the strongest column across all rows is the call.

use super::{DenseMatrix, HicError, Result};
use crate::config::DEFAULT_PEAK_PERCENTILE;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, info};

/// Percentile of `values` with linear interpolation between closest ranks.
/// Returns `None` for an empty slice.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Indices of the local maxima of `values`.
///
/// A flat top counts once, at its middle sample (left of centre for even
/// widths). The first and last samples are never maxima.
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if values.len() < 3 {
        return peaks;
    }
    let last = values.len() - 1;
    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Local maxima of `values` at least `height` high, thinned so that no two
/// kept peaks are closer than `distance` samples. Higher peaks are kept
/// first; among equal heights the rightmost is kept first.
pub fn find_peaks(values: &[f64], height: f64, distance: usize) -> Vec<(usize, f64)> {
    let peaks: Vec<usize> = local_maxima(values)
        .into_iter()
        .filter(|&p| values[p] >= height)
        .collect();
    if distance <= 1 || peaks.len() < 2 {
        return peaks.into_iter().map(|p| (p, values[p])).collect();
    }

    let mut by_height: Vec<usize> = (0..peaks.len()).collect();
    by_height.sort_by(|&a, &b| values[peaks[a]].total_cmp(&values[peaks[b]]));

    let mut keep = vec![true; peaks.len()];
    for &i in by_height.iter().rev() {
        if !keep[i] {
            continue;
        }
        let mut k = i;
        while k > 0 && peaks[i] - peaks[k - 1] < distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = i + 1;
        while k < peaks.len() && peaks[k] - peaks[i] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter(|(_, kept)| *kept)
        .map(|(p, _)| (p, values[p]))
        .collect()
}

/// The strongest column found by [`PeakLocator::locate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCall {
    pub column: usize,
    pub height: f64,
    /// Number of rows with a peak at this column.
    pub support: usize,
}

/// Finds the column with the strongest interaction peak in a matrix.
#[derive(Debug, Clone)]
pub struct PeakLocator {
    /// Per-row height threshold, as a percentile of the row.
    pub percentile: f64,
    /// Drop columns inside the exclusion window before choosing.
    pub exclude_self: bool,
}

impl Default for PeakLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PeakLocator {
    pub fn new() -> Self {
        Self {
            percentile: DEFAULT_PEAK_PERCENTILE,
            exclude_self: true,
        }
    }

    /// Locate the strongest peak column.
    ///
    /// `exclusion` is the window of columns that correspond to the query
    /// region itself. Its width is also the minimum separation between peaks
    /// in a row. Ties on height go to the lowest column.
    pub fn locate(&self, matrix: &DenseMatrix, exclusion: &Range<usize>) -> Result<PeakCall> {
        let distance = exclusion.len().max(1);
        let mut aggregate: BTreeMap<usize, (f64, usize)> = BTreeMap::new();

        for (i, row) in matrix.iter_rows().enumerate() {
            let Some(threshold) = percentile(row, self.percentile) else {
                continue;
            };
            let peaks = find_peaks(row, threshold, distance);
            debug!(row = i, threshold, ?peaks, "row peaks");

            for (col, height) in peaks {
                let entry = aggregate.entry(col).or_insert((height, 0));
                entry.0 = entry.0.max(height);
                entry.1 += 1;
            }
        }

        if self.exclude_self {
            aggregate.retain(|col, _| !exclusion.contains(col));
        }

        let mut best: Option<PeakCall> = None;
        for (&column, &(height, support)) in &aggregate {
            if best.is_none_or(|b| height > b.height) {
                best = Some(PeakCall {
                    column,
                    height,
                    support,
                });
            }
        }

        let call = best.ok_or(HicError::NoPeakFound {
            percentile: self.percentile,
        })?;
        info!(
            column = call.column,
            height = call.height,
            support = call.support,
            "strongest interaction peak"
        );
        Ok(call)
    }
}
