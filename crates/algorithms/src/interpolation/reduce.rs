//! Reduction of gathered samples to a single value

use super::method::InterpolationMethod;
use serde::{Deserialize, Serialize};

/// A raster sample near a query point, after lookup, scaling and
/// threshold filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    /// Metric distance from the query point
    pub distance: f64,
    pub value: f64,
    /// Locality weight; 1 unless a directional run down-weights the sample
    pub weight: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, distance: f64, value: f64) -> Self {
        Self {
            x,
            y,
            distance,
            value,
            weight: 1.0,
        }
    }
}

/// Tunables shared by the reducers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceOptions {
    /// `k` in the outlier test `|v - mean| > k * std`
    pub std_multiplier: f64,
    /// Exponent applied to distance in inverse-distance weighting
    pub idw_power: f64,
    /// Samples closer than this are returned as-is by inverse-distance methods
    pub snap_distance: f64,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            std_multiplier: 2.0,
            idw_power: 1.0,
            snap_distance: 1e-10,
        }
    }
}

/// Reduce samples (sorted nearest first) with `method`.
///
/// Returns `None` when there is nothing to reduce or the weights vanish.
pub fn reduce(
    method: InterpolationMethod,
    samples: &[Sample],
    opts: &ReduceOptions,
) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    match method {
        InterpolationMethod::NoMethod => None,
        InterpolationMethod::Average
        | InterpolationMethod::BilskieAveraging
        | InterpolationMethod::AverageNearestN => weighted_mean(samples),
        InterpolationMethod::Nearest => Some(samples[0].value),
        InterpolationMethod::Highest => highest(samples),
        InterpolationMethod::OutsideStandardDeviation => {
            outside_standard_deviation(samples, opts.std_multiplier)
        }
        InterpolationMethod::InverseDistanceWeighted
        | InterpolationMethod::InverseDistanceWeightedNPoints => {
            inverse_distance(samples, opts.idw_power, opts.snap_distance)
        }
    }
}

fn weighted_mean(samples: &[Sample]) -> Option<f64> {
    let (sum_w, sum_wv) = samples
        .iter()
        .fold((0.0, 0.0), |(w, wv), s| (w + s.weight, wv + s.weight * s.value));
    (sum_w > 0.0).then(|| sum_wv / sum_w)
}

fn highest(samples: &[Sample]) -> Option<f64> {
    samples.iter().map(|s| s.value).reduce(f64::max)
}

fn outside_standard_deviation(samples: &[Sample], k: f64) -> Option<f64> {
    let mean = weighted_mean(samples)?;
    let sum_w: f64 = samples.iter().map(|s| s.weight).sum();
    let var = samples
        .iter()
        .map(|s| s.weight * (s.value - mean).powi(2))
        .sum::<f64>()
        / sum_w;
    let limit = k * var.sqrt();

    let (w, wv) = samples
        .iter()
        .filter(|s| (s.value - mean).abs() > limit)
        .fold((0.0, 0.0), |(w, wv), s| (w + s.weight, wv + s.weight * s.value));

    if w > 0.0 { Some(wv / w) } else { Some(mean) }
}

fn inverse_distance(samples: &[Sample], power: f64, snap: f64) -> Option<f64> {
    if let Some(hit) = samples.iter().find(|s| s.distance < snap) {
        return Some(hit.value);
    }

    let mut sum_w = 0.0;
    let mut sum_wz = 0.0;
    for s in samples {
        let w = s.weight / s.distance.powf(power);
        sum_w += w;
        sum_wz += w * s.value;
    }

    (sum_w > 0.0).then(|| sum_wz / sum_w)
}
