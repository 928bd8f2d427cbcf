//! Directional decomposition of samples into angular sectors
//!
//! Used for directional land roughness: every sector around a query point
//! is reduced separately so that a wind blowing from that direction sees
//! only the upwind surface. Bearings are measured counter-clockwise from
//! east; sector `k` is centred on `k · 360/n` degrees.

use super::method::InterpolationMethod;
use super::reduce::{ReduceOptions, Sample, reduce};
use coastmesh_core::{DistanceMetric, Error, Point, Result};
use serde::{Deserialize, Serialize};

/// Sector layout and weighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalParams {
    /// Number of equal sectors covering the circle
    pub sectors: usize,
    /// Search radius in metric units
    pub radius: f64,
    /// Standard deviation of the distance weighting, in kilometres
    pub sigma_km: f64,
    /// Standard deviation, in degrees, of an optional down-weighting of
    /// samples away from their sector centre
    pub angular_width: Option<f64>,
}

impl Default for DirectionalParams {
    fn default() -> Self {
        Self {
            sectors: 12,
            radius: 10_000.0,
            sigma_km: 6.0,
            angular_width: None,
        }
    }
}

impl DirectionalParams {
    pub fn validate(&self) -> Result<()> {
        if self.sectors == 0 || self.sectors > 360 {
            return Err(Error::invalid_parameter(
                "directional.sectors",
                self.sectors,
                "must lie in 1..=360",
            ));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(Error::invalid_parameter(
                "directional.radius",
                self.radius,
                "must be positive",
            ));
        }
        if !(self.sigma_km.is_finite() && self.sigma_km > 0.0) {
            return Err(Error::invalid_parameter(
                "directional.sigma_km",
                self.sigma_km,
                "must be positive",
            ));
        }
        if let Some(width) = self.angular_width
            && !(width.is_finite() && width > 0.0)
        {
            return Err(Error::invalid_parameter(
                "directional.angular_width",
                width,
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Angular width of one sector in degrees
    pub fn sector_width(&self) -> f64 {
        360.0 / self.sectors as f64
    }

    /// Centre bearing of sector `k`
    pub fn sector_centre(&self, k: usize) -> f64 {
        k as f64 * self.sector_width()
    }

    /// Sector holding `bearing`; sector 0 wraps across east
    pub fn sector_of(&self, bearing: f64) -> usize {
        let width = self.sector_width();
        let k = ((bearing + 0.5 * width).rem_euclid(360.0) / width) as usize;
        k % self.sectors
    }

    /// Gaussian weight of a sample `distance` metres away
    pub fn distance_weight(&self, distance: f64) -> f64 {
        let d = distance / 1000.0 / self.sigma_km;
        (-0.5 * d * d).exp()
    }

    /// Weight of a sample at `bearing` within sector `k`
    pub fn angular_weight(&self, bearing: f64, k: usize) -> f64 {
        match self.angular_width {
            None => 1.0,
            Some(width) => {
                let off = (bearing - self.sector_centre(k) + 540.0).rem_euclid(360.0) - 180.0;
                let a = off / width;
                (-0.5 * a * a).exp()
            }
        }
    }
}

/// Bearing of an `(east, north)` offset in degrees counter-clockwise from
/// east, in `[0, 360)`
pub fn bearing(east: f64, north: f64) -> f64 {
    north.atan2(east).to_degrees().rem_euclid(360.0)
}

/// Per-sector reductions at one query point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionalResult {
    /// One value per sector, in sector order
    pub values: Vec<f64>,
    /// Samples that fell in each sector
    pub counts: Vec<usize>,
    /// Reduction over all sectors together
    pub magnitude: f64,
}

impl DirectionalResult {
    /// Result for a point without samples
    pub fn no_data(sectors: usize, nodata: f64) -> Self {
        Self {
            values: vec![nodata; sectors],
            counts: vec![0; sectors],
            magnitude: nodata,
        }
    }

    pub fn sectors(&self) -> usize {
        self.values.len()
    }

    /// Samples gathered for the point
    pub fn total_samples(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Sector values summed as vectors along their centre bearings.
    ///
    /// `None` when the point had no samples.
    pub fn east_north(&self) -> Option<(f64, f64)> {
        if self.total_samples() == 0 {
            return None;
        }
        let width = std::f64::consts::TAU / self.sectors() as f64;
        Some(self.values.iter().enumerate().fold((0.0, 0.0), |(e, n), (k, v)| {
            let theta = k as f64 * width;
            (e + v * theta.cos(), n + v * theta.sin())
        }))
    }
}

/// Per-worker sector buffers
#[derive(Debug, Default)]
pub(crate) struct SectorBuckets {
    buckets: Vec<Vec<Sample>>,
}

impl SectorBuckets {
    fn reset(&mut self, sectors: usize) {
        self.buckets.resize_with(sectors, Vec::new);
        self.buckets.truncate(sectors);
        self.buckets.iter_mut().for_each(Vec::clear);
    }
}

/// What to reduce each sector with
#[derive(Debug, Clone, Copy)]
pub(crate) struct SectorReduction<'a> {
    pub method: InterpolationMethod,
    /// Sample count for N-point methods
    pub limit: Option<usize>,
    pub opts: &'a ReduceOptions,
    pub nodata: f64,
}

impl SectorReduction<'_> {
    fn reduce(&self, samples: &[Sample]) -> Option<f64> {
        let samples = match self.limit {
            Some(n) => &samples[..n.min(samples.len())],
            None => samples,
        };
        reduce(self.method, samples, self.opts)
    }
}

/// Split `samples` (sorted nearest first) into sectors around `p` and
/// reduce each one. Sample weights are overwritten with the directional
/// weights.
pub(crate) fn decompose(
    p: Point,
    samples: &mut [Sample],
    params: &DirectionalParams,
    metric: DistanceMetric,
    how: SectorReduction<'_>,
    buckets: &mut SectorBuckets,
) -> DirectionalResult {
    if samples.is_empty() || how.method == InterpolationMethod::NoMethod {
        return DirectionalResult::no_data(params.sectors, how.nodata);
    }

    buckets.reset(params.sectors);
    for s in samples.iter_mut() {
        let (east, north) = metric.offset(p, Point { x: s.x, y: s.y });
        let b = bearing(east, north);
        let k = params.sector_of(b);
        s.weight = params.distance_weight(s.distance) * params.angular_weight(b, k);
        buckets.buckets[k].push(*s);
    }

    let nearest = samples[0].value;
    let values = buckets
        .buckets
        .iter()
        .map(|bucket| how.reduce(bucket).unwrap_or(nearest))
        .collect();
    let counts = buckets.buckets.iter().map(Vec::len).collect();

    DirectionalResult {
        values,
        counts,
        magnitude: how.reduce(samples).unwrap_or(nearest),
    }
}
