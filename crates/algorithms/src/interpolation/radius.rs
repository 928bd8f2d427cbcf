//! Adaptive search radius for Bilskie averaging
//!
//! The radius starts from the local mesh resolution. When it holds too few
//! eligible samples it grows geometrically up to a ceiling; past that the
//! caller falls back to the nearest sample.

use coastmesh_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Parameters of the adaptive radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusPolicy {
    /// Fraction of the element diameter used as the base radius
    pub scale: f64,
    /// Growth factor applied per expansion step
    pub expansion: f64,
    /// Largest radius, as a multiple of the initial radius
    pub ceiling: f64,
    /// Fraction of the raster cells a radius covers that must hold eligible
    /// samples; at least one sample is always required
    pub min_coverage: f64,
}

impl Default for RadiusPolicy {
    fn default() -> Self {
        Self {
            scale: 0.25,
            expansion: 2.0,
            ceiling: 4.0,
            min_coverage: 0.0,
        }
    }
}

/// Outcome of radius resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved {
    /// Enough samples lie within this radius
    Radius(f64),
    /// Use the single nearest eligible sample
    Nearest,
}

impl RadiusPolicy {
    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::invalid_parameter("radius.scale", self.scale, "must be positive"));
        }
        if !(self.expansion.is_finite() && self.expansion > 1.0) {
            return Err(Error::invalid_parameter(
                "radius.expansion",
                self.expansion,
                "must be greater than 1",
            ));
        }
        if !(self.ceiling.is_finite() && self.ceiling >= 1.0) {
            return Err(Error::invalid_parameter(
                "radius.ceiling",
                self.ceiling,
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_coverage) {
            return Err(Error::invalid_parameter(
                "radius.min_coverage",
                self.min_coverage,
                "must lie in [0, 1]",
            ));
        }
        Ok(())
    }

    /// Starting radius for a node with local mesh size `mesh_size`.
    ///
    /// `2h/√3` is the circumscribed diameter of an equilateral element
    /// with edge `h`.
    pub fn initial_radius(&self, mesh_size: f64, filter: f64) -> f64 {
        self.scale * 2.0 * (2.0 * mesh_size / 3.0_f64.sqrt()) * filter
    }

    /// Largest radius reachable from `initial`
    pub fn max_radius(&self, initial: f64) -> f64 {
        initial * self.ceiling
    }

    /// Samples required inside `radius` for cells of metric size `cell`
    pub fn min_samples(&self, radius: f64, cell: f64) -> usize {
        let cells = PI * radius * radius / (cell * cell);
        ((self.min_coverage * cells).ceil() as usize).max(1)
    }

    /// Grow the radius until `count(radius)` reaches the minimum.
    ///
    /// `count` is called with non-decreasing radii. The radius never passes
    /// the ceiling; an initial radius no larger than one cell resolves to
    /// [`Resolved::Nearest`] without calling `count`.
    pub fn resolve<F>(&self, initial: f64, cell: f64, mut count: F) -> Result<Resolved>
    where
        F: FnMut(f64) -> Result<usize>,
    {
        if initial.is_nan() || initial <= cell {
            return Ok(Resolved::Nearest);
        }
        let max = self.max_radius(initial);
        let mut radius = initial;
        loop {
            if count(radius)? >= self.min_samples(radius, cell) {
                return Ok(Resolved::Radius(radius));
            }
            if radius >= max {
                return Ok(Resolved::Nearest);
            }
            radius = (radius * self.expansion).min(max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_radius() {
        let policy = RadiusPolicy::default();
        let h = 3.0_f64.sqrt();
        // 0.25 * 2 * (2h/√3) = 1 for h = √3
        assert_relative_eq!(policy.initial_radius(h, 1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(policy.initial_radius(h, 2.5), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_small_radius_uses_nearest() {
        let policy = RadiusPolicy::default();
        let mut calls = 0;
        let r = policy
            .resolve(10.0, 10.0, |_| {
                calls += 1;
                Ok(100)
            })
            .unwrap();
        assert_eq!(r, Resolved::Nearest);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_expansion_is_monotonic_and_capped() {
        let policy = RadiusPolicy::default();
        let mut seen = Vec::new();
        let r = policy
            .resolve(15.0, 10.0, |radius| {
                seen.push(radius);
                Ok(0)
            })
            .unwrap();
        assert_eq!(r, Resolved::Nearest);
        assert_eq!(seen, vec![15.0, 30.0, 60.0]);
    }

    #[test]
    fn test_expansion_stops_when_satisfied() {
        let policy = RadiusPolicy::default();
        let r = policy
            .resolve(15.0, 10.0, |radius| Ok(if radius > 20.0 { 3 } else { 0 }))
            .unwrap();
        assert_eq!(r, Resolved::Radius(30.0));
    }

    #[test]
    fn test_min_coverage() {
        let policy = RadiusPolicy {
            min_coverage: 0.5,
            ..Default::default()
        };
        // π·10²/1² ≈ 314.16 cells, half of them
        assert_eq!(policy.min_samples(10.0, 1.0), 158);
        assert_eq!(RadiusPolicy::default().min_samples(10.0, 1.0), 1);
        assert!(policy.validate().is_ok());
        assert!(RadiusPolicy { expansion: 1.0, ..Default::default() }.validate().is_err());
    }
}
