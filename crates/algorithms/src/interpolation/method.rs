//! Interpolation method selection, threshold filtering and per-point options

use coastmesh_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the samples around a query point are reduced to one value.
///
/// Integer codes match the flags used in mesh attribute files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InterpolationMethod {
    /// Skip the point; it receives the no-data value
    NoMethod,
    /// Mean of the samples within the search radius
    #[default]
    Average,
    /// Value of the closest sample
    Nearest,
    /// Largest sample within the search radius
    Highest,
    /// Mean of the samples lying outside `k` standard deviations
    OutsideStandardDeviation,
    /// Mean over an adaptive radius derived from mesh and raster resolution
    BilskieAveraging,
    /// Inverse-distance weighted mean over the search radius
    InverseDistanceWeighted,
    /// Inverse-distance weighted mean of the nearest N samples
    InverseDistanceWeightedNPoints,
    /// Mean of the nearest N samples
    AverageNearestN,
}

impl InterpolationMethod {
    pub const ALL: [InterpolationMethod; 9] = [
        InterpolationMethod::NoMethod,
        InterpolationMethod::Average,
        InterpolationMethod::Nearest,
        InterpolationMethod::Highest,
        InterpolationMethod::OutsideStandardDeviation,
        InterpolationMethod::BilskieAveraging,
        InterpolationMethod::InverseDistanceWeighted,
        InterpolationMethod::InverseDistanceWeightedNPoints,
        InterpolationMethod::AverageNearestN,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code).ok().and_then(|c| Self::ALL.get(c).copied())
    }

    pub fn code(self) -> u8 {
        match self {
            InterpolationMethod::NoMethod => 0,
            InterpolationMethod::Average => 1,
            InterpolationMethod::Nearest => 2,
            InterpolationMethod::Highest => 3,
            InterpolationMethod::OutsideStandardDeviation => 4,
            InterpolationMethod::BilskieAveraging => 5,
            InterpolationMethod::InverseDistanceWeighted => 6,
            InterpolationMethod::InverseDistanceWeightedNPoints => 7,
            InterpolationMethod::AverageNearestN => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InterpolationMethod::NoMethod => "none",
            InterpolationMethod::Average => "average",
            InterpolationMethod::Nearest => "nearest",
            InterpolationMethod::Highest => "highest",
            InterpolationMethod::OutsideStandardDeviation => "outside-std",
            InterpolationMethod::BilskieAveraging => "bilskie",
            InterpolationMethod::InverseDistanceWeighted => "idw",
            InterpolationMethod::InverseDistanceWeightedNPoints => "idw-n",
            InterpolationMethod::AverageNearestN => "average-n",
        }
    }

    /// Methods that reduce a fixed number of nearest samples, where the
    /// filter size is the sample count rather than a radius multiplier.
    pub fn is_point_count(self) -> bool {
        matches!(
            self,
            InterpolationMethod::InverseDistanceWeightedNPoints
                | InterpolationMethod::AverageNearestN
        )
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterpolationMethod {
    type Err = Error;

    /// Accepts the integer code or a name (case and `_`/`-` insensitive)
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return Self::from_code(code).ok_or_else(|| {
                Error::invalid_parameter("method", code, "method codes are 0 through 8")
            });
        }
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        Ok(match key.as_str() {
            "none" | "nomethod" => InterpolationMethod::NoMethod,
            "average" | "mean" => InterpolationMethod::Average,
            "nearest" => InterpolationMethod::Nearest,
            "highest" | "max" => InterpolationMethod::Highest,
            "outsidestd" | "outsidestandarddeviation" => {
                InterpolationMethod::OutsideStandardDeviation
            }
            "bilskie" | "bilskieaveraging" => InterpolationMethod::BilskieAveraging,
            "idw" | "inversedistanceweighted" => InterpolationMethod::InverseDistanceWeighted,
            "idwn" | "inversedistanceweightednpoints" => {
                InterpolationMethod::InverseDistanceWeightedNPoints
            }
            "averagen" | "averagenearestn" => InterpolationMethod::AverageNearestN,
            _ => {
                return Err(Error::invalid_parameter(
                    "method",
                    s,
                    "unknown interpolation method",
                ));
            }
        })
    }
}

/// Exclusion applied to sample values before reduction
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ThresholdPolicy {
    /// Every valid sample is kept
    #[default]
    None,
    /// Samples greater than the threshold are dropped
    Above(f64),
    /// Samples less than the threshold are dropped
    Below(f64),
}

impl ThresholdPolicy {
    #[inline]
    pub fn keeps(&self, value: f64) -> bool {
        match *self {
            ThresholdPolicy::None => true,
            ThresholdPolicy::Above(t) => value <= t,
            ThresholdPolicy::Below(t) => value >= t,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            ThresholdPolicy::Above(t) | ThresholdPolicy::Below(t) if !t.is_finite() => Err(
                Error::invalid_parameter("threshold", t, "threshold value must be finite"),
            ),
            _ => Ok(()),
        }
    }
}

/// A setting given once for every query point or once per point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointValues<T> {
    Uniform(T),
    PerPoint(Vec<T>),
}

impl<T: Copy> PointValues<T> {
    /// Value for query point `index`
    #[inline]
    pub fn get(&self, index: usize) -> T {
        match self {
            PointValues::Uniform(v) => *v,
            PointValues::PerPoint(values) => values[index],
        }
    }

    /// Check a per-point vector against the number of query points
    pub fn validate(&self, name: &'static str, points: usize) -> Result<()> {
        match self {
            PointValues::PerPoint(values) if values.len() != points => Err(
                Error::invalid_parameter(
                    name,
                    values.len(),
                    format!("expected one value per query point ({points})"),
                ),
            ),
            _ => Ok(()),
        }
    }

    /// Every distinct value, in first-seen order
    pub fn distinct(&self) -> Vec<T>
    where
        T: PartialEq,
    {
        match self {
            PointValues::Uniform(v) => vec![*v],
            PointValues::PerPoint(values) => {
                let mut seen = Vec::new();
                for v in values {
                    if !seen.contains(v) {
                        seen.push(*v);
                    }
                }
                seen
            }
        }
    }
}

impl<T: Default> Default for PointValues<T> {
    fn default() -> Self {
        PointValues::Uniform(T::default())
    }
}

impl<T> From<T> for PointValues<T> {
    fn from(value: T) -> Self {
        PointValues::Uniform(value)
    }
}

impl<T> From<Vec<T>> for PointValues<T> {
    fn from(values: Vec<T>) -> Self {
        PointValues::PerPoint(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for (i, method) in InterpolationMethod::ALL.iter().enumerate() {
            assert_eq!(method.code() as usize, i);
            assert_eq!(InterpolationMethod::from_code(i as i64), Some(*method));
        }
        assert_eq!(InterpolationMethod::from_code(9), None);
        assert_eq!(InterpolationMethod::from_code(-1), None);
    }

    #[test]
    fn test_parse_names_and_codes() {
        assert_eq!(
            "5".parse::<InterpolationMethod>().unwrap(),
            InterpolationMethod::BilskieAveraging
        );
        assert_eq!(
            "IDW_N".parse::<InterpolationMethod>().unwrap(),
            InterpolationMethod::InverseDistanceWeightedNPoints
        );
        assert_eq!(
            "average-nearest-n".parse::<InterpolationMethod>().unwrap(),
            InterpolationMethod::AverageNearestN
        );
        for method in InterpolationMethod::ALL {
            assert_eq!(method.name().parse::<InterpolationMethod>().unwrap(), method);
        }
        assert!("12".parse::<InterpolationMethod>().is_err());
        assert!("kriging".parse::<InterpolationMethod>().is_err());
    }

    #[test]
    fn test_threshold_keeps() {
        assert!(ThresholdPolicy::None.keeps(f64::MAX));
        assert!(ThresholdPolicy::Above(1.0).keeps(1.0));
        assert!(!ThresholdPolicy::Above(1.0).keeps(1.5));
        assert!(ThresholdPolicy::Below(1.0).keeps(1.0));
        assert!(!ThresholdPolicy::Below(1.0).keeps(0.5));
        assert!(ThresholdPolicy::Below(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_point_values() {
        let uniform: PointValues<f64> = 2.0.into();
        assert_eq!(uniform.get(100), 2.0);
        assert!(uniform.validate("filter", 3).is_ok());

        let per_point: PointValues<f64> = vec![1.0, 2.0, 1.0].into();
        assert_eq!(per_point.get(1), 2.0);
        assert!(per_point.validate("filter", 3).is_ok());
        assert!(per_point.validate("filter", 4).is_err());
        assert_eq!(per_point.distinct(), vec![1.0, 2.0]);
    }
}
