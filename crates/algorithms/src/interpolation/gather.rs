//! Collecting raster samples around a query point

use super::method::ThresholdPolicy;
use super::reduce::Sample;
use coastmesh_core::{
    DistanceMetric, Extent, KdTree, LookupTable, PixelSample, Point, RasterSampler, Result,
    SamplePoint,
};
use std::f64::consts::PI;
use tracing::debug;

/// Expansion steps before an N-point search gives up on reaching the
/// raster edge
const MAX_DOUBLINGS: usize = 64;

/// Valid pixels of one raster region in a kd-tree
#[derive(Debug)]
pub(crate) struct PixelIndex {
    region: Extent,
    tree: Option<KdTree>,
}

impl PixelIndex {
    pub fn build(raster: &dyn RasterSampler, region: Extent) -> Result<Self> {
        let mut pixels = Vec::new();
        if region.is_valid() {
            raster.values_in_window(&region, &mut pixels)?;
        }
        let points: Vec<SamplePoint> = pixels
            .into_iter()
            .filter(|p| p.valid)
            .map(|p| SamplePoint::new(p.x, p.y, p.value))
            .collect();

        debug!(pixels = points.len(), ?region, "pixel index built");
        let tree = if points.is_empty() {
            None
        } else {
            Some(KdTree::build(points)?)
        };
        Ok(Self { region, tree })
    }

    pub fn region(&self) -> &Extent {
        &self.region
    }

    pub fn len(&self) -> usize {
        self.tree.as_ref().map_or(0, KdTree::len)
    }
}

/// Lookup, scaling and threshold applied to each raw pixel value
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValueTransform<'a> {
    pub lookup: Option<&'a LookupTable>,
    pub multiplier: f64,
    pub shift: f64,
    pub threshold: ThresholdPolicy,
}

impl ValueTransform<'_> {
    #[inline]
    pub fn apply(&self, raw: f64) -> Option<f64> {
        let value = match self.lookup {
            Some(table) => table.resolve(raw),
            None => raw,
        };
        let value = value * self.multiplier + self.shift;
        self.threshold.keeps(value).then_some(value)
    }
}

/// Per-worker buffers reused across query points
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    pixels: Vec<PixelSample>,
    points: Vec<SamplePoint>,
    pub samples: Vec<Sample>,
}

/// Order samples nearest first; ties by `y` descending then `x` ascending
pub(crate) fn sort_samples(samples: &mut [Sample]) {
    samples.sort_unstable_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| b.y.total_cmp(&a.y))
            .then_with(|| a.x.total_cmp(&b.x))
    });
}

/// Reads eligible samples from the pixel index when it covers a search and
/// from the raster otherwise.
pub(crate) struct Gatherer<'a> {
    pub raster: &'a dyn RasterSampler,
    pub index: Option<&'a PixelIndex>,
    pub values: ValueTransform<'a>,
    pub metric: DistanceMetric,
}

impl Gatherer<'_> {
    /// Raster cell size in metric units at `p`
    pub fn cell_size_at(&self, p: Point) -> f64 {
        self.metric.cell_size_at(p, self.raster.native_cell_size())
    }

    fn candidates(
        &self,
        area: &Extent,
        pixels: &mut Vec<PixelSample>,
        out: &mut Vec<SamplePoint>,
    ) -> Result<()> {
        out.clear();
        if let Some(index) = self.index
            && index.region.covers(area)
        {
            if let Some(tree) = &index.tree {
                tree.within_box(area, out);
            }
            return Ok(());
        }

        pixels.clear();
        self.raster.values_in_window(area, pixels)?;
        out.extend(
            pixels
                .iter()
                .filter(|p| p.valid)
                .map(|p| SamplePoint::new(p.x, p.y, p.value)),
        );
        Ok(())
    }

    /// Fill `scratch.samples` with the eligible samples within `radius`
    /// (inclusive) of `p`, sorted nearest first.
    pub fn within_radius(&self, p: Point, radius: f64, scratch: &mut Scratch) -> Result<()> {
        let Scratch {
            pixels,
            points,
            samples,
        } = scratch;
        samples.clear();
        if radius.is_nan() || radius < 0.0 {
            return Ok(());
        }

        let (hx, hy) = self.metric.search_half_widths(p, radius);
        self.candidates(&Extent::around(p.x, p.y, hx, hy), pixels, points)?;

        for q in points.iter() {
            let distance = self.metric.distance(p, Point { x: q.x, y: q.y });
            if distance > radius {
                continue;
            }
            if let Some(value) = self.values.apply(q.value) {
                samples.push(Sample::new(q.x, q.y, distance, value));
            }
        }
        sort_samples(samples);
        Ok(())
    }

    /// Fill `scratch.samples` with the `n` nearest eligible samples.
    ///
    /// The search radius starts at `cell · max(1, √(n/π))` and doubles
    /// until `n` samples are found or the search covers the raster, so
    /// fewer than `n` are returned only when the raster runs out.
    pub fn nearest_n(&self, p: Point, n: usize, scratch: &mut Scratch) -> Result<()> {
        let n = n.max(1);
        let extent = self.raster.extent();
        let mut radius = self.cell_size_at(p) * (n as f64 / PI).sqrt().max(1.0);

        for _ in 0..MAX_DOUBLINGS {
            self.within_radius(p, radius, scratch)?;
            if scratch.samples.len() >= n {
                break;
            }
            let (hx, hy) = self.metric.search_half_widths(p, radius);
            if Extent::around(p.x, p.y, hx, hy).covers(&extent) {
                break;
            }
            radius *= 2.0;
        }
        scratch.samples.truncate(n);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use coastmesh_core::{GeoTransform, Raster};

    /// 10x10 raster of unit cells over [0, 10]², value = row * 10 + col
    fn ramp() -> Raster<f32> {
        let data: Vec<f32> = (0..100).map(|v| v as f32).collect();
        let mut r = Raster::from_vec(data, 10, 10).unwrap();
        r.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        r
    }

    fn identity() -> ValueTransform<'static> {
        ValueTransform {
            lookup: None,
            multiplier: 1.0,
            shift: 0.0,
            threshold: ThresholdPolicy::None,
        }
    }

    fn gatherer<'a>(raster: &'a Raster<f32>, index: Option<&'a PixelIndex>) -> Gatherer<'a> {
        Gatherer {
            raster,
            index,
            values: identity(),
            metric: DistanceMetric::Cartesian,
        }
    }

    #[test]
    fn test_within_radius_sorted_and_inclusive() {
        let raster = ramp();
        let g = gatherer(&raster, None);
        let mut scratch = Scratch::default();

        // centre of cell (row 4, col 4) is (4.5, 5.5)
        g.within_radius(Point { x: 4.5, y: 5.5 }, 1.0, &mut scratch).unwrap();
        let values: Vec<f64> = scratch.samples.iter().map(|s| s.value).collect();
        // self, then north, west, east, south
        assert_eq!(values, vec![44.0, 34.0, 43.0, 45.0, 54.0]);
    }

    #[test]
    fn test_index_and_raster_paths_agree() {
        let raster = ramp();
        let index = PixelIndex::build(&raster, Extent::new(2.0, 2.0, 8.0, 8.0)).unwrap();
        // every cell touching the region: columns and rows 2..=8
        assert_eq!(index.len(), 49);

        let direct = gatherer(&raster, None);
        let indexed = gatherer(&raster, Some(&index));
        let mut a = Scratch::default();
        let mut b = Scratch::default();

        // inside the index region, then leaving it
        for (p, r) in [(Point { x: 5.0, y: 5.0 }, 1.6), (Point { x: 5.0, y: 5.0 }, 4.0)] {
            direct.within_radius(p, r, &mut a).unwrap();
            indexed.within_radius(p, r, &mut b).unwrap();
            assert_eq!(a.samples, b.samples);
        }
    }

    #[test]
    fn test_value_transform_pipeline() {
        let raster = ramp();
        let table = LookupTable::from_pairs([(44, 1.0), (45, 2.0)], 0.0);
        let mut g = gatherer(&raster, None);
        g.values = ValueTransform {
            lookup: Some(&table),
            multiplier: 10.0,
            shift: 1.0,
            threshold: ThresholdPolicy::Below(5.0),
        };
        let mut scratch = Scratch::default();
        g.within_radius(Point { x: 4.5, y: 5.5 }, 1.0, &mut scratch).unwrap();
        let values: Vec<f64> = scratch.samples.iter().map(|s| s.value).collect();
        // unmatched codes become 0 · 10 + 1 = 1 and fall below 5
        assert_eq!(values, vec![11.0, 21.0]);
    }

    #[test]
    fn test_zero_radius_without_coincident_pixel() {
        let raster = ramp();
        let g = gatherer(&raster, None);
        let mut scratch = Scratch::default();
        g.within_radius(Point { x: 4.2, y: 5.3 }, 0.0, &mut scratch).unwrap();
        assert!(scratch.samples.is_empty());

        g.within_radius(Point { x: 4.5, y: 5.5 }, 0.0, &mut scratch).unwrap();
        assert_eq!(scratch.samples.len(), 1);
    }

    #[test]
    fn test_nearest_n_exact_count() {
        let raster = ramp();
        let g = gatherer(&raster, None);
        let mut scratch = Scratch::default();
        for n in [1, 4, 9, 30] {
            g.nearest_n(Point { x: 5.1, y: 5.2 }, n, &mut scratch).unwrap();
            assert_eq!(scratch.samples.len(), n);
            assert!(scratch.samples.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
        assert_relative_eq!(scratch.samples[0].x, 5.5);
        assert_relative_eq!(scratch.samples[0].y, 5.5);
    }

    #[test]
    fn test_nearest_n_exhausts_raster() {
        let raster = ramp();
        let g = gatherer(&raster, None);
        let mut scratch = Scratch::default();
        g.nearest_n(Point { x: 5.0, y: 5.0 }, 500, &mut scratch).unwrap();
        assert_eq!(scratch.samples.len(), 100);

        // far outside, the search still reaches the raster
        g.nearest_n(Point { x: -50.0, y: 5.0 }, 1, &mut scratch).unwrap();
        assert_eq!(scratch.samples.len(), 1);
    }
}
