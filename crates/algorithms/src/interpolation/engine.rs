//! Raster-to-point interpolation runs
//!
//! A [`Griddata`] holds the query points and the run configuration.
//! [`Griddata::prepare`] validates everything that can fail before any
//! per-point work starts and returns a [`PreparedRun`]; the run then
//! computes every point independently, in parallel, returning results in
//! query order. A point without eligible samples gets the no-data value
//! instead of failing the run.

use super::directional::{
    DirectionalParams, DirectionalResult, SectorBuckets, SectorReduction, decompose,
};
use super::gather::{Gatherer, PixelIndex, Scratch, ValueTransform};
use super::method::{InterpolationMethod, PointValues, ThresholdPolicy};
use super::radius::{RadiusPolicy, Resolved};
use super::reduce::{ReduceOptions, reduce};
use coastmesh_core::{
    CRS, CoordinateTransform, DistanceMetric, Error, Extent, LookupTable, MeshTopology, Point,
    RasterHandle, RasterMode, Result,
};
use coastmesh_parallel::{ParallelStrategy, ProcessingMode};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Value written for points without a result
pub const DEFAULT_NODATA: f64 = -9999.0;

/// Configuration of an interpolation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GriddataParams {
    /// Output for points without eligible samples
    pub nodata: f64,
    /// Factor applied to every sampled (or looked-up) value
    pub multiplier: f64,
    /// Offset added after the multiplier
    pub datum_shift: f64,
    pub methods: PointValues<InterpolationMethod>,
    /// Radius multiplier, or sample count for N-point methods
    pub filters: PointValues<f64>,
    pub threshold: ThresholdPolicy,
    /// Value of category codes missing from a lookup table read by
    /// [`Griddata::read_lookup_table`]
    pub lookup_default: f64,
    pub reduce: ReduceOptions,
    pub radius: RadiusPolicy,
    pub directional: DirectionalParams,
    pub raster_mode: RasterMode,
    pub processing: ProcessingMode,
}

impl Default for GriddataParams {
    fn default() -> Self {
        Self {
            nodata: DEFAULT_NODATA,
            multiplier: 1.0,
            datum_shift: 0.0,
            methods: PointValues::Uniform(InterpolationMethod::Average),
            filters: PointValues::Uniform(1.0),
            threshold: ThresholdPolicy::None,
            lookup_default: 0.0,
            reduce: ReduceOptions::default(),
            radius: RadiusPolicy::default(),
            directional: DirectionalParams::default(),
            raster_mode: RasterMode::InMemory,
            processing: ProcessingMode::Parallel,
        }
    }
}

fn finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid_parameter(name, value, "must be finite"))
    }
}

impl GriddataParams {
    /// Check every setting against a run over `points` query points
    pub fn validate(&self, points: usize) -> Result<()> {
        finite("multiplier", self.multiplier)?;
        finite("datum_shift", self.datum_shift)?;
        finite("lookup_default", self.lookup_default)?;
        self.methods.validate("methods", points)?;
        self.filters.validate("filters", points)?;
        for filter in self.filters.distinct() {
            if !(filter.is_finite() && filter >= 0.0) {
                return Err(Error::invalid_parameter(
                    "filters",
                    filter,
                    "filter sizes must be finite and non-negative",
                ));
            }
        }
        self.threshold.validate()?;
        if !(self.reduce.idw_power.is_finite() && self.reduce.idw_power >= 0.0) {
            return Err(Error::invalid_parameter(
                "idw_power",
                self.reduce.idw_power,
                "must be finite and non-negative",
            ));
        }
        if !(self.reduce.std_multiplier.is_finite() && self.reduce.std_multiplier >= 0.0) {
            return Err(Error::invalid_parameter(
                "std_multiplier",
                self.reduce.std_multiplier,
                "must be finite and non-negative",
            ));
        }
        self.radius.validate()?;
        self.directional.validate()
    }
}

/// Sample count requested by an N-point filter size
fn point_count(filter: f64) -> usize {
    (filter.round() as usize).max(1)
}

type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Query points, their local resolutions and everything needed to sample a
/// raster at them.
pub struct Griddata {
    points: Vec<Point>,
    resolutions: Vec<f64>,
    query_crs: Option<CRS>,
    transform: Option<Box<dyn CoordinateTransform>>,
    raster: Option<RasterHandle>,
    lookup: Option<LookupTable>,
    params: GriddataParams,
    progress: Option<Box<ProgressFn>>,
    index: Mutex<Option<Arc<PixelIndex>>>,
}

impl fmt::Debug for Griddata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Griddata")
            .field("points", &self.points.len())
            .field("query_crs", &self.query_crs)
            .field("transform", &self.transform.is_some())
            .field("raster", &self.raster)
            .field("lookup", &self.lookup.as_ref().map(LookupTable::len))
            .field("params", &self.params)
            .finish()
    }
}

impl Griddata {
    /// Query points with the local mesh resolution at each
    pub fn new(points: Vec<Point>, resolutions: Vec<f64>) -> Result<Self> {
        if points.len() != resolutions.len() {
            return Err(Error::invalid_parameter(
                "resolutions",
                resolutions.len(),
                format!("expected one resolution per query point ({})", points.len()),
            ));
        }
        Ok(Self {
            points,
            resolutions,
            query_crs: None,
            transform: None,
            raster: None,
            lookup: None,
            params: GriddataParams::default(),
            progress: None,
            index: Mutex::new(None),
        })
    }

    /// One query point per mesh node, resolved at the node's mean edge length
    pub fn from_mesh<M: MeshTopology + ?Sized>(mesh: &M) -> Result<Self> {
        let n = mesh.node_count();
        let mut points = Vec::with_capacity(n);
        let mut resolutions = Vec::with_capacity(n);
        for node in 0..n {
            points.push(mesh.node_coordinate(node)?);
            resolutions.push(mesh.local_edge_length(node)?);
        }
        let mut grid = Self::new(points, resolutions)?;
        grid.query_crs = mesh.crs().cloned();
        Ok(grid)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn resolutions(&self) -> &[f64] {
        &self.resolutions
    }

    pub fn params(&self) -> &GriddataParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut GriddataParams {
        &mut self.params
    }

    pub fn set_params(&mut self, params: GriddataParams) {
        self.params = params;
    }

    pub fn set_methods(&mut self, methods: impl Into<PointValues<InterpolationMethod>>) {
        self.params.methods = methods.into();
    }

    pub fn set_filters(&mut self, filters: impl Into<PointValues<f64>>) {
        self.params.filters = filters.into();
    }

    pub fn raster(&self) -> Option<&RasterHandle> {
        self.raster.as_ref()
    }

    /// Replace the raster; any cached pixel index is dropped
    pub fn set_raster(&mut self, raster: RasterHandle) {
        self.raster = Some(raster);
        *self.index.get_mut().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Open a GeoTIFF in the configured [`RasterMode`]
    pub fn open_raster(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let handle = RasterHandle::open(path, self.params.raster_mode)?;
        self.set_raster(handle);
        Ok(())
    }

    pub fn lookup_table(&self) -> Option<&LookupTable> {
        self.lookup.as_ref()
    }

    pub fn set_lookup_table(&mut self, table: LookupTable) {
        self.lookup = Some(table);
    }

    /// Read a lookup table; missing codes resolve to `params.lookup_default`
    pub fn read_lookup_table(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.lookup = Some(LookupTable::read(path, self.params.lookup_default)?);
        Ok(())
    }

    pub fn query_crs(&self) -> Option<&CRS> {
        self.query_crs.as_ref()
    }

    pub fn set_query_crs(&mut self, crs: Option<CRS>) {
        self.query_crs = crs;
    }

    /// Map query coordinates into the raster's coordinate system.
    ///
    /// Points the transform rejects receive the no-data value.
    pub fn set_transform(&mut self, transform: impl CoordinateTransform + 'static) {
        self.transform = Some(Box::new(transform));
    }

    /// Called with `(done, total)` after each point
    pub fn set_progress(&mut self, progress: impl Fn(usize, usize) + Send + Sync + 'static) {
        self.progress = Some(Box::new(progress));
    }

    pub fn clear_progress(&mut self) {
        self.progress = None;
    }

    /// Validate the configuration for a run, lookup-table variant when
    /// `use_lookup` is set.
    pub fn prepare(&self, use_lookup: bool) -> Result<PreparedRun<'_>> {
        let raster = self.raster.as_ref().ok_or_else(|| {
            Error::invalid_parameter("raster", "none", "no raster has been set")
        })?;
        self.params.validate(self.points.len())?;

        let lookup = match (use_lookup, &self.lookup) {
            (false, _) => None,
            (true, Some(table)) => Some(table),
            (true, None) => return Err(Error::MissingLookupTable),
        };

        let cell = raster.cell_size();
        if !(cell.is_finite() && cell > 0.0) {
            return Err(Error::invalid_parameter(
                "cell_size",
                cell,
                "raster cell size must be positive",
            ));
        }

        let metric = self.check_crs(raster)?;
        let points = self.raster_points();

        debug!(
            points = points.len(),
            cell,
            ?metric,
            lookup = lookup.is_some(),
            mode = ?raster.mode(),
            "run validated"
        );

        Ok(PreparedRun {
            grid: self,
            raster,
            lookup,
            points,
            metric,
        })
    }

    /// Interpolated value at every query point, in query order
    pub fn compute_values(&self, use_lookup: bool) -> Result<Vec<f64>> {
        self.prepare(use_lookup)?.compute_values()
    }

    /// Per-sector values at every query point, in query order
    pub fn compute_directional(&self, use_lookup: bool) -> Result<Vec<DirectionalResult>> {
        self.prepare(use_lookup)?.compute_directional()
    }

    fn check_crs(&self, raster: &RasterHandle) -> Result<DistanceMetric> {
        match (&self.query_crs, raster.crs()) {
            (Some(query), Some(r)) if !query.is_equivalent(r) && self.transform.is_none() => {
                Err(Error::CrsMismatch {
                    raster: r.identifier(),
                    query: query.identifier(),
                })
            }
            (_, Some(r)) => Ok(r.metric()),
            (Some(query), None) if self.transform.is_none() => {
                warn!(crs = %query, "raster has no coordinate system, assuming the query's");
                Ok(query.metric())
            }
            _ => {
                if self.transform.is_none() {
                    warn!("no coordinate systems given, assuming planar coordinates");
                }
                Ok(DistanceMetric::Cartesian)
            }
        }
    }

    fn raster_points(&self) -> Vec<Option<Point>> {
        let Some(transform) = &self.transform else {
            return self.points.iter().copied().map(Some).collect();
        };
        self.points
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let out = transform.apply(p);
                if out.is_none() {
                    warn!(point = i, x = p.x, y = p.y, "coordinate transform failed");
                }
                out
            })
            .collect()
    }
}

/// A validated run, ready to compute
#[derive(Debug)]
pub struct PreparedRun<'a> {
    grid: &'a Griddata,
    raster: &'a RasterHandle,
    lookup: Option<&'a LookupTable>,
    /// Query points in raster coordinates; `None` where the transform failed
    points: Vec<Option<Point>>,
    metric: DistanceMetric,
}

impl PreparedRun<'_> {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Interpolated value at every query point, in query order
    pub fn compute_values(&self) -> Result<Vec<f64>> {
        let params = &self.grid.params;
        let index = self.pixel_index(false)?;
        let gatherer = self.gatherer(index.as_deref());
        let total = self.points.len();
        let done = AtomicUsize::new(0);

        info!(points = total, methods = ?params.methods.distinct(), "interpolation started");
        let start = Instant::now();

        let results = params.processing.par_map_init(0..total, Scratch::default, |scratch, i| {
            let value = self.point_value(&gatherer, i, scratch);
            self.tick(&done, total);
            value
        });
        let mut failed = 0usize;
        let values: Vec<f64> = results
            .into_iter()
            .enumerate()
            .map(|(i, r)| match r {
                Ok(v) => v.unwrap_or(params.nodata),
                Err(e) => {
                    warn!(point = i, error = %e, "sampling failed, writing no-data");
                    failed += 1;
                    params.nodata
                }
            })
            .collect();

        let missing = values.iter().filter(|v| **v == params.nodata).count();
        info!(
            points = total,
            missing,
            failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "interpolation complete"
        );
        Ok(values)
    }

    /// Per-sector values at every query point, in query order
    pub fn compute_directional(&self) -> Result<Vec<DirectionalResult>> {
        let params = &self.grid.params;
        let index = self.pixel_index(true)?;
        let gatherer = self.gatherer(index.as_deref());
        let total = self.points.len();
        let done = AtomicUsize::new(0);

        info!(
            points = total,
            sectors = params.directional.sectors,
            radius = params.directional.radius,
            "directional interpolation started"
        );
        let start = Instant::now();

        let results = params.processing.par_map_init(
            0..total,
            || (Scratch::default(), SectorBuckets::default()),
            |state: &mut (Scratch, SectorBuckets), i| {
                let (scratch, buckets) = state;
                let result = self.point_directional(&gatherer, i, scratch, buckets);
                self.tick(&done, total);
                result
            },
        );
        let mut failed = 0usize;
        let results: Vec<DirectionalResult> = results
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                r.unwrap_or_else(|e| {
                    warn!(point = i, error = %e, "sampling failed, writing no-data");
                    failed += 1;
                    DirectionalResult::no_data(params.directional.sectors, params.nodata)
                })
            })
            .collect();

        info!(
            points = total,
            failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "directional interpolation complete"
        );
        Ok(results)
    }

    fn tick(&self, done: &AtomicUsize, total: usize) {
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(progress) = &self.grid.progress {
            progress(n, total);
        }
    }

    fn gatherer<'b>(&'b self, index: Option<&'b PixelIndex>) -> Gatherer<'b> {
        let params = &self.grid.params;
        Gatherer {
            raster: self.raster.sampler(),
            index,
            values: ValueTransform {
                lookup: self.lookup,
                multiplier: params.multiplier,
                shift: params.datum_shift,
                threshold: params.threshold,
            },
            metric: self.metric,
        }
    }

    fn point_value(
        &self,
        g: &Gatherer<'_>,
        i: usize,
        scratch: &mut Scratch,
    ) -> Result<Option<f64>> {
        let Some(p) = self.points[i] else {
            return Ok(None);
        };
        let params = &self.grid.params;
        let method = params.methods.get(i);
        let filter = params.filters.get(i);
        let h = self.grid.resolutions[i];

        match method {
            InterpolationMethod::NoMethod => return Ok(None),
            m if m.is_point_count() => g.nearest_n(p, point_count(filter), scratch)?,
            InterpolationMethod::BilskieAveraging => {
                let initial = params.radius.initial_radius(h, filter);
                let cell = g.cell_size_at(p);
                let resolved = params.radius.resolve(initial, cell, |r| {
                    g.within_radius(p, r, scratch)?;
                    Ok(scratch.samples.len())
                })?;
                if resolved == Resolved::Nearest {
                    g.nearest_n(p, 1, scratch)?;
                }
            }
            _ => g.within_radius(p, h * filter, scratch)?,
        }

        Ok(reduce(method, &scratch.samples, &params.reduce))
    }

    fn point_directional(
        &self,
        g: &Gatherer<'_>,
        i: usize,
        scratch: &mut Scratch,
        buckets: &mut SectorBuckets,
    ) -> Result<DirectionalResult> {
        let params = &self.grid.params;
        let dir = &params.directional;
        let method = params.methods.get(i);
        let Some(p) = self.points[i] else {
            return Ok(DirectionalResult::no_data(dir.sectors, params.nodata));
        };
        if method == InterpolationMethod::NoMethod {
            return Ok(DirectionalResult::no_data(dir.sectors, params.nodata));
        }

        g.within_radius(p, dir.radius, scratch)?;
        let how = SectorReduction {
            method,
            limit: method
                .is_point_count()
                .then(|| point_count(params.filters.get(i))),
            opts: &params.reduce,
            nodata: params.nodata,
        };
        Ok(decompose(p, &mut scratch.samples, dir, self.metric, how, buckets))
    }

    /// Widest fixed search radius used at point `i`, if any
    fn search_bound(&self, i: usize, p: Point, directional: bool) -> Option<f64> {
        let params = &self.grid.params;
        let method = params.methods.get(i);
        if method == InterpolationMethod::NoMethod {
            return None;
        }
        if directional {
            return Some(params.directional.radius);
        }
        let filter = params.filters.get(i);
        let h = self.grid.resolutions[i];
        let r = match method {
            m if m.is_point_count() => {
                let n = point_count(filter) as f64;
                self.metric.cell_size_at(p, self.raster.cell_size()) * (n / PI).sqrt().max(1.0)
            }
            InterpolationMethod::BilskieAveraging => params
                .radius
                .max_radius(params.radius.initial_radius(h, filter)),
            _ => h * filter,
        };
        (r.is_finite() && r >= 0.0).then_some(r)
    }

    /// Pixel index for in-memory runs, reused while it covers every search
    fn pixel_index(&self, directional: bool) -> Result<Option<Arc<PixelIndex>>> {
        if !self.raster.mode().is_in_memory() {
            return Ok(None);
        }

        let corners = self.points.iter().enumerate().flat_map(|(i, &p)| {
            let boxed = p.and_then(|p| {
                let r = self.search_bound(i, p, directional)?;
                let (hx, hy) = self.metric.search_half_widths(p, r);
                Some(Extent::around(p.x, p.y, hx, hy))
            });
            boxed
                .into_iter()
                .flat_map(|e| [(e.xmin, e.ymin), (e.xmax, e.ymax)])
        });
        let region = Extent::enclosing(corners);
        if !region.is_valid() {
            return Ok(None);
        }

        let mut cached = self
            .grid
            .index
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = cached.as_ref()
            && index.region().covers(&region)
        {
            debug!(pixels = index.len(), "reusing pixel index");
            return Ok(Some(Arc::clone(index)));
        }

        let index = Arc::new(PixelIndex::build(self.raster.sampler(), region)?);
        *cached = Some(Arc::clone(&index));
        Ok(Some(index))
    }
}
