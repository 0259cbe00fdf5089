use std::f64::consts::PI;
use std::ops::{Add, AddAssign};
use rand::distributions::Open01;
use rand::Rng;
use serde::{Deserialize, Serialize};
use crate::config::{DirectionSampling, RmcrtConfig};
use crate::grid::GridHierarchy;
use crate::index_space::{Index3, IndexSpace};
use crate::patch::CellField;
use super::properties::FLOW;
use super::sampling::{self, CellRng, Face};
use super::traversal::RayMarch;




/// Stream numbers at or above this are reserved for boundary flux rays, so
/// they never share a seed with the flux-divergence rays of the same cell.
const FLUX_STREAM_BASE: u64 = 1 << 32;




/**
 * Read-only views of the radiative properties on one level. Each field must
 * cover every cell a ray is allowed to visit on that level, including the
 * wall cells it terminates in.
 */
#[derive(Clone, Copy, Debug)]
pub struct LevelProperties<'a> {
    pub abskg: &'a CellField<f64>,
    pub sigma_t4_over_pi: &'a CellField<f64>,
    pub cell_type: &'a CellField<i32>,
}




/**
 * Everything a ray needs to know about the grid it is traced through: the
 * level geometry, the per-level properties, and the region of each level on
 * which rays may travel before moving to a coarser level.
 */
pub struct TraceContext<'a> {
    grid: &'a GridHierarchy,
    config: &'a RmcrtConfig,
    levels: Vec<Option<LevelProperties<'a>>>,
    regions: Vec<Option<IndexSpace>>,
}




// ============================================================================
impl<'a> TraceContext<'a> {


    /**
     * Create a context with no properties loaded and no regions of interest
     * (rays may travel anywhere on the level they start on).
     */
    pub fn new(grid: &'a GridHierarchy, config: &'a RmcrtConfig) -> Self {
        Self {
            grid,
            config,
            levels: vec![None; grid.num_levels()],
            regions: vec![None; grid.num_levels()],
        }
    }


    pub fn with_level(mut self, level: usize, properties: LevelProperties<'a>) -> Self {
        self.levels[level] = Some(properties);
        self
    }


    /**
     * Set the region of interest on every level. `regions[n] == None`
     * means the whole of level `n`.
     */
    pub fn with_regions(mut self, regions: Vec<Option<IndexSpace>>) -> Self {
        assert_eq!(regions.len(), self.grid.num_levels(), "one region entry is needed per level");
        self.regions = regions;
        self
    }


    pub fn grid(&self) -> &GridHierarchy {
        self.grid
    }


    pub fn config(&self) -> &RmcrtConfig {
        self.config
    }


    pub fn properties(&self, level: usize) -> &LevelProperties<'a> {
        match &self.levels[level] {
            Some(p) => p,
            None => panic!("no radiative properties were loaded for level {}", level),
        }
    }
}




/**
 * Counters accumulated over rays. They are summed across cells and patches
 * and reported in the log.
 */
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RayStats {
    pub rays: u64,
    pub steps: u64,
    pub reflections: u64,
    pub scatters: u64,
    pub truncated: u64,
}

impl Add for RayStats {
    type Output = Self;

    fn add(self, b: Self) -> Self {
        Self {
            rays: self.rays + b.rays,
            steps: self.steps + b.steps,
            reflections: self.reflections + b.reflections,
            scatters: self.scatters + b.scatters,
            truncated: self.truncated + b.truncated,
        }
    }
}

impl AddAssign for RayStats {
    fn add_assign(&mut self, b: Self) {
        *self = *self + b
    }
}




/**
 * The result of tracing one ray: the intensity it gathered (in units of
 * sigmaT4OverPi) and what happened along the way.
 */
#[derive(Clone, Copy, Debug)]
pub struct RayOutcome {
    pub sum_i: f64,
    pub stats: RayStats,
}




/**
 * Integrate the radiative transfer equation backward along one ray.
 *
 * Emission from each homogeneous segment is integrated exactly, as the
 * difference of the transmissivities at its two ends. When the ray steps
 * into a non-flow cell, that cell emits with emissivity `min(abskg, 1)`.
 * If reflections are allowed and the surviving intensity exceeds the
 * threshold, the ray is mirrored back into the domain with its reflectance
 * fraction reduced by the wall's emissivity; otherwise it ends. Optical
 * thickness is never reset, so attenuation along the whole path (over all
 * reflections and scattering events) applies to every later contribution.
 */
pub fn trace_ray<R: Rng + ?Sized>(ctx: &TraceContext, mut march: RayMarch, rng: &mut R) -> RayOutcome {
    let grid = ctx.grid;
    let config = ctx.config;
    let scattering = config.sigma_scat > 0.0;
    let free_path = |rng: &mut R| -rng.sample::<f64, _>(Open01).ln() / config.sigma_scat;

    let mut stats = RayStats { rays: 1, ..RayStats::default() };
    let mut sum_i = 0.0;
    let mut intensity = 1.0;
    let mut fs = 1.0;
    let mut optical_thickness = 0.0;
    let mut exp_ot_prev = 1.0;
    let mut scatter_length = if scattering { free_path(&mut *rng) } else { f64::INFINITY };
    let mut cur_length = 0.0;

    while intensity > config.threshold {
        let wall = loop {
            let segment = march.advance_in(grid, &ctx.regions);
            let prev = ctx.properties(segment.prev_level);

            stats.steps += 1;
            optical_thickness += prev.abskg[segment.prev_cell] * segment.length;
            let exp_ot = (-optical_thickness).exp();
            sum_i += prev.sigma_t4_over_pi[segment.prev_cell] * (exp_ot_prev - exp_ot) * fs;
            exp_ot_prev = exp_ot;

            if march.length() > config.max_ray_length {
                stats.truncated += 1;
                return RayOutcome { sum_i, stats };
            }
            if ctx.properties(segment.level).cell_type[segment.cell] != FLOW {
                break segment;
            }
            if scattering {
                cur_length += segment.length;

                if cur_length > scatter_length {
                    let direction = sampling::isotropic_direction(rng);
                    march.redirect(grid, direction, &segment);
                    scatter_length = free_path(&mut *rng);
                    cur_length = 0.0;
                    stats.scatters += 1;
                }
            }
        };

        let props = ctx.properties(wall.level);
        let emissivity = props.abskg[wall.cell].min(1.0);
        let transmitted = (-optical_thickness).exp();
        sum_i += emissivity * props.sigma_t4_over_pi[wall.cell] * transmitted * fs;

        intensity = if config.allow_reflect { transmitted * fs } else { 0.0 };

        if intensity > config.threshold {
            fs *= 1.0 - emissivity;
            march.reflect(grid, &wall);
            stats.reflections += 1;
        }
    }
    RayOutcome { sum_i, stats }
}




/**
 * The radiative source terms of one cell.
 */
#[derive(Clone, Copy, Debug, Default)]
pub struct CellRadiation {
    pub div_q: f64,
    pub volq: f64,
    pub stats: RayStats,
}




/**
 * Launch `n_div_q_rays` rays from a flow cell and reduce them to the cell's
 * flux divergence and incident radiation:
 *
 * `divQ = -4π abskg (sigmaT4OverPi - sumI / N)`, `volq = 4π sumI / N`.
 *
 * Ray `n` of the cell draws from stream `n`; the Latin hypercube bin
 * permutation draws from stream `N`.
 */
pub fn solve_cell(ctx: &TraceContext, level: usize, cell: Index3) -> CellRadiation {
    let config = ctx.config;
    let n_rays = config.n_div_q_rays;
    let lvl = ctx.grid.level(level);

    let bins = match config.direction_sampling {
        DirectionSampling::Naive => None,
        DirectionSampling::LatinHyperCube => {
            let mut rng = CellRng::new(config.random_seed, cell, n_rays as u64);
            Some(sampling::hyper_cube_bins(&mut rng, n_rays))
        }
    };
    let mut sum_i = 0.0;
    let mut stats = RayStats::default();

    for i_ray in 0..n_rays {
        let mut rng = CellRng::new(config.random_seed, cell, i_ray as u64);
        let direction = match &bins {
            Some(bins) => sampling::hyper_cube_direction(&mut rng, i_ray, bins[i_ray], n_rays),
            None => sampling::isotropic_direction(&mut rng),
        };
        let origin = sampling::ray_origin(&mut rng, lvl, cell, config.cc_rays);
        let outcome = trace_ray(ctx, RayMarch::new(lvl, origin, direction, cell), &mut rng);
        sum_i += outcome.sum_i;
        stats += outcome.stats;
    }

    let props = ctx.properties(level);
    let mean_i = sum_i / n_rays as f64;

    CellRadiation {
        div_q: -4.0 * PI * props.abskg[cell] * (props.sigma_t4_over_pi[cell] - mean_i),
        volq: 4.0 * PI * mean_i,
        stats,
    }
}




/**
 * Return the radiative flux incident on one face of a flow cell, from rays
 * launched over the hemisphere facing into the cell:
 * `q = 2π / N Σ I cosθ`.
 */
pub fn incident_flux(ctx: &TraceContext, level: usize, cell: Index3, face: Face) -> (f64, RayStats) {
    let config = ctx.config;
    let n_rays = config.n_flux_rays;
    let lvl = ctx.grid.level(level);
    let first_stream = FLUX_STREAM_BASE + face as u64 * n_rays as u64;

    let mut sum = 0.0;
    let mut stats = RayStats::default();

    for i_ray in 0..n_rays {
        let mut rng = CellRng::new(config.random_seed, cell, first_stream + i_ray as u64);
        let origin = sampling::face_origin(&mut rng, lvl, cell, face);
        let (direction, cos_theta) = sampling::hemisphere_direction(&mut rng, face);
        let outcome = trace_ray(ctx, RayMarch::new(lvl, origin, direction, cell), &mut rng);
        sum += outcome.sum_i * cos_theta;
        stats += outcome.stats;
    }
    (2.0 * PI * sum / n_rays as f64, stats)
}
