use std::collections::HashMap;
use std::time::Instant;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::config::{Algorithm, RegionOfInterest, RmcrtConfig};
use crate::error::{Error, Result};
use crate::field_store::{Dependency, FieldStore, Generation, Ghost, Label};
use crate::grid::{GridHierarchy, Level};
use crate::index_space::{Index3, IndexSpace};
use crate::patch::{CellField, Patch};
use super::accumulator::{self, CellRadiation, LevelProperties, RayStats, TraceContext};
use super::properties::{self, FLOW};
use super::sampling::Face;
use super::validate::{validate_enclosure, validate_properties};




/**
 * Radiative flux incident on the boundary faces of flow cells, keyed by the
 * cell and the face.
 */
pub type BoundaryFlux = HashMap<(Index3, Face), f64>;




/**
 * What a patch solve produced besides the fields written to the store.
 */
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PatchReport {
    pub patch: usize,
    /// The level rays were launched from.
    pub trace_level: usize,
    pub stats: RayStats,
    pub boundary_flux: BoundaryFlux,
}




/**
 * The levels, cells and regions involved in tracing one patch.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct TracePlan {
    /// Level the rays start on.
    pub level: usize,
    /// Cells on `level` which launch rays.
    pub cells: IndexSpace,
    /// Region of interest per level (`None` is the whole level).
    pub regions: Vec<Option<IndexSpace>>,
    /// Levels whose properties are read, with the region that must be
    /// available on each.
    pub loads: Vec<(usize, IndexSpace)>,
}




/**
 * Reverse Monte Carlo ray tracing solver. It holds the options and the grid
 * hierarchy, and computes `divQ` and `radiationVolq` one patch at a time.
 * Patches are independent: each reads a snapshot of the radiative
 * properties and writes only its own cells.
 */
pub struct RmcrtSolver {
    config: RmcrtConfig,
    grid: GridHierarchy,
}




// ============================================================================
impl RmcrtSolver {


    /**
     * Create a solver, validating the options against the grid.
     */
    pub fn new(config: RmcrtConfig, grid: GridHierarchy) -> Result<Self> {
        config.validate()?;

        let min_dx = grid
            .levels()
            .map(|level| level.cell_spacing())
            .flat_map(|dx| dx.as_array())
            .fold(f64::INFINITY, f64::min);

        config.validate_extents(min_dx)?;
        Ok(Self { config, grid })
    }


    pub fn config(&self) -> &RmcrtConfig {
        &self.config
    }


    pub fn grid(&self) -> &GridHierarchy {
        &self.grid
    }


    /**
     * Declare the fields read and written when solving a patch on the given
     * level, so that an external scheduler can order the solve after the
     * property computations and materialize the ghost data it needs.
     */
    pub fn dependencies(&self, patch_level: usize) -> Vec<Dependency> {
        let finest = self.grid.num_levels() - 1;
        let mut deps = Vec::new();

        let mut require = |level: usize, ghost: Ghost| {
            deps.push(Dependency::requires(Label::Abskg, Generation::New, level, ghost));
            deps.push(Dependency::requires(Label::SigmaT4OverPi, Generation::New, level, ghost));
            deps.push(Dependency::requires(Label::CellType, Generation::Old, level, ghost));
        };

        match self.config.algorithm {
            Algorithm::SingleLevel => {
                require(patch_level, Ghost::EntireLevel);
            }
            Algorithm::DataOnion => {
                let ghost = match self.config.region_of_interest {
                    RegionOfInterest::BoundedBox { .. } => Ghost::EntireLevel,
                    _ => {
                        let h = self.halo(self.grid.level(finest));
                        Ghost::Cells(h.0.max(h.1).max(h.2))
                    }
                };
                require(finest, ghost);

                for level in 0..finest {
                    require(level, Ghost::EntireLevel);
                }
            }
            Algorithm::CoarseLevel => {
                require(0, Ghost::EntireLevel);
            }
        }

        if self.config.solve_div_q {
            deps.push(Dependency::computes(Label::DivQ, patch_level));
            deps.push(Dependency::computes(Label::RadiationVolq, patch_level));
        }
        deps
    }


    /**
     * Compute `sigmaT4OverPi` from the temperature over a region of a level.
     */
    pub fn compute_emission<S: FieldStore>(&self, store: &mut S, level: usize, region: &IndexSpace) -> Result<()> {
        let source = {
            let temperature: &CellField<f64> = store.get(Label::Temperature, level, region)?;
            properties::sigma_t4_over_pi(&temperature.extract(region.clone()))
        };
        store.put(Label::SigmaT4OverPi, level, source)
    }


    /**
     * Restrict the radiative properties of `fine_level` (over the whole
     * level, including extra cells) to the next coarser level, and put them
     * in the store.
     */
    pub fn coarsen_properties<S: FieldStore>(&self, store: &mut S, fine_level: usize) -> Result<()> {
        if fine_level == 0 || fine_level >= self.grid.num_levels() {
            return Err(Error::InvalidConfig {
                key: "fine_level".to_string(),
                reason: format!("level {} has no coarser level in the hierarchy", fine_level),
            });
        }
        let level = self.grid.level(fine_level);
        let ratio = level.refinement_ratio();
        let space = level.domain_with_extra_cells();

        let (abskg, source, cell_type) = {
            let abskg: &CellField<f64> = store.get(Label::Abskg, fine_level, &space)?;
            let source: &CellField<f64> = store.get(Label::SigmaT4OverPi, fine_level, &space)?;
            let cell_type: &CellField<i32> = store.get(Label::CellType, fine_level, &space)?;
            (
                properties::coarsen_average(&abskg.extract(space.clone()), ratio),
                properties::coarsen_average(&source.extract(space.clone()), ratio),
                properties::coarsen_cell_type(&cell_type.extract(space.clone()), ratio),
            )
        };
        store.put(Label::Abskg, fine_level - 1, abskg)?;
        store.put(Label::SigmaT4OverPi, fine_level - 1, source)?;
        store.put(Label::CellType, fine_level - 1, cell_type)?;

        debug!("coarsened radiative properties from level {} to {}", fine_level, fine_level - 1);
        Ok(())
    }


    /**
     * Work out where rays for a patch start and where they may travel.
     */
    pub fn plan(&self, patch: &Patch) -> Result<TracePlan> {
        let num_levels = self.grid.num_levels();
        let patch_level = patch.level();

        if patch_level >= num_levels {
            return Err(Error::InvalidConfig {
                key: "patch".to_string(),
                reason: format!("patch {} is on level {}, beyond the hierarchy", patch.id(), patch_level),
            });
        }
        let whole = |n: usize| (n, self.grid.level(n).domain_with_extra_cells());

        match self.config.algorithm {
            Algorithm::SingleLevel => Ok(TracePlan {
                level: patch_level,
                cells: patch.index_space().clone(),
                regions: vec![None; num_levels],
                loads: vec![whole(patch_level)],
            }),
            Algorithm::CoarseLevel => {
                let ratio = self.grid.ratio_between(0, patch_level);
                Ok(TracePlan {
                    level: 0,
                    cells: patch.index_space().coarsen_by(ratio),
                    regions: vec![None; num_levels],
                    loads: vec![whole(0)],
                })
            }
            Algorithm::DataOnion => {
                let finest = num_levels - 1;

                if patch_level != finest {
                    return Err(Error::InvalidConfig {
                        key: "algorithm".to_string(),
                        reason: format!("data onion patches must be on the finest level {}, not {}", finest, patch_level),
                    });
                }
                let mut regions = vec![None; num_levels];
                let mut loads = vec![whole(0)];
                let mut inner = patch.index_space().clone();

                for n in (1..=finest).rev() {
                    let level = self.grid.level(n);
                    let region = self.region_on_level(level, &inner)?;
                    loads.push((n, region.clone()));
                    inner = region.coarsen_by(level.refinement_ratio());
                    regions[n] = Some(region);
                }
                Ok(TracePlan {
                    level: finest,
                    cells: patch.index_space().clone(),
                    regions,
                    loads,
                })
            }
        }
    }


    /**
     * Trace rays from every flow cell of a patch and write `divQ` and
     * `radiationVolq` for the patch into `out`. Properties are read from
     * `store`, and validated before any ray is launched. Non-flow cells get
     * zero for both outputs.
     */
    pub fn solve_patch<S: FieldStore, W: FieldStore>(&self, store: &S, out: &mut W, patch: &Patch) -> Result<PatchReport> {
        let start = Instant::now();
        let plan = self.plan(patch)?;
        let mut ctx = TraceContext::new(&self.grid, &self.config).with_regions(plan.regions.clone());

        for (level, region) in &plan.loads {
            let props = LevelProperties {
                abskg: store.get(Label::Abskg, *level, region)?,
                sigma_t4_over_pi: store.get(Label::SigmaT4OverPi, *level, region)?,
                cell_type: store.get(Label::CellType, *level, region)?,
            };
            validate_properties(&props, region, patch.id(), *level, self.config.allow_reflect)?;

            if plan.regions[*level].is_none() {
                validate_enclosure(props.cell_type, region, patch.id(), *level)?;
            }
            ctx = ctx.with_level(*level, props);
        }

        let mut report = PatchReport {
            patch: patch.id(),
            trace_level: plan.level,
            ..PatchReport::default()
        };

        if self.config.solve_div_q {
            let cell_type = ctx.properties(plan.level).cell_type;
            let radiation = CellField::from_par_function(plan.cells.clone(), |cell| {
                if cell_type[cell] == FLOW {
                    accumulator::solve_cell(&ctx, plan.level, cell)
                } else {
                    CellRadiation::default()
                }
            });
            let div_q = CellField::from_function(plan.cells.clone(), |c| radiation[c].div_q);
            let volq = CellField::from_function(plan.cells.clone(), |c| radiation[c].volq);

            report.stats += radiation
                .as_slice()
                .iter()
                .fold(RayStats::default(), |acc, r| acc + r.stats);

            let (div_q, volq) = if plan.level == patch.level() {
                (div_q, volq)
            } else {
                let ratio = self.grid.ratio_between(plan.level, patch.level());
                let space = patch.index_space().clone();
                (properties::refine_constant(&div_q, ratio, space.clone()), properties::refine_constant(&volq, ratio, space))
            };
            out.put(Label::DivQ, patch.level(), div_q)?;
            out.put(Label::RadiationVolq, patch.level(), volq)?;
        }

        if self.config.solve_boundary_flux {
            let (flux, stats) = self.boundary_flux(&ctx, &plan);
            report.boundary_flux = flux;
            report.stats += stats;
        }

        info!(
            "patch {} (level {}): {} rays, {} steps, {} reflections in {:.3}s",
            patch.id(),
            plan.level,
            report.stats.rays,
            report.stats.steps,
            report.stats.reflections,
            start.elapsed().as_secs_f64());

        if report.stats.truncated > 0 || report.stats.scatters > 0 {
            debug!(
                "patch {}: {} rays reached the maximum length, {} scattering events",
                patch.id(),
                report.stats.truncated,
                report.stats.scatters);
        }
        Ok(report)
    }


    fn boundary_flux(&self, ctx: &TraceContext, plan: &TracePlan) -> (BoundaryFlux, RayStats) {
        let cell_type = ctx.properties(plan.level).cell_type;
        let is_solid = |cell: Index3| cell_type.get(cell).map_or(false, |code| code != FLOW);

        let faces: Vec<(Index3, Face)> = plan.cells
            .iter()
            .filter(|&cell| cell_type[cell] == FLOW)
            .flat_map(|cell| Face::ALL.iter().map(move |&face| (cell, face)))
            .filter(|&(cell, face)| is_solid(face.neighbor(cell)))
            .collect();

        let results: Vec<_> = faces
            .into_par_iter()
            .map(|(cell, face)| {
                let (q, stats) = accumulator::incident_flux(ctx, plan.level, cell, face);
                ((cell, face), q, stats)
            })
            .collect();

        let stats = results.iter().fold(RayStats::default(), |acc, r| acc + r.2);
        let flux = results.into_iter().map(|(key, q, _)| (key, q)).collect();
        (flux, stats)
    }


    /**
     * Return the region of interest on a level around `inner` (the patch on
     * the finest level, or the coarsened region of the next finer level),
     * clipped to the level's cells including extra cells.
     */
    fn region_on_level(&self, level: &Level, inner: &IndexSpace) -> Result<IndexSpace> {
        let region = match &self.config.region_of_interest {
            RegionOfInterest::PatchBased { .. } | RegionOfInterest::HaloLength { .. } => {
                inner.extend(self.halo(level))
            }
            RegionOfInterest::BoundedBox { lo, hi } => {
                let anchor = level.anchor();
                let dx = level.cell_spacing();
                let lower = |n: usize| ((lo[n] - anchor[n]) / dx[n]).floor() as i64;
                let upper = |n: usize| ((hi[n] - anchor[n]) / dx[n]).ceil() as i64;
                let (i0, j0, k0) = inner.start();
                let (i1, j1, k1) = inner.end();
                IndexSpace::new(
                    lower(0).min(i0) .. upper(0).max(i1),
                    lower(1).min(j0) .. upper(1).max(j1),
                    lower(2).min(k0) .. upper(2).max(k1))
            }
        };
        region
            .intersect(&level.domain_with_extra_cells())
            .ok_or_else(|| Error::InvalidConfig {
                key: "region_of_interest".to_string(),
                reason: format!("region on level {} lies outside the domain", level.index()),
            })
    }


    fn halo(&self, level: &Level) -> Index3 {
        match &self.config.region_of_interest {
            RegionOfInterest::PatchBased { halo_cells } => (halo_cells[0], halo_cells[1], halo_cells[2]),
            RegionOfInterest::HaloLength { length } => {
                let dx = level.cell_spacing();
                let cells = |n: usize| (length / dx[n]).ceil() as i64;
                (cells(0), cells(1), cells(2))
            }
            RegionOfInterest::BoundedBox { .. } => (0, 0, 0),
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use std::f64::consts::PI;
    use super::*;
    use crate::field_store::DataWarehouse;
    use crate::index_space::range3d;
    use crate::num_vec::Vector3;
    use crate::radiation::properties::WALL;

    /**
     * Put uniform properties on every level: the medium has absorption
     * `kappa` and source `source`; the walls are black with source
     * `wall_source`.
     */
    fn uniform_store(grid: &GridHierarchy, kappa: f64, source: f64, wall_source: f64) -> DataWarehouse {
        let mut dw = DataWarehouse::new();

        for level in grid.levels() {
            let domain = level.domain().clone();
            let space = level.domain_with_extra_cells();
            let inside = |c| domain.contains(c);
            let n = level.index();
            dw.put(Label::Abskg, n, CellField::from_function(space.clone(), |c| if inside(c) { kappa } else { 1.0 })).unwrap();
            dw.put(Label::SigmaT4OverPi, n, CellField::from_function(space.clone(), |c| if inside(c) { source } else { wall_source })).unwrap();
            dw.put(Label::CellType, n, CellField::from_function(space, |c| if inside(c) { FLOW } else { WALL })).unwrap();
        }
        dw
    }

    fn unit_grid(cells: i64, ratios: &[Index3]) -> GridHierarchy {
        GridHierarchy::nested(Vector3::splat(0.0), Vector3::splat(1.0), (cells, cells, cells), ratios).unwrap()
    }

    fn solve(config: RmcrtConfig, grid: GridHierarchy, dw: &DataWarehouse, patch: &Patch) -> (CellField<f64>, CellField<f64>, PatchReport) {
        let solver = RmcrtSolver::new(config, grid).unwrap();
        let mut out = DataWarehouse::new();
        let report = solver.solve_patch(dw, &mut out, patch).unwrap();
        let div_q: &CellField<f64> = out.get(Label::DivQ, patch.level(), patch.index_space()).unwrap();
        let volq: &CellField<f64> = out.get(Label::RadiationVolq, patch.level(), patch.index_space()).unwrap();
        (div_q.clone(), volq.clone(), report)
    }

    #[test]
    fn isothermal_enclosure_is_in_radiative_equilibrium() {
        let grid = unit_grid(8, &[]);
        let dw = uniform_store(&grid, 0.5, 1.0, 1.0);
        let patch = Patch::new(0, 0, range3d(0..4, 0..4, 0..4));
        let config = RmcrtConfig { n_div_q_rays: 20, ..RmcrtConfig::default() };
        let (div_q, volq, report) = solve(config, grid, &dw, &patch);

        assert!(div_q.as_slice().iter().all(|q| q.abs() < 1e-10));
        assert!(volq.as_slice().iter().all(|g| (g - 4.0 * PI).abs() < 1e-10));
        assert_eq!(report.stats.rays, 64 * 20);
    }

    #[test]
    fn optically_thin_cube_approaches_the_thin_limit() {
        let grid = unit_grid(10, &[]);
        let dw = uniform_store(&grid, 0.1, 1.0, 0.0);
        let patch = Patch::new(0, 0, range3d(4..6, 4..6, 4..6));
        let config = RmcrtConfig {
            n_div_q_rays: 1000,
            threshold: 0.01,
            allow_reflect: false,
            ..RmcrtConfig::default()
        };
        let (div_q, _, _) = solve(config, grid, &dw, &patch);
        let thin_limit = -4.0 * PI * 0.1 * 1.0;
        let mean = div_q.as_slice().iter().sum::<f64>() / 8.0;

        assert!(mean / thin_limit < 1.0);
        assert!((mean / thin_limit - 1.0).abs() < 0.1);
    }

    #[test]
    fn data_onion_matches_single_level_in_a_uniform_medium() {
        let grid = unit_grid(4, &[(2, 2, 2)]);
        let dw = uniform_store(&grid, 0.7, 1.0, 0.0);
        let patch = Patch::new(0, 1, range3d(2..4, 2..4, 4..6));
        let base = RmcrtConfig { n_div_q_rays: 30, allow_reflect: false, ..RmcrtConfig::default() };
        let onion = RmcrtConfig {
            algorithm: Algorithm::DataOnion,
            region_of_interest: RegionOfInterest::PatchBased { halo_cells: [1, 1, 1] },
            ..base.clone()
        };
        let (single, _, _) = solve(base, grid.clone(), &dw, &patch);
        let (layered, _, _) = solve(onion, grid, &dw, &patch);

        for ((_, a), (_, b)) in single.iter().zip(layered.iter()) {
            assert!((a - b).abs() < 1e-9 * a.abs().max(1.0));
        }
    }

    #[test]
    fn data_onion_preserves_equilibrium_across_levels() {
        let grid = unit_grid(4, &[(2, 2, 2), (2, 2, 2)]);
        let dw = uniform_store(&grid, 0.3, 2.0, 2.0);
        let patch = Patch::new(0, 2, range3d(6..10, 6..8, 0..2));
        let config = RmcrtConfig {
            algorithm: Algorithm::DataOnion,
            region_of_interest: RegionOfInterest::HaloLength { length: 0.1 },
            n_div_q_rays: 10,
            ..RmcrtConfig::default()
        };
        let (div_q, volq, _) = solve(config, grid, &dw, &patch);

        assert!(div_q.as_slice().iter().all(|q| q.abs() < 1e-9));
        assert!(volq.as_slice().iter().all(|g| (g - 8.0 * PI).abs() < 1e-9));
    }

    #[test]
    fn data_onion_regions_shrink_toward_coarse_levels() {
        let grid = unit_grid(4, &[(2, 2, 2), (2, 2, 2)]);
        let config = RmcrtConfig {
            algorithm: Algorithm::DataOnion,
            region_of_interest: RegionOfInterest::PatchBased { halo_cells: [2, 2, 2] },
            ..RmcrtConfig::default()
        };
        let solver = RmcrtSolver::new(config, grid).unwrap();
        let plan = solver.plan(&Patch::new(0, 2, range3d(0..4, 4..8, 4..8))).unwrap();

        assert_eq!(plan.level, 2);
        assert_eq!(plan.regions[0], None);
        assert_eq!(plan.regions[2], Some(range3d(-1..6, 2..10, 2..10)));
        assert_eq!(plan.regions[1], Some(range3d(-1..5, -1..7, -1..7)));
        assert_eq!(plan.loads.len(), 3);
    }

    #[test]
    fn data_onion_requires_a_finest_level_patch() {
        let grid = unit_grid(4, &[(2, 2, 2)]);
        let config = RmcrtConfig { algorithm: Algorithm::DataOnion, ..RmcrtConfig::default() };
        let solver = RmcrtSolver::new(config, grid).unwrap();
        assert!(solver.plan(&Patch::new(0, 0, range3d(0..4, 0..4, 0..4))).is_err());
    }

    #[test]
    fn coarse_level_algorithm_refines_coarse_results() {
        let grid = unit_grid(4, &[(2, 2, 2)]);
        let mut dw = DataWarehouse::new();
        let fine = grid.finest();
        let domain = fine.domain().clone();
        let space = fine.domain_with_extra_cells();
        dw.put(Label::Abskg, 1, CellField::from_function(space.clone(), |c| if domain.contains(c) { 0.4 } else { 1.0 })).unwrap();
        dw.put(Label::SigmaT4OverPi, 1, CellField::filled(space.clone(), 1.5)).unwrap();
        dw.put(Label::CellType, 1, CellField::from_function(space, |c| if domain.contains(c) { FLOW } else { WALL })).unwrap();

        let config = RmcrtConfig { algorithm: Algorithm::CoarseLevel, n_div_q_rays: 10, ..RmcrtConfig::default() };
        let solver = RmcrtSolver::new(config, grid).unwrap();
        solver.coarsen_properties(&mut dw, 1).unwrap();

        let patch = Patch::new(0, 1, range3d(0..8, 0..8, 0..2));
        let mut out = DataWarehouse::new();
        let report = solver.solve_patch(&dw, &mut out, &patch).unwrap();
        let volq: &CellField<f64> = out.get(Label::RadiationVolq, 1, patch.index_space()).unwrap();

        assert_eq!(report.trace_level, 0);
        assert_eq!(report.stats.rays, 16 * 10);
        assert_eq!(volq.index_space(), patch.index_space());
        assert!(volq.as_slice().iter().all(|g| (g - 6.0 * PI).abs() < 1e-9));
    }

    #[test]
    fn boundary_flux_on_a_black_isothermal_enclosure() {
        let grid = unit_grid(6, &[]);
        let dw = uniform_store(&grid, 0.0, 2.0, 2.0);
        let patch = Patch::new(0, 0, range3d(0..2, 0..2, 0..2));
        let config = RmcrtConfig {
            solve_div_q: false,
            solve_boundary_flux: true,
            n_flux_rays: 100,
            ..RmcrtConfig::default()
        };
        let solver = RmcrtSolver::new(config, grid).unwrap();
        let mut out = DataWarehouse::new();
        let report = solver.solve_patch(&dw, &mut out, &patch).unwrap();
        let mean = report.boundary_flux.values().sum::<f64>() / report.boundary_flux.len() as f64;

        assert_eq!(report.boundary_flux.len(), 12);
        assert!(report.boundary_flux.contains_key(&((0, 1, 1), Face::XMinus)));
        assert!(!out.exists(Label::DivQ, 0));
        assert!((mean - 2.0 * PI).abs() / (2.0 * PI) < 0.1);
    }

    #[test]
    fn unenclosed_domain_aborts_the_solve() {
        let grid = unit_grid(4, &[]);
        let space = grid.finest().domain_with_extra_cells();
        let mut dw = DataWarehouse::new();
        dw.put(Label::Abskg, 0, CellField::filled(space.clone(), 0.5)).unwrap();
        dw.put(Label::SigmaT4OverPi, 0, CellField::filled(space.clone(), 1.0)).unwrap();
        dw.put(Label::CellType, 0, CellField::filled(space, FLOW)).unwrap();

        let solver = RmcrtSolver::new(RmcrtConfig::default(), grid).unwrap();
        let mut out = DataWarehouse::new();
        let patch = Patch::new(7, 0, range3d(0..4, 0..4, 0..4));

        assert!(matches!(
            solver.solve_patch(&dw, &mut out, &patch),
            Err(Error::OpenBoundary { patch: 7, level: 0, .. })));
        assert!(!out.exists(Label::DivQ, 0));
    }

    #[test]
    fn nan_properties_abort_the_solve() {
        let grid = unit_grid(4, &[]);
        let mut dw = DataWarehouse::new();
        let space = grid.finest().domain_with_extra_cells();
        let mut abskg = CellField::filled(space.clone(), 1.0);
        abskg[(2, 2, 3)] = f64::NAN;
        dw.put(Label::Abskg, 0, abskg).unwrap();
        dw.put(Label::SigmaT4OverPi, 0, CellField::filled(space.clone(), 1.0)).unwrap();
        dw.put(Label::CellType, 0, CellField::filled(space, FLOW)).unwrap();

        let solver = RmcrtSolver::new(RmcrtConfig::default(), grid).unwrap();
        let result = solver.solve_patch(&dw, &mut DataWarehouse::new(), &Patch::new(7, 0, range3d(0..2, 0..2, 0..2)));
        assert!(matches!(result, Err(Error::NonPhysicalField { patch: 7, cell: (2, 2, 3), .. })));
    }

    #[test]
    fn periodic_grids_are_rejected() {
        let config = RmcrtConfig { periodic: [true, false, false], ..RmcrtConfig::default() };
        assert!(matches!(RmcrtSolver::new(config, unit_grid(4, &[])), Err(Error::PeriodicBoundary { axis: 0 })));
    }

    #[test]
    fn dependencies_cover_every_traced_level() {
        let grid = unit_grid(4, &[(2, 2, 2), (2, 2, 2)]);
        let config = RmcrtConfig { algorithm: Algorithm::DataOnion, ..RmcrtConfig::default() };
        let solver = RmcrtSolver::new(config, grid).unwrap();
        let deps = solver.dependencies(2);

        for level in 0..3 {
            assert!(deps.iter().any(|d| d.label == Label::Abskg && d.level == level));
        }
        assert!(deps.contains(&Dependency::requires(Label::CellType, Generation::Old, 2, Ghost::Cells(10))));
        assert!(deps.contains(&Dependency::computes(Label::DivQ, 2)));
    }

    #[test]
    fn emission_is_computed_from_temperature() {
        let grid = unit_grid(2, &[]);
        let solver = RmcrtSolver::new(RmcrtConfig::default(), grid).unwrap();
        let mut dw = DataWarehouse::new();
        let region = range3d(0..2, 0..2, 0..2);
        dw.put(Label::Temperature, 0, CellField::filled(region.extend_all(1), 300.0)).unwrap();
        solver.compute_emission(&mut dw, 0, &region).unwrap();

        let source: &CellField<f64> = dw.get(Label::SigmaT4OverPi, 0, &region).unwrap();
        assert!((source[(1, 1, 1)] - properties::STEFAN_BOLTZMANN * 300f64.powi(4) / PI).abs() < 1e-9);
    }
}
