use clap::Parser;
use log::{info, LevelFilter};
use serde::Serialize;
use simple_logger::SimpleLogger;
use rmcrt::config::{Algorithm, RmcrtConfig};
use rmcrt::field_store::{DataWarehouse, FieldStore, Label};
use rmcrt::grid::GridHierarchy;
use rmcrt::index_space::Index3;
use rmcrt::num_vec::Vector3;
use rmcrt::patch::CellField;
use rmcrt::radiation::{PatchReport, RmcrtSolver, FLOW, WALL};




/// Temperature at which the blackbody emissive power sigma T^4 is one.
const UNIT_EMISSIVE_POWER_TEMPERATURE: f64 = 64.804;




#[derive(Debug, Parser)]
#[clap(version = "1.0", about = "Burns-Christon benchmark: a hot, non-uniformly absorbing cube with cold black walls")]
struct Opts {
    /// Cells per axis on the coarsest level
    #[clap(short = 'n', long, default_value = "16")]
    cells: i64,

    /// Refinement ratio of each finer level (repeatable)
    #[clap(short = 'r', long)]
    ratio: Vec<i64>,

    /// Cells per axis in each patch of the finest level
    #[clap(short = 'p', long, default_value = "8")]
    patch_size: i64,

    /// TOML file with radiation options
    #[clap(short = 'c', long)]
    config: Option<String>,

    /// Override the number of rays per cell
    #[clap(long)]
    rays: Option<usize>,

    #[clap(short = 'o', long, default_value = "uniform_cube.cbor")]
    output: String,
}




#[derive(Serialize)]
struct Output {
    config: RmcrtConfig,
    cells: Vec<(Index3, f64, f64)>,
    reports: Vec<PatchReport>,
}




fn abskg_at(x: Vector3) -> f64 {
    let f = |a: f64| 1.0 - 2.0 * (a - 0.5).abs();
    0.9 * f(x[0]) * f(x[1]) * f(x[2]) + 0.1
}




/**
 * Put the temperature, absorption coefficient and cell type on the finest
 * level, derive the emission there, and coarsen everything to the levels
 * below it.
 */
fn initial_store(solver: &RmcrtSolver) -> rmcrt::Result<DataWarehouse> {
    let grid = solver.grid();
    let finest = grid.finest();
    let n = finest.index();
    let domain = finest.domain().clone();
    let space = finest.domain_with_extra_cells();
    let inside = |c| domain.contains(c);
    let mut dw = DataWarehouse::new();

    dw.put(Label::Temperature, n, CellField::from_function(space.clone(), |c| {
        if inside(c) { UNIT_EMISSIVE_POWER_TEMPERATURE } else { 0.0 }
    }))?;
    dw.put(Label::Abskg, n, CellField::from_function(space.clone(), |c| {
        if inside(c) { abskg_at(finest.cell_center(c)) } else { 1.0 }
    }))?;
    dw.put(Label::CellType, n, CellField::from_function(space.clone(), |c| {
        if inside(c) { FLOW } else { WALL }
    }))?;
    solver.compute_emission(&mut dw, n, &space)?;

    for fine_level in (1..grid.num_levels()).rev() {
        solver.coarsen_properties(&mut dw, fine_level)?;
    }
    Ok(dw)
}




// ============================================================================
fn main() -> Result<(), Box<dyn std::error::Error>> {
    SimpleLogger::new().with_level(LevelFilter::Info).init()?;

    let opts = Opts::parse();
    let mut config = match &opts.config {
        Some(path) => RmcrtConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => RmcrtConfig::default(),
    };
    if let Some(rays) = opts.rays {
        config.n_div_q_rays = rays;
    }
    if opts.ratio.is_empty() && config.algorithm != Algorithm::SingleLevel {
        return Err(format!("the {:?} algorithm needs at least one --ratio", config.algorithm).into());
    }

    let ratios: Vec<Index3> = opts.ratio.iter().map(|&r| (r, r, r)).collect();
    let grid = GridHierarchy::nested(Vector3::splat(0.0), Vector3::splat(1.0), (opts.cells, opts.cells, opts.cells), &ratios)?;
    let solver = RmcrtSolver::new(config, grid)?;
    let dw = initial_store(&solver)?;

    let finest = solver.grid().finest();
    let patches = finest.decompose((opts.patch_size, opts.patch_size, opts.patch_size), 0);
    let mut out = DataWarehouse::new();
    let mut reports = Vec::new();
    let mut cells = Vec::new();

    info!("solving {} patches on level {}", patches.len(), finest.index());

    for patch in &patches {
        reports.push(solver.solve_patch(&dw, &mut out, patch)?);

        let div_q: &CellField<f64> = out.get(Label::DivQ, patch.level(), patch.index_space())?;
        let volq: &CellField<f64> = out.get(Label::RadiationVolq, patch.level(), patch.index_space())?;

        for (c, q) in div_q.iter() {
            cells.push((c, q, volq.get(c).unwrap_or(0.0)));
        }
    }

    let rays: u64 = reports.iter().map(|r| r.stats.rays).sum();
    let mean = cells.iter().map(|c| c.1).sum::<f64>() / cells.len() as f64;
    info!("traced {} rays; mean divQ = {:.6}", rays, mean);

    let output = Output { config: solver.config().clone(), cells, reports };
    let file = std::fs::File::create(&opts.output)?;
    ciborium::ser::into_writer(&output, std::io::BufWriter::new(file))?;
    info!("wrote {}", opts.output);

    Ok(())
}
