use clap::Parser;
use glam::{DMat3, DVec3};
use log::{info, warn, LevelFilter};
use serde::Serialize;
use simple_logger::SimpleLogger;
use rmcrt::config::PlasticityConfig;
use rmcrt::plasticity::tensor::equivalent_stress;
use rmcrt::plasticity::{Particle, RadialReturn, StepOutcome, StepStats};




#[derive(Debug, Parser)]
#[clap(version = "1.0", about = "Drive a block of particles in simple shear through the radial-return stress update")]
struct Opts {
    #[clap(short = 'n', long, default_value = "64")]
    particles: usize,

    /// Engineering shear strain rate (1/s)
    #[clap(short = 'g', long, default_value = "1e4")]
    shear_rate: f64,

    #[clap(long, default_value = "1e-6")]
    dt: f64,

    /// Final time (s)
    #[clap(short = 't', long, default_value = "2e-5")]
    end_time: f64,

    /// TOML file with material and model options
    #[clap(short = 'c', long)]
    config: Option<String>,

    #[clap(short = 'o', long, default_value = "plastic_shear.cbor")]
    output: String,
}




#[derive(Serialize)]
struct Sample {
    time: f64,
    equivalent_stress: f64,
    plastic_strain: f64,
    temperature: f64,
    stats: StepStats,
}




// ============================================================================
fn main() -> Result<(), Box<dyn std::error::Error>> {
    SimpleLogger::new().with_level(LevelFilter::Info).init()?;

    let opts = Opts::parse();
    let config = match &opts.config {
        Some(path) => PlasticityConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => PlasticityConfig::default(),
    };
    let initial_temperature = config.material.initial_temperature;
    let model = RadialReturn::new(config)?;

    let shear = DMat3::from_cols(DVec3::ZERO, DVec3::new(opts.shear_rate, 0.0, 0.0), DVec3::ZERO);
    let gradients = vec![shear; opts.particles];
    let mut particles: Vec<_> = (0..opts.particles)
        .map(|_| Particle::new(initial_temperature, 0.0))
        .collect();

    let mut time = 0.0;
    let mut dt = opts.dt;
    let mut history = Vec::new();

    while time < opts.end_time {
        match model.update_particles(&mut particles, &gradients, dt)? {
            StepOutcome::Completed(stats) => {
                time += dt;
                let p = &particles[0];
                history.push(Sample {
                    time,
                    equivalent_stress: equivalent_stress(&p.stress),
                    plastic_strain: p.plastic_strain,
                    temperature: p.temperature,
                    stats,
                });
                info!("t={:.3e} sigma_eq={:.4e} eps_p={:.4e}", time, equivalent_stress(&p.stress), p.plastic_strain);
            }
            StepOutcome::RestartTimestep { suggested_dt, .. } => {
                warn!("restarting step at t={:.3e} with dt={:.3e}", time, suggested_dt);
                dt = suggested_dt;
            }
        }
    }

    let file = std::fs::File::create(&opts.output)?;
    ciborium::ser::into_writer(&history, std::io::BufWriter::new(file))?;
    info!("wrote {} samples to {}", history.len(), opts.output);

    Ok(())
}
