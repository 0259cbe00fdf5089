use glam::DMat3;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::config::PlasticityConfig;
use crate::error::{Error, Result};
use super::models::{EosPressure, ErosionAlgorithm, StabilityCheck};
use super::state::{Particle, PlasticityState};
use super::tensor::{contract, deviatoric, equivalent_stress, norm, polar_decomposition, symmetric, trace};




/// Hard cap on Newton iterations for the consistency parameter. Hitting it
/// is not an error: the last iterate is used, and the event is counted.
pub const MAX_NEWTON_ITERATIONS: u32 = 100;

const SQRT_TWO_THIRDS: f64 = 0.816_496_580_927_726;




/**
 * Which branch of the stress update a particle took.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Melted,
    Elastic,
    Plastic,
}




/**
 * Conditions which invalidate a step without invalidating the run: the
 * step is retried with a smaller timestep.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoftFailure {
    /// The deformation increment `I + L dt` inverts the particle.
    NegativeSpecificVolume,
    NegativeInternalEnergy,
    /// The density is outside the range of the equation of state.
    EosOutOfRange,
}




/**
 * The consistency parameter found by the local solve.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonSolution {
    pub delta_gamma: f64,
    /// Zero when the closed-form estimate was accepted.
    pub iterations: u32,
    pub converged: bool,
}




/**
 * The result of updating one particle.
 */
#[derive(Clone, Copy, Debug)]
pub struct StressUpdate {
    pub particle: Particle,
    pub phase: Phase,
    pub newton: Option<NewtonSolution>,
    pub newly_localized: bool,
    pub eroded: bool,
}




#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStats {
    pub elastic: usize,
    pub plastic: usize,
    pub melted: usize,
    pub newly_localized: usize,
    pub eroded: usize,
    pub newton_cap_hits: usize,
}




/**
 * The outcome of updating all particles for one timestep. A restart leaves
 * every particle untouched.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    Completed(StepStats),
    RestartTimestep {
        particle: usize,
        failure: SoftFailure,
        suggested_dt: f64,
    },
}




/**
 * Hypoelastic-plastic stress update by radial return. The stress is updated
 * in the unrotated frame given by the polar decomposition of the
 * deformation gradient.
 */
pub struct RadialReturn {
    config: PlasticityConfig,
}




// ============================================================================
impl RadialReturn {


    pub fn new(config: PlasticityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }


    pub fn config(&self) -> &PlasticityConfig {
        &self.config
    }


    /**
     * Update every particle for a step of size `dt`, given each particle's
     * velocity gradient. Particles are independent and are updated in
     * parallel. If any particle hits a soft failure, nothing is written
     * back and a restart with a reduced step is requested.
     */
    pub fn update_particles(&self, particles: &mut [Particle], velocity_gradients: &[DMat3], dt: f64) -> Result<StepOutcome> {
        assert_eq!(particles.len(), velocity_gradients.len(), "one velocity gradient is needed per particle");

        let updates = particles
            .par_iter()
            .zip(velocity_gradients.par_iter())
            .enumerate()
            .map(|(n, (particle, l))| self.update_particle(n, particle, *l, dt))
            .collect::<Result<Vec<_>>>()?;

        let failure = updates
            .iter()
            .enumerate()
            .find_map(|(n, u)| u.as_ref().err().map(|f| (n, *f)));

        if let Some((particle, failure)) = failure {
            let suggested_dt = dt * self.config.restart_reduction_factor;
            warn!("particle {}: {:?}; requesting timestep restart with dt = {:e}", particle, failure, suggested_dt);
            return Ok(StepOutcome::RestartTimestep { particle, failure, suggested_dt });
        }

        let mut stats = StepStats::default();

        for (particle, update) in particles.iter_mut().zip(updates.into_iter().flatten()) {
            match update.phase {
                Phase::Elastic => stats.elastic += 1,
                Phase::Plastic => stats.plastic += 1,
                Phase::Melted => stats.melted += 1,
            }
            if update.newton.map_or(false, |n| !n.converged) {
                stats.newton_cap_hits += 1;
            }
            stats.newly_localized += update.newly_localized as usize;
            stats.eroded += update.eroded as usize;
            *particle = update.particle;
        }

        if stats.newton_cap_hits > 0 {
            debug!("{} particles reached the Newton iteration cap of {}", stats.newton_cap_hits, MAX_NEWTON_ITERATIONS);
        }
        debug!(
            "stress update: {} elastic, {} plastic, {} melted, {} newly localized",
            stats.elastic,
            stats.plastic,
            stats.melted,
            stats.newly_localized);

        Ok(StepOutcome::Completed(stats))
    }


    /**
     * Update the stress and internal variables of one particle. The outer
     * `Result` carries fatal errors; the inner one carries soft failures.
     */
    pub fn update_particle(
        &self,
        index: usize,
        particle: &Particle,
        velocity_gradient: DMat3,
        dt: f64) -> Result<std::result::Result<StressUpdate, SoftFailure>>
    {
        let config = &self.config;
        let material = &config.material;

        let j_old = particle.deformation_gradient.determinant();

        if !(j_old > 0.0) {
            return Err(Error::NegativeJacobian { particle: index, jacobian: j_old });
        }
        let increment = DMat3::IDENTITY + velocity_gradient * dt;

        if !(increment.determinant() > 0.0) {
            return Ok(Err(SoftFailure::NegativeSpecificVolume));
        }
        let deformation_gradient = increment * particle.deformation_gradient;
        let j_new = deformation_gradient.determinant();

        let (rotation, _) = polar_decomposition(&deformation_gradient)
            .ok_or(Error::NegativeJacobian { particle: index, jacobian: j_new })?;

        let d = rotation.transpose() * symmetric(&velocity_gradient) * rotation;
        let stress_old = particle.rotation.transpose() * particle.stress * particle.rotation;

        let mut state = PlasticityState {
            plastic_strain: particle.plastic_strain,
            plastic_strain_rate: particle.plastic_strain_rate,
            pressure: -trace(&stress_old) / 3.0,
            temperature: particle.temperature,
            initial_temperature: material.initial_temperature,
            density: material.density / j_new,
            initial_density: material.density,
            initial_shear_modulus: material.shear_modulus,
            bulk_modulus: material.bulk_modulus,
            initial_melting_temperature: material.melting_temperature,
            porosity: particle.porosity,
            specific_heat: material.specific_heat,
            ..PlasticityState::default()
        };
        state.melting_temperature = config.melting.melting_temperature(&state);
        state.shear_modulus = config.shear_modulus.shear_modulus(&state);
        state.yield_stress = config.flow_stress.flow_stress(&state);

        let s_old = deviatoric(&stress_old);
        let s_trial = s_old + deviatoric(&d) * (2.0 * state.shear_modulus * dt);
        let trial_norm = norm(&s_trial);

        let pressure = match config.eos.pressure(&state, trace(&d), dt, particle.internal_energy) {
            EosPressure::Valid(p) => p,
            EosPressure::OutOfRange => return Ok(Err(SoftFailure::EosOutOfRange)),
        };

        let melted = state.temperature > state.melting_temperature || state.yield_stress <= 0.0;
        let mut newton = None;
        let mut delta_gamma = 0.0;

        let (phase, s_new) = if melted {
            state.plastic_strain_rate = 0.0;
            (Phase::Melted, if config.zero_stress_on_melt { DMat3::ZERO } else { s_trial })
        } else {
            let trial_stress = s_trial - DMat3::IDENTITY * pressure;
            let phi = config.yield_condition.evaluate(
                (1.5f64).sqrt() * trial_norm,
                state.yield_stress,
                trace(&trial_stress),
                state.porosity);

            if phi <= 0.0 {
                state.plastic_strain_rate = 0.0;
                (Phase::Elastic, s_trial)
            } else {
                let solution = self.solve_delta_gamma(&state, trial_norm, dt);

                if !solution.delta_gamma.is_finite() {
                    return Err(Error::NewtonNaN { particle: index });
                }
                delta_gamma = solution.delta_gamma;
                newton = Some(solution);
                state = self.state_at(&state, delta_gamma, dt);
                state.yield_stress = config.flow_stress.flow_stress(&state);

                let scale = if trial_norm > 0.0 {
                    (SQRT_TWO_THIRDS * state.yield_stress / trial_norm).min(1.0)
                } else {
                    0.0
                };
                (Phase::Plastic, s_trial * scale)
            }
        };
        state.pressure = pressure;

        let mut stress = s_new - DMat3::IDENTITY * pressure;
        let mut temperature = particle.temperature;
        let mut porosity = particle.porosity;
        let mut damage = particle.damage;
        let plastic_increment = state.plastic_strain - particle.plastic_strain;

        if phase == Phase::Plastic {
            if config.adiabatic_heating {
                temperature += material.taylor_quinney * state.yield_stress * plastic_increment
                    / (state.density * material.specific_heat);
            }
            porosity = config.porosity.evolve(particle.porosity, &state, trace(&d), dt);

            let sigma_eq = equivalent_stress(&stress);
            let triaxiality = if sigma_eq > 0.0 { -pressure / sigma_eq } else { 0.0 };
            damage = config.damage.evolve(particle.damage, &state, plastic_increment, triaxiality);
        }

        let mut newly_localized = false;

        if phase == Phase::Plastic && config.check_failure && !particle.localized {
            let f = porosity / config.critical_porosity;
            let mut failed = f * f + damage * damage > 1.0;

            if config.stability == StabilityCheck::Drucker && trial_norm > 0.0 {
                let plastic_strain_increment = s_trial * (delta_gamma / trial_norm);
                failed |= contract(&(s_new - s_old), &plastic_strain_increment) < 0.0;
            }
            newly_localized = failed;
        }

        let eroded = particle.localized && config.erosion != ErosionAlgorithm::None;

        if particle.localized {
            stress = erode(stress, config.erosion, pressure);
        }

        let work = contract(&((stress_old + stress) * 0.5), &d) * dt / state.density;
        let internal_energy = particle.internal_energy + work;

        if internal_energy < 0.0 {
            return Ok(Err(SoftFailure::NegativeInternalEnergy));
        }

        let particle = Particle {
            stress: rotation * stress * rotation.transpose(),
            deformation_gradient,
            rotation,
            plastic_strain: state.plastic_strain,
            plastic_strain_rate: state.plastic_strain_rate,
            damage,
            porosity,
            temperature,
            internal_energy,
            localized: particle.localized || newly_localized,
        };
        Ok(Ok(StressUpdate { particle, phase, newton, newly_localized, eroded }))
    }


    /**
     * Find the consistency parameter for a plastic step. The closed-form
     * estimate from linearizing the consistency condition about zero is
     * accepted if one Newton correction would not move it by more than the
     * tolerance; otherwise it seeds the Newton iteration. Without a usable
     * estimate (non-positive, or a zero trial stress) Newton starts from
     * zero.
     */
    pub fn solve_delta_gamma(&self, state: &PlasticityState, trial_norm: f64, dt: f64) -> NewtonSolution {
        let tolerance = dt.min(self.config.tolerance);

        match self.consistency_estimate(state, trial_norm, dt) {
            Some(estimate) => {
                let (g, dg) = self.consistency_residual(state, trial_norm, dt, estimate);

                if (g / dg).abs() < tolerance {
                    NewtonSolution { delta_gamma: estimate, iterations: 0, converged: true }
                } else {
                    self.newton_delta_gamma(state, trial_norm, dt, estimate)
                }
            }
            None => self.newton_delta_gamma(state, trial_norm, dt, 0.0),
        }
    }


    /**
     * Closed-form estimate of the consistency parameter, or `None` if it is
     * not positive.
     */
    pub fn consistency_estimate(&self, state: &PlasticityState, trial_norm: f64, dt: f64) -> Option<f64> {
        if trial_norm <= 0.0 {
            return None;
        }
        let (g, dg) = self.consistency_residual(state, trial_norm, dt, 0.0);
        let estimate = -g / dg;

        if estimate > 0.0 && estimate.is_finite() {
            Some(estimate)
        } else {
            None
        }
    }


    /**
     * Solve `g(dgamma) = |s_trial| - sqrt(2/3) sigma_y(dgamma) - 2 mu dgamma = 0`
     * by Newton iteration from `initial`. Iteration stops when `|g|` or the
     * change in `dgamma` falls below the tolerance, or after
     * `MAX_NEWTON_ITERATIONS`, in which case the last iterate is returned
     * with `converged == false`.
     */
    pub fn newton_delta_gamma(&self, state: &PlasticityState, trial_norm: f64, dt: f64, initial: f64) -> NewtonSolution {
        let tolerance = dt.min(self.config.tolerance);
        let mut delta_gamma = initial;
        let mut iterations = 0;

        while iterations < MAX_NEWTON_ITERATIONS {
            let (g, dg) = self.consistency_residual(state, trial_norm, dt, delta_gamma);

            if g.abs() <= tolerance {
                return NewtonSolution { delta_gamma, iterations, converged: true };
            }
            let next = (delta_gamma - g / dg).max(0.0);
            let change = (next - delta_gamma).abs();
            delta_gamma = next;
            iterations += 1;

            if change < tolerance || !delta_gamma.is_finite() {
                return NewtonSolution { delta_gamma, iterations, converged: delta_gamma.is_finite() };
            }
        }
        NewtonSolution { delta_gamma, iterations, converged: false }
    }


    /**
     * The consistency function and its derivative with respect to the
     * consistency parameter.
     */
    fn consistency_residual(&self, state: &PlasticityState, trial_norm: f64, dt: f64, delta_gamma: f64) -> (f64, f64) {
        let flow = &self.config.flow_stress;
        let s = self.state_at(state, delta_gamma, dt);
        let mu = state.shear_modulus;

        let g = trial_norm - SQRT_TWO_THIRDS * flow.flow_stress(&s) - 2.0 * mu * delta_gamma;
        let dg = -2.0 / 3.0 * (flow.d_flow_stress_d_plastic_strain_rate(&s) / dt + flow.d_flow_stress_d_plastic_strain(&s)) - 2.0 * mu;
        (g, dg)
    }


    /**
     * The state after a plastic step with consistency parameter
     * `delta_gamma`, starting from the plastic strain in `state`.
     */
    fn state_at(&self, state: &PlasticityState, delta_gamma: f64, dt: f64) -> PlasticityState {
        PlasticityState {
            plastic_strain: state.plastic_strain + SQRT_TWO_THIRDS * delta_gamma,
            plastic_strain_rate: SQRT_TWO_THIRDS * delta_gamma / dt,
            ..*state
        }
    }
}




/**
 * Apply an erosion algorithm to the stress of a localized particle.
 */
fn erode(stress: DMat3, algorithm: ErosionAlgorithm, pressure: f64) -> DMat3 {
    match algorithm {
        ErosionAlgorithm::None => stress,
        ErosionAlgorithm::AllowNoTension => if pressure < 0.0 { DMat3::ZERO } else { stress },
        ErosionAlgorithm::AllowNoShear => DMat3::IDENTITY * -pressure,
        ErosionAlgorithm::ZeroStress => DMat3::ZERO,
    }
}
