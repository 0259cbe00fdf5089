//! Closed families of material models. Each family is a sum type whose
//! variants carry their own parameters; the stress update dispatches with a
//! `match`, so every supported model is known at compile time.

use std::f64::consts::PI;
use serde::{Deserialize, Serialize};
use super::state::PlasticityState;




/**
 * Flow stress as a function of plastic strain, plastic strain rate and
 * temperature.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowStressModel {
    /// `sigma_y = yield_stress + hardening_modulus * eps_p`
    LinearHardening {
        yield_stress: f64,
        hardening_modulus: f64,
    },
    /// `sigma_y = (A + B eps_p^n) (1 + C ln(rate*)) (1 - T*^m)`
    JohnsonCook {
        a: f64,
        b: f64,
        c: f64,
        n: f64,
        m: f64,
        reference_strain_rate: f64,
        room_temperature: f64,
    },
}




// ============================================================================
impl FlowStressModel {


    pub fn flow_stress(&self, state: &PlasticityState) -> f64 {
        match *self {
            FlowStressModel::LinearHardening { yield_stress, hardening_modulus } => {
                yield_stress + hardening_modulus * state.plastic_strain
            }
            FlowStressModel::JohnsonCook { a, b, n, .. } => {
                let strain_part = a + b * state.plastic_strain.max(0.0).powf(n);
                strain_part * self.rate_part(state) * self.temperature_part(state)
            }
        }
    }


    pub fn d_flow_stress_d_plastic_strain(&self, state: &PlasticityState) -> f64 {
        match *self {
            FlowStressModel::LinearHardening { hardening_modulus, .. } => hardening_modulus,
            FlowStressModel::JohnsonCook { b, n, .. } => {
                let ep = state.plastic_strain;

                if ep <= 0.0 {
                    0.0
                } else {
                    b * n * ep.powf(n - 1.0) * self.rate_part(state) * self.temperature_part(state)
                }
            }
        }
    }


    pub fn d_flow_stress_d_plastic_strain_rate(&self, state: &PlasticityState) -> f64 {
        match *self {
            FlowStressModel::LinearHardening { .. } => 0.0,
            FlowStressModel::JohnsonCook { a, b, c, n, reference_strain_rate, .. } => {
                let strain_part = a + b * state.plastic_strain.max(0.0).powf(n);
                let rate = state.plastic_strain_rate / reference_strain_rate;

                let d_rate_part = if rate < 1.0 {
                    c * (1.0 + rate).powf(c - 1.0) / reference_strain_rate
                } else {
                    c / state.plastic_strain_rate
                };
                strain_part * d_rate_part * self.temperature_part(state)
            }
        }
    }


    /**
     * Johnson-Cook rate factor. Below the reference rate the logarithm is
     * replaced by `(1 + rate*)^C`, which stays positive as the rate goes to
     * zero.
     */
    fn rate_part(&self, state: &PlasticityState) -> f64 {
        match *self {
            FlowStressModel::JohnsonCook { c, reference_strain_rate, .. } => {
                let rate = state.plastic_strain_rate / reference_strain_rate;

                if rate < 1.0 {
                    (1.0 + rate).powf(c)
                } else {
                    1.0 + c * rate.ln()
                }
            }
            _ => 1.0,
        }
    }


    fn temperature_part(&self, state: &PlasticityState) -> f64 {
        match *self {
            FlowStressModel::JohnsonCook { m, room_temperature, .. } => {
                let t_star = (state.temperature - room_temperature) / (state.melting_temperature - room_temperature);

                if t_star < 0.0 {
                    1.0
                } else if t_star >= 1.0 {
                    0.0
                } else {
                    1.0 - t_star.powf(m)
                }
            }
            _ => 1.0,
        }
    }
}




/**
 * The yield function `Phi`; the state is elastic where `Phi <= 0`.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum YieldCondition {
    VonMises,
    /// Gurson-Tvergaard-Needleman, for porous metals.
    Gurson {
        q1: f64,
        q2: f64,
        q3: f64,
        /// Porosity at which void coalescence accelerates.
        critical_porosity: f64,
        /// Acceleration factor applied to porosity above the critical value.
        coalescence_factor: f64,
    },
}




// ============================================================================
impl YieldCondition {

    /**
     * Evaluate the yield function at the given equivalent stress, flow
     * stress, stress trace and porosity.
     */
    pub fn evaluate(&self, equivalent_stress: f64, flow_stress: f64, trace_stress: f64, porosity: f64) -> f64 {
        match *self {
            YieldCondition::VonMises => equivalent_stress - flow_stress,
            YieldCondition::Gurson { q1, q2, q3, critical_porosity, coalescence_factor } => {
                let f_star = if porosity <= critical_porosity {
                    porosity
                } else {
                    critical_porosity + coalescence_factor * (porosity - critical_porosity)
                };
                let ratio = equivalent_stress / flow_stress;
                let cosh = (q2 * trace_stress / (2.0 * flow_stress)).cosh();
                ratio * ratio + 2.0 * q1 * f_star * cosh - (1.0 + q3 * f_star * f_star)
            }
        }
    }
}




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShearModulusModel {
    Constant,
    /// Mechanical threshold stress temperature dependence,
    /// `mu = mu_0 - D / (exp(T_0 / T) - 1)`.
    Mts { mu_0: f64, d: f64, t_0: f64 },
}




impl ShearModulusModel {
    pub fn shear_modulus(&self, state: &PlasticityState) -> f64 {
        match *self {
            ShearModulusModel::Constant => state.initial_shear_modulus,
            ShearModulusModel::Mts { mu_0, d, t_0 } => {
                mu_0 - d / ((t_0 / state.temperature).exp() - 1.0)
            }
        }
    }
}




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeltingModel {
    Constant,
    /// Steinberg-Cochran-Guinan: the melting point rises under compression,
    /// `T_m = T_m0 exp(2a (1 - 1/eta)) eta^(2 (Gamma_0 - a - 1/3))`.
    SteinbergCochranGuinan { gamma_0: f64, a: f64 },
}




impl MeltingModel {
    pub fn melting_temperature(&self, state: &PlasticityState) -> f64 {
        match *self {
            MeltingModel::Constant => state.initial_melting_temperature,
            MeltingModel::SteinbergCochranGuinan { gamma_0, a } => {
                let eta = state.density / state.initial_density;
                let power = 2.0 * (gamma_0 - a - 1.0 / 3.0);
                state.initial_melting_temperature * (2.0 * a * (1.0 - 1.0 / eta)).exp() * eta.powf(power)
            }
        }
    }
}




/**
 * Equation of state for the pressure (positive in compression).
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EquationOfState {
    /// Rate form: `p += -K tr(D) dt`.
    Hypoelastic,
    /// Shock Hugoniot reference with a Gruneisen energy correction.
    MieGruneisen { c_0: f64, gamma_0: f64, s_alpha: f64 },
}




/**
 * The pressure from an equation of state, or the reason it could not be
 * evaluated.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EosPressure {
    Valid(f64),
    /// The compression is past the limit of the Hugoniot fit.
    OutOfRange,
}




impl EquationOfState {

    /**
     * Compute the pressure at the end of a step. `volumetric_rate` is
     * `tr(D)`, `internal_energy` is per unit mass.
     */
    pub fn pressure(&self, state: &PlasticityState, volumetric_rate: f64, dt: f64, internal_energy: f64) -> EosPressure {
        match *self {
            EquationOfState::Hypoelastic => {
                EosPressure::Valid(state.pressure - state.bulk_modulus * volumetric_rate * dt)
            }
            EquationOfState::MieGruneisen { c_0, gamma_0, s_alpha } => {
                let rho_0 = state.initial_density;
                let eta = 1.0 - rho_0 / state.density;
                let energy = gamma_0 * rho_0 * internal_energy;

                if eta <= 0.0 {
                    return EosPressure::Valid(rho_0 * c_0 * c_0 * eta + energy);
                }
                let denom = 1.0 - s_alpha * eta;

                if denom <= 0.0 {
                    EosPressure::OutOfRange
                } else {
                    let hugoniot = rho_0 * c_0 * c_0 * eta * (1.0 - 0.5 * gamma_0 * eta) / (denom * denom);
                    EosPressure::Valid(hugoniot + energy)
                }
            }
        }
    }
}




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DamageModel {
    None,
    /// Johnson-Cook cumulative damage, `D += d eps_p / eps_f`.
    JohnsonCook {
        d1: f64,
        d2: f64,
        d3: f64,
        d4: f64,
        d5: f64,
        reference_strain_rate: f64,
        room_temperature: f64,
    },
}




impl DamageModel {

    /**
     * Return the damage after a plastic strain increment, given the stress
     * triaxiality `sigma_m / sigma_eq`.
     */
    pub fn evolve(&self, damage: f64, state: &PlasticityState, plastic_strain_increment: f64, triaxiality: f64) -> f64 {
        match *self {
            DamageModel::None => damage,
            DamageModel::JohnsonCook { d1, d2, d3, d4, d5, reference_strain_rate, room_temperature } => {
                let rate = (state.plastic_strain_rate / reference_strain_rate).max(1.0);
                let t_star = ((state.temperature - room_temperature)
                    / (state.melting_temperature - room_temperature)).max(0.0);
                let failure_strain = (d1 + d2 * (d3 * triaxiality).exp()) * (1.0 + d4 * rate.ln()) * (1.0 + d5 * t_star);

                if failure_strain > 0.0 {
                    damage + plastic_strain_increment / failure_strain
                } else {
                    damage
                }
            }
        }
    }
}




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StabilityCheck {
    None,
    /// Drucker's postulate: a plastic step is unstable if the stress
    /// increment does negative work on the plastic strain increment.
    Drucker,
}




/**
 * Porosity evolution by void growth and strain-controlled nucleation.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PorosityModel {
    Constant,
    Evolving {
        /// Volume fraction of nucleating voids.
        nucleation_fraction: f64,
        /// Mean plastic strain of nucleation.
        nucleation_strain: f64,
        /// Standard deviation of the nucleation strain.
        nucleation_deviation: f64,
    },
}




impl PorosityModel {

    /**
     * Return the porosity after a plastic step with rate of deformation
     * trace `volumetric_rate`.
     */
    pub fn evolve(&self, porosity: f64, state: &PlasticityState, volumetric_rate: f64, dt: f64) -> f64 {
        match *self {
            PorosityModel::Constant => porosity,
            PorosityModel::Evolving { nucleation_fraction, nucleation_strain, nucleation_deviation } => {
                let growth = (1.0 - porosity) * volumetric_rate;
                let z = (state.plastic_strain - nucleation_strain) / nucleation_deviation;
                let nucleation = nucleation_fraction / (nucleation_deviation * (2.0 * PI).sqrt())
                    * (-0.5 * z * z).exp()
                    * state.plastic_strain_rate;
                (porosity + (growth + nucleation) * dt).max(0.0).min(1.0)
            }
        }
    }
}




/**
 * What happens to the stress of a particle which has already localized.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErosionAlgorithm {
    /// Keep the computed stress.
    None,
    /// Zero the stress if the particle is in tension.
    AllowNoTension,
    /// Keep only the hydrostatic part.
    AllowNoShear,
    ZeroStress,
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;

    fn state() -> PlasticityState {
        PlasticityState {
            plastic_strain: 0.1,
            plastic_strain_rate: 10.0,
            temperature: 600.0,
            initial_temperature: 294.0,
            density: 7900.0,
            initial_density: 7830.0,
            initial_shear_modulus: 8.0e10,
            bulk_modulus: 1.6e11,
            melting_temperature: 1793.0,
            initial_melting_temperature: 1793.0,
            specific_heat: 477.0,
            ..PlasticityState::default()
        }
    }

    fn johnson_cook() -> FlowStressModel {
        FlowStressModel::JohnsonCook {
            a: 7.92e8,
            b: 5.10e8,
            c: 0.014,
            n: 0.26,
            m: 1.03,
            reference_strain_rate: 1.0,
            room_temperature: 294.0,
        }
    }

    fn central_difference<F: Fn(f64) -> f64>(f: F, x: f64, h: f64) -> f64 {
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    #[test]
    fn johnson_cook_derivatives_match_finite_differences() {
        let model = johnson_cook();
        let s = state();

        let d_strain = central_difference(|ep| model.flow_stress(&PlasticityState { plastic_strain: ep, ..s }), s.plastic_strain, 1e-6);
        let d_rate = central_difference(|r| model.flow_stress(&PlasticityState { plastic_strain_rate: r, ..s }), s.plastic_strain_rate, 1e-4);

        assert!((model.d_flow_stress_d_plastic_strain(&s) - d_strain).abs() / d_strain.abs() < 1e-5);
        assert!((model.d_flow_stress_d_plastic_strain_rate(&s) - d_rate).abs() / d_rate.abs() < 1e-5);
    }

    #[test]
    fn johnson_cook_vanishes_at_melt() {
        let s = PlasticityState { temperature: 1800.0, ..state() };
        assert_eq!(johnson_cook().flow_stress(&s), 0.0);
    }

    #[test]
    fn gurson_reduces_to_von_mises_without_voids() {
        let gurson = YieldCondition::Gurson { q1: 1.5, q2: 1.0, q3: 2.25, critical_porosity: 0.05, coalescence_factor: 3.0 };
        assert!(gurson.evaluate(2.0e8, 3.0e8, -1.0e8, 0.0) < 0.0);
        assert!(gurson.evaluate(3.1e8, 3.0e8, -1.0e8, 0.0) > 0.0);
        assert!(gurson.evaluate(2.9e8, 3.0e8, 3.0e8, 0.04) > 0.0);
        assert!(YieldCondition::VonMises.evaluate(2.9e8, 3.0e8, 3.0e8, 0.04) < 0.0);
    }

    #[test]
    fn compression_raises_the_melting_point() {
        let model = MeltingModel::SteinbergCochranGuinan { gamma_0: 1.67, a: 1.3 };
        let s = state();
        assert!(model.melting_temperature(&s) > s.initial_melting_temperature);
        assert_eq!(MeltingModel::Constant.melting_temperature(&s), 1793.0);
    }

    #[test]
    fn mie_gruneisen_limits() {
        let eos = EquationOfState::MieGruneisen { c_0: 4570.0, gamma_0: 1.67, s_alpha: 1.49 };
        let compressed = eos.pressure(&state(), 0.0, 0.0, 0.0);
        let crushed = eos.pressure(&PlasticityState { density: 7830.0 * 4.0, ..state() }, 0.0, 0.0, 0.0);

        assert!(matches!(compressed, EosPressure::Valid(p) if p > 0.0));
        assert_eq!(crushed, EosPressure::OutOfRange);
    }

    #[test]
    fn nucleation_adds_porosity_near_the_mean_strain() {
        let model = PorosityModel::Evolving { nucleation_fraction: 0.1, nucleation_strain: 0.1, nucleation_deviation: 0.05 };
        let f = model.evolve(0.01, &state(), 0.0, 1.0e-3);
        assert!(f > 0.01);
        assert_eq!(PorosityModel::Constant.evolve(0.01, &state(), 1.0, 1.0), 0.01);
    }

    #[test]
    fn damage_accumulates_faster_under_tension() {
        let model = DamageModel::JohnsonCook {
            d1: 0.05, d2: 3.44, d3: -2.12, d4: 0.002, d5: 0.61,
            reference_strain_rate: 1.0,
            room_temperature: 294.0,
        };
        let tension = model.evolve(0.0, &state(), 0.01, 1.0);
        let compression = model.evolve(0.0, &state(), 0.01, -1.0);
        assert!(tension > compression);
    }
}
