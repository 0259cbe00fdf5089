use glam::DMat3;
use serde::{Deserialize, Serialize};




/**
 * The local state of one particle during its stress update. It is a plain
 * value on the stack of the update, rebuilt from the particle fields every
 * call and discarded afterward. The Newton iteration mutates the plastic
 * strain and its rate in place.
 */
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlasticityState {
    pub plastic_strain: f64,
    pub plastic_strain_rate: f64,
    /// Pressure, positive in compression.
    pub pressure: f64,
    pub temperature: f64,
    pub initial_temperature: f64,
    pub density: f64,
    pub initial_density: f64,
    pub shear_modulus: f64,
    pub initial_shear_modulus: f64,
    pub bulk_modulus: f64,
    pub yield_stress: f64,
    pub melting_temperature: f64,
    pub initial_melting_temperature: f64,
    pub porosity: f64,
    pub specific_heat: f64,
}




/**
 * Persistent per-particle fields read and written by the stress update.
 * The stress is stored in the current configuration; `rotation` is the
 * rotation part of the deformation gradient at the end of the last step,
 * used to move the stress into an unrotated frame.
 */
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub stress: DMat3,
    pub deformation_gradient: DMat3,
    pub rotation: DMat3,
    pub plastic_strain: f64,
    pub plastic_strain_rate: f64,
    pub damage: f64,
    pub porosity: f64,
    pub temperature: f64,
    /// Specific internal energy (J/kg).
    pub internal_energy: f64,
    /// Set once a failure criterion is met; never cleared.
    pub localized: bool,
}




// ============================================================================
impl Particle {

    /**
     * An undeformed, stress-free particle at the given temperature.
     */
    pub fn new(temperature: f64, porosity: f64) -> Self {
        Self {
            stress: DMat3::ZERO,
            deformation_gradient: DMat3::IDENTITY,
            rotation: DMat3::IDENTITY,
            plastic_strain: 0.0,
            plastic_strain_rate: 0.0,
            damage: 0.0,
            porosity,
            temperature,
            internal_energy: 0.0,
            localized: false,
        }
    }
}
