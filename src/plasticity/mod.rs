//! Hypoelastic-plastic stress update for material points.
//!
//! Each particle's stress is advanced by an elastic predictor and, when the
//! trial stress leaves the yield surface, a radial return onto it. The
//! flow stress, yield condition, shear modulus, melting temperature,
//! equation of state, damage, porosity, and erosion behaviors are each
//! selected at configuration time from the variants in [`models`].

pub mod models;
pub mod radial_return;
pub mod state;
pub mod tensor;

pub use radial_return::{Phase, RadialReturn, SoftFailure, StepOutcome, StepStats, StressUpdate};
pub use state::{Particle, PlasticityState};
