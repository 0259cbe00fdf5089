//! Reverse Monte Carlo ray tracing (RMCRT) for radiative heat transfer.
//!
//! Rays are traced backward from each receiving cell through the
//! absorbing, emitting medium until their intensity falls below a threshold.
//! Traversal is a 3D incremental (DDA) walk over one or several grid levels;
//! multi-level ("data onion") runs let rays continue on coarser levels once
//! they leave the fine region of interest around their patch.

pub mod accumulator;
pub mod properties;
pub mod sampling;
pub mod solver;
pub mod traversal;
pub mod validate;

pub use accumulator::{CellRadiation, LevelProperties, RayStats, TraceContext};
pub use properties::{FLOW, INTRUSION, WALL};
pub use sampling::Face;
pub use solver::{BoundaryFlux, PatchReport, RmcrtSolver, TracePlan};
pub use traversal::{RayMarch, Segment};
