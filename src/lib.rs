//! Reverse Monte Carlo ray tracing (RMCRT) for radiative heat transfer on
//! structured, multi-level grids, together with an elastic-plastic stress
//! update for material points.
//!
//! Grids are hierarchies of rectilinear levels divided into patches. Cell
//! data lives in a [`field_store::DataWarehouse`], keyed by label, level and
//! generation. The [`radiation`] module computes the divergence of the
//! radiative heat flux for every cell of a patch by tracing rays backward
//! through the absorbing medium, on one level or on a "data onion" of
//! successively coarser levels. The [`plasticity`] module advances particle
//! stresses by radial return.

pub mod config;
pub mod error;
pub mod field_store;
pub mod grid;
pub mod index_space;
pub mod num_vec;
pub mod patch;
pub mod plasticity;
pub mod radiation;

pub use error::{Error, Result};
