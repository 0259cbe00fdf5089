use thiserror::Error;
use crate::field_store::Label;
use crate::index_space::Index3;




/**
 * Result type alias using the crate `Error`.
 */
pub type Result<T> = std::result::Result<T, Error>;




/**
 * Fatal conditions that abort a run. Numerically recovered conditions (Newton
 * non-convergence, near-zero segment lengths) and soft failures which only
 * request a timestep restart are not represented here.
 */
#[derive(Error, Debug)]
pub enum Error {

    #[error("missing required configuration key: {0}")]
    MissingConfig(String),

    #[error("invalid configuration for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("periodic boundary conditions on axis {axis} are not supported by RMCRT")]
    PeriodicBoundary { axis: usize },

    #[error("non-physical {quantity} = {value} at cell {cell:?} (patch {patch}, level {level})")]
    NonPhysicalField {
        quantity: Label,
        value: f64,
        cell: Index3,
        patch: usize,
        level: usize,
    },

    #[error("unknown cell type code {value} at cell {cell:?} (patch {patch}, level {level})")]
    UnknownCellType {
        value: i32,
        cell: Index3,
        patch: usize,
        level: usize,
    },

    #[error("flow cell {cell:?} lies on the boundary of the traced region (patch {patch}, level {level}); rays would leave the loaded data")]
    OpenBoundary {
        cell: Index3,
        patch: usize,
        level: usize,
    },

    #[error("field {label} is not available on level {level}")]
    MissingField { label: Label, level: usize },

    #[error("field {label} on level {level} does not cover cells {start:?}..{end:?}")]
    FieldNotCovered {
        label: Label,
        level: usize,
        start: Index3,
        end: Index3,
    },

    #[error("field {label} on level {level} was already computed over an overlapping region")]
    FieldAlreadyPut { label: Label, level: usize },

    #[error("field {label} on level {level} holds a different value type")]
    FieldTypeMismatch { label: Label, level: usize },

    #[error("{what} of {cells} cells exceeds the supported limit of {limit}")]
    RegionTooLarge { what: String, cells: i64, limit: i64 },

    #[error("negative deformation gradient jacobian {jacobian} on particle {particle}")]
    NegativeJacobian { particle: usize, jacobian: f64 },

    #[error("plastic consistency solve produced NaN on particle {particle}")]
    NewtonNaN { particle: usize },

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
