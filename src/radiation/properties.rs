use std::f64::consts::PI;
use crate::index_space::{Index3, IndexSpace};
use crate::patch::CellField;




/// Cell type code of cells rays may travel through.
pub const FLOW: i32 = -1;

/// Cell type code of domain boundary walls.
pub const WALL: i32 = 8;

/// Cell type code of solid objects embedded in the flow.
pub const INTRUSION: i32 = 10;

/// Stefan-Boltzmann constant (W / m^2 / K^4).
pub const STEFAN_BOLTZMANN: f64 = 5.67051e-8;




/**
 * Return true if the code is one of the recognized cell types.
 */
pub fn is_known_cell_type(code: i32) -> bool {
    matches!(code, FLOW | WALL | INTRUSION)
}




/**
 * Blackbody emissive power over π, `σ T^4 / π`, for every cell of a
 * temperature field.
 */
pub fn sigma_t4_over_pi(temperature: &CellField<f64>) -> CellField<f64> {
    CellField::from_function(temperature.index_space().clone(), |index| {
        STEFAN_BOLTZMANN * temperature[index].powi(4) / PI
    })
}




fn children(coarse: Index3, ratio: Index3) -> IndexSpace {
    let (i, j, k) = coarse;
    IndexSpace::new(
        i * ratio.0 .. (i + 1) * ratio.0,
        j * ratio.1 .. (j + 1) * ratio.1,
        k * ratio.2 .. (k + 1) * ratio.2)
}




/**
 * Restrict a fine field to the next coarser grid by averaging. Each coarse
 * cell takes the mean of those of its children that the fine field covers,
 * so partially covered cells at the edge of the field are still defined.
 */
pub fn coarsen_average(fine: &CellField<f64>, ratio: Index3) -> CellField<f64> {
    let space = fine.index_space();

    CellField::from_function(space.coarsen_by(ratio), |coarse| {
        let (sum, count) = children(coarse, ratio)
            .iter()
            .filter_map(|c| fine.get(c))
            .fold((0.0, 0), |(s, n), v| (s + v, n + 1));
        sum / count as f64
    })
}




/**
 * Restrict a cell type field to the next coarser grid. A coarse cell is
 * flow only if all of its covered children are; otherwise it takes the code
 * of its first non-flow child, so that walls are never averaged away.
 */
pub fn coarsen_cell_type(fine: &CellField<i32>, ratio: Index3) -> CellField<i32> {
    CellField::from_function(fine.index_space().coarsen_by(ratio), |coarse| {
        children(coarse, ratio)
            .iter()
            .filter_map(|c| fine.get(c))
            .find(|&code| code != FLOW)
            .unwrap_or(FLOW)
    })
}




/**
 * Prolong a coarse field onto a finer index space by piecewise-constant
 * injection. The coarse field must cover the coarsened fine space.
 */
pub fn refine_constant<T: Copy>(coarse: &CellField<T>, ratio: Index3, fine_space: IndexSpace) -> CellField<T> {
    CellField::from_function(fine_space, |(i, j, k)| {
        coarse[(i.div_euclid(ratio.0), j.div_euclid(ratio.1), k.div_euclid(ratio.2))]
    })
}
