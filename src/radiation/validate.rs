use log::debug;
use crate::error::{Error, Result};
use crate::field_store::Label;
use crate::index_space::{Index3, IndexSpace};
use crate::patch::CellField;
use super::accumulator::LevelProperties;
use super::properties::{is_known_cell_type, FLOW};




/**
 * Check the radiative properties over a region before any rays are traced
 * through it. Absorption coefficients and emissive powers must be finite
 * and non-negative, and cell types must be recognized codes. When
 * reflections are enabled, every non-flow cell must absorb something, or a
 * ray in a transparent medium would reflect forever.
 *
 * This runs once per patch and level, so the per-ray loop never checks
 * values.
 */
pub fn validate_properties(
    properties: &LevelProperties,
    region: &IndexSpace,
    patch: usize,
    level: usize,
    allow_reflect: bool) -> Result<()>
{
    let non_physical = |quantity, value, cell| Error::NonPhysicalField { quantity, value, cell, patch, level };

    for cell in region.iter() {
        let abskg = properties.abskg[cell];
        let source = properties.sigma_t4_over_pi[cell];
        let code = properties.cell_type[cell];

        if !(abskg.is_finite() && abskg >= 0.0) {
            return Err(non_physical(Label::Abskg, abskg, cell));
        }
        if !(source.is_finite() && source >= 0.0) {
            return Err(non_physical(Label::SigmaT4OverPi, source, cell));
        }
        if !is_known_cell_type(code) {
            return Err(Error::UnknownCellType { value: code, cell, patch, level });
        }
        if allow_reflect && code != FLOW && abskg <= 0.0 {
            return Err(non_physical(Label::Abskg, abskg, cell));
        }
    }
    debug!("validated radiative properties on {} cells (patch {}, level {})", region.len(), patch, level);
    Ok(())
}




/**
 * Check that rays confined to `region` cannot walk out of it: every cell on
 * its outer layer must be a non-flow cell, so a ray stops or reflects there.
 * This applies to a level with no coarser level to move to.
 */
pub fn validate_enclosure(cell_type: &CellField<i32>, region: &IndexSpace, patch: usize, level: usize) -> Result<()> {
    let (i0, j0, k0) = region.start();
    let (i1, j1, k1) = region.end();
    let on_boundary = |(i, j, k): Index3| {
        i == i0 || i == i1 - 1 || j == j0 || j == j1 - 1 || k == k0 || k == k1 - 1
    };

    match region.iter().find(|&c| on_boundary(c) && cell_type[c] == FLOW) {
        Some(cell) => Err(Error::OpenBoundary { cell, patch, level }),
        None => Ok(()),
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::index_space::range3d;
    use crate::radiation::properties::WALL;

    fn fields() -> (CellField<f64>, CellField<f64>, CellField<i32>) {
        let space = range3d(-1..3, -1..3, -1..3);
        let interior = range3d(0..2, 0..2, 0..2);
        let cell_type = CellField::from_function(space.clone(), |c| if interior.contains(c) { FLOW } else { WALL });
        (CellField::filled(space.clone(), 0.5), CellField::filled(space, 1.0), cell_type)
    }

    #[test]
    fn finite_properties_pass() {
        let (abskg, sigma_t4_over_pi, cell_type) = fields();
        let props = LevelProperties { abskg: &abskg, sigma_t4_over_pi: &sigma_t4_over_pi, cell_type: &cell_type };
        assert!(validate_properties(&props, abskg.index_space(), 0, 0, true).is_ok());
    }

    #[test]
    fn nan_absorption_is_reported_with_its_location() {
        let (mut abskg, sigma_t4_over_pi, cell_type) = fields();
        abskg[(1, 0, 1)] = f64::NAN;
        let props = LevelProperties { abskg: &abskg, sigma_t4_over_pi: &sigma_t4_over_pi, cell_type: &cell_type };

        match validate_properties(&props, abskg.index_space(), 3, 1, true) {
            Err(Error::NonPhysicalField { quantity, cell, patch, level, .. }) => {
                assert_eq!(quantity, Label::Abskg);
                assert_eq!(cell, (1, 0, 1));
                assert_eq!((patch, level), (3, 1));
            }
            other => panic!("expected a non-physical field error, got {:?}", other),
        }
    }

    #[test]
    fn infinite_emission_and_unknown_codes_are_rejected() {
        let (abskg, mut sigma_t4_over_pi, mut cell_type) = fields();
        sigma_t4_over_pi[(0, 0, 0)] = f64::INFINITY;
        cell_type[(2, 2, 2)] = 42;
        let props = LevelProperties { abskg: &abskg, sigma_t4_over_pi: &sigma_t4_over_pi, cell_type: &cell_type };

        assert!(matches!(
            validate_properties(&props, &range3d(0..1, 0..1, 0..1), 0, 0, true),
            Err(Error::NonPhysicalField { quantity: Label::SigmaT4OverPi, .. })));
        assert!(matches!(
            validate_properties(&props, &range3d(2..3, 2..3, 2..3), 0, 0, true),
            Err(Error::UnknownCellType { value: 42, .. })));
    }

    #[test]
    fn transparent_reflecting_walls_are_rejected() {
        let (mut abskg, sigma_t4_over_pi, cell_type) = fields();
        abskg[(-1, 0, 0)] = 0.0;
        let props = LevelProperties { abskg: &abskg, sigma_t4_over_pi: &sigma_t4_over_pi, cell_type: &cell_type };

        assert!(validate_properties(&props, abskg.index_space(), 0, 0, true).is_err());
        assert!(validate_properties(&props, abskg.index_space(), 0, 0, false).is_ok());
    }

    #[test]
    fn enclosed_regions_pass() {
        let (abskg, _, cell_type) = fields();
        assert!(validate_enclosure(&cell_type, abskg.index_space(), 0, 0).is_ok());
    }

    #[test]
    fn flow_cells_on_the_region_boundary_are_rejected() {
        let (abskg, _, mut cell_type) = fields();
        cell_type[(2, 1, 0)] = FLOW;

        match validate_enclosure(&cell_type, abskg.index_space(), 4, 2) {
            Err(Error::OpenBoundary { cell, patch, level }) => {
                assert_eq!(cell, (2, 1, 0));
                assert_eq!((patch, level), (4, 2));
            }
            other => panic!("expected an open boundary error, got {:?}", other),
        }
        assert!(validate_enclosure(&cell_type, &range3d(0..2, 0..2, 0..2), 0, 0).is_err());
        assert!(validate_enclosure(&cell_type, &range3d(-1..3, -1..3, 2..3), 0, 0).is_ok());
    }
}
