use crate::error::{Error, Result};
use crate::index_space::{Index3, IndexSpace};
use crate::num_vec::Vector3;
use crate::patch::Patch;




/**
 * A uniform rectilinear mesh level. Cell `(i, j, k)` of the level has its
 * center at `anchor + (index + 0.5) * dx`. All levels of a hierarchy share
 * the same physical anchor, so cell index zero on every level begins at the
 * low corner of the physical domain.
 */
#[derive(Clone, Debug)]
pub struct Level {
    index: usize,
    dx: Vector3,
    anchor: Vector3,
    refinement_ratio: Index3,
    domain: IndexSpace,
    extra_cells: i64,
}




// ============================================================================
impl Level {


    pub fn new(index: usize, dx: Vector3, anchor: Vector3, refinement_ratio: Index3, domain: IndexSpace, extra_cells: i64) -> Self {
        Self {
            index,
            dx,
            anchor,
            refinement_ratio,
            domain,
            extra_cells,
        }
    }


    /**
     * The position of this level in its hierarchy (0 is coarsest).
     */
    pub fn index(&self) -> usize {
        self.index
    }


    pub fn cell_spacing(&self) -> Vector3 {
        self.dx
    }


    pub fn anchor(&self) -> Vector3 {
        self.anchor
    }


    /**
     * The refinement ratio of this level relative to the next coarser one.
     * It is `(1, 1, 1)` on the coarsest level.
     */
    pub fn refinement_ratio(&self) -> Index3 {
        self.refinement_ratio
    }


    /**
     * Return the interior cells of the physical domain on this level.
     */
    pub fn domain(&self) -> &IndexSpace {
        &self.domain
    }


    /**
     * Return the domain including the layer of boundary ("extra") cells,
     * which hold wall properties.
     */
    pub fn domain_with_extra_cells(&self) -> IndexSpace {
        self.domain.extend_all(self.extra_cells)
    }


    pub fn cell_center(&self, index: Index3) -> Vector3 {
        let (i, j, k) = index;
        Vector3::new(
            self.anchor[0] + self.dx[0] * (i as f64 + 0.5),
            self.anchor[1] + self.dx[1] * (j as f64 + 0.5),
            self.anchor[2] + self.dx[2] * (k as f64 + 0.5))
    }


    /**
     * Return the position of the lower-left-back corner of a cell.
     */
    pub fn cell_low_corner(&self, index: Index3) -> Vector3 {
        let (i, j, k) = index;
        Vector3::new(
            self.anchor[0] + self.dx[0] * i as f64,
            self.anchor[1] + self.dx[1] * j as f64,
            self.anchor[2] + self.dx[2] * k as f64)
    }


    /**
     * Return the index of the cell containing a physical position.
     */
    pub fn cell_containing(&self, position: Vector3) -> Index3 {
        let f = |n: usize| ((position[n] - self.anchor[n]) / self.dx[n]).floor() as i64;
        (f(0), f(1), f(2))
    }


    /**
     * Map a cell index on this level to the index of the enclosing cell on
     * the next coarser level.
     */
    pub fn map_cell_to_coarser(&self, index: Index3) -> Index3 {
        let r = self.refinement_ratio;
        (index.0.div_euclid(r.0), index.1.div_euclid(r.1), index.2.div_euclid(r.2))
    }


    /**
     * Decompose the domain interior into patches of (at most) the given
     * size. Patch ids are assigned consecutively starting at `first_id`.
     */
    pub fn decompose(&self, patch_size: Index3, first_id: usize) -> Vec<Patch> {
        let (i0, j0, k0) = self.domain.start();
        let (i1, j1, k1) = self.domain.end();
        let blocks = |a: i64, b: i64, s: i64| (a..b).step_by(s as usize).map(move |x| x..(x + s).min(b));
        let mut patches = Vec::new();

        for di in blocks(i0, i1, patch_size.0) {
            for dj in blocks(j0, j1, patch_size.1) {
                for dk in blocks(k0, k1, patch_size.2) {
                    let id = first_id + patches.len();
                    patches.push(Patch::new(id, self.index, IndexSpace::new(di.clone(), dj.clone(), dk)));
                }
            }
        }
        patches
    }
}




/**
 * An ordered collection of levels, coarsest first. Levels are immutable
 * while rays traverse them; traversal code holds the hierarchy by shared
 * reference and addresses levels by integer index.
 */
#[derive(Clone, Debug)]
pub struct GridHierarchy {
    levels: Vec<Level>,
}




// ============================================================================
impl GridHierarchy {


    /**
     * Build a hierarchy of levels nested over the same physical box. The
     * coarsest level has `coarse_cells` cells per axis, and each subsequent
     * level is refined by the corresponding entry of `ratios`. Every level
     * carries one layer of extra cells.
     */
    pub fn nested(lower: Vector3, upper: Vector3, coarse_cells: Index3, ratios: &[Index3]) -> Result<Self> {
        if coarse_cells.0 <= 0 || coarse_cells.1 <= 0 || coarse_cells.2 <= 0 {
            return Err(Error::InvalidConfig {
                key: "resolution".to_string(),
                reason: format!("non-positive cell count {:?}", coarse_cells),
            });
        }
        let extent = upper - lower;

        if !(extent[0] > 0.0 && extent[1] > 0.0 && extent[2] > 0.0) {
            return Err(Error::InvalidConfig {
                key: "domain".to_string(),
                reason: "upper corner must exceed lower corner on every axis".to_string(),
            });
        }
        let mut levels = Vec::new();
        let mut cells = coarse_cells;
        let mut ratio = (1, 1, 1);

        for n in 0..=ratios.len() {
            if n > 0 {
                ratio = ratios[n - 1];
                if ratio.0 < 1 || ratio.1 < 1 || ratio.2 < 1 {
                    return Err(Error::InvalidConfig {
                        key: "refinement_ratio".to_string(),
                        reason: format!("ratio {:?} must be at least one on every axis", ratio),
                    });
                }
                cells = (cells.0 * ratio.0, cells.1 * ratio.1, cells.2 * ratio.2);
            }
            let dx = Vector3::new(
                extent[0] / cells.0 as f64,
                extent[1] / cells.1 as f64,
                extent[2] / cells.2 as f64);
            let domain = IndexSpace::new(0..cells.0, 0..cells.1, 0..cells.2);
            levels.push(Level::new(n, dx, lower, ratio, domain, 1));
        }
        Ok(Self { levels })
    }


    /**
     * Build a hierarchy with a single level.
     */
    pub fn single(lower: Vector3, upper: Vector3, cells: Index3) -> Result<Self> {
        Self::nested(lower, upper, cells, &[])
    }


    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }


    pub fn level(&self, index: usize) -> &Level {
        &self.levels[index]
    }


    pub fn finest(&self) -> &Level {
        &self.levels[self.levels.len() - 1]
    }


    pub fn coarsest(&self) -> &Level {
        &self.levels[0]
    }


    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }


    /**
     * Return the refinement ratio between level `fine` and level `coarse`
     * (the product of intervening ratios).
     */
    pub fn ratio_between(&self, coarse: usize, fine: usize) -> Index3 {
        self.levels[coarse + 1..=fine].iter().fold((1, 1, 1), |acc, level| {
            let r = level.refinement_ratio();
            (acc.0 * r.0, acc.1 * r.1, acc.2 * r.2)
        })
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::GridHierarchy;
    use crate::index_space::range3d;
    use crate::num_vec::Vector3;

    fn unit_box() -> (Vector3, Vector3) {
        (Vector3::splat(0.0), Vector3::splat(1.0))
    }

    #[test]
    fn nested_levels_have_consistent_spacing() {
        let (lo, hi) = unit_box();
        let grid = GridHierarchy::nested(lo, hi, (4, 4, 4), &[(2, 2, 2), (4, 4, 4)]).unwrap();
        assert_eq!(grid.num_levels(), 3);
        assert_eq!(grid.finest().domain(), &range3d(0..32, 0..32, 0..32));
        assert!((grid.finest().cell_spacing()[0] - 1.0 / 32.0).abs() < 1e-15);
        assert_eq!(grid.ratio_between(0, 2), (8, 8, 8));
        assert_eq!(grid.ratio_between(1, 1), (1, 1, 1));
    }

    #[test]
    fn cell_mapping_to_coarser_level_handles_extra_cells() {
        let (lo, hi) = unit_box();
        let grid = GridHierarchy::nested(lo, hi, (4, 4, 4), &[(2, 2, 2)]).unwrap();
        let fine = grid.finest();
        assert_eq!(fine.map_cell_to_coarser((5, 0, 7)), (2, 0, 3));
        assert_eq!(fine.map_cell_to_coarser((-1, 8, 3)), (-1, 4, 1));
    }

    #[test]
    fn cell_center_and_containing_cell_agree() {
        let (lo, hi) = unit_box();
        let grid = GridHierarchy::single(lo, hi, (10, 5, 2)).unwrap();
        let level = grid.finest();
        let index = (3, 4, 1);
        assert_eq!(level.cell_containing(level.cell_center(index)), index);
    }

    #[test]
    fn decomposition_tiles_the_domain() {
        let (lo, hi) = unit_box();
        let grid = GridHierarchy::single(lo, hi, (10, 8, 4)).unwrap();
        let patches = grid.finest().decompose((4, 4, 4), 0);
        assert_eq!(patches.len(), 3 * 2 * 1);
        assert_eq!(patches.iter().map(|p| p.index_space().len()).sum::<usize>(), 320);
        assert!(patches.iter().enumerate().all(|(n, p)| p.id() == n));
    }

    #[test]
    fn invalid_resolution_is_rejected() {
        let (lo, hi) = unit_box();
        assert!(GridHierarchy::single(lo, hi, (0, 4, 4)).is_err());
        assert!(GridHierarchy::single(hi, lo, (4, 4, 4)).is_err());
    }
}
