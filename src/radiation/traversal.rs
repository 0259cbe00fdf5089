use crate::grid::{GridHierarchy, Level};
use crate::index_space::{Axis, Index3, IndexSpace};
use crate::num_vec::Vector3;




/// Segments shorter than this (in meters) are lengthened to it. Rays which
/// start exactly on a cell face otherwise produce zero-length segments.
pub const FUZZ: f64 = 1.0e-12;




/**
 * One step of a ray through the grid: the ray crossed a face normal to
 * `axis`, having traveled `length` through `prev_cell` on level
 * `prev_level`, and is now in `cell` on level `level`.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub axis: Axis,
    pub prev_cell: Index3,
    pub prev_level: usize,
    pub cell: Index3,
    pub level: usize,
    pub length: f64,
}




/**
 * Incremental voxel traversal state for a single ray. Parametric distances
 * are measured from the start of the current leg (`origin`), which moves to
 * the ray's current position whenever the direction changes or the ray
 * crosses to a coarser level. Every call to `advance` steps exactly one axis,
 * the one with the smallest distance to its next face.
 */
#[derive(Clone, Debug)]
pub struct RayMarch {
    origin: Vector3,
    direction: Vector3,
    inv_direction: Vector3,
    step: [i64; 3],
    sign: [f64; 3],
    t_max: [f64; 3],
    t_delta: [f64; 3],
    t_max_prev: f64,
    dx: Vector3,
    cell: Index3,
    level: usize,
    length: f64,
}




// ============================================================================
impl RayMarch {


    /**
     * Start a ray at `origin`, which must lie in (or on the boundary of)
     * `cell` of the given level. The direction is expected to have unit
     * length; components which are exactly zero never trigger a step on
     * that axis.
     */
    pub fn new(level: &Level, origin: Vector3, direction: Vector3, cell: Index3) -> Self {
        let mut march = Self {
            origin,
            direction,
            inv_direction: direction.recip(),
            step: [0; 3],
            sign: [0.0; 3],
            t_max: [0.0; 3],
            t_delta: [0.0; 3],
            t_max_prev: 0.0,
            dx: level.cell_spacing(),
            cell,
            level: level.index(),
            length: 0.0,
        };
        march.set_sign_and_step();
        march.set_distances(level);
        march
    }


    pub fn cell(&self) -> Index3 {
        self.cell
    }


    pub fn level(&self) -> usize {
        self.level
    }


    pub fn direction(&self) -> Vector3 {
        self.direction
    }


    /**
     * The total path length traveled so far, over all legs.
     */
    pub fn length(&self) -> f64 {
        self.length
    }


    /**
     * The ray's current position: the point where it entered its current
     * cell.
     */
    pub fn current_position(&self) -> Vector3 {
        self.origin + self.direction * self.t_max_prev
    }


    /**
     * Move to the next cell along the ray, and return the segment just
     * traversed. The axis with the smallest `t_max` is stepped; ties go to
     * the later axis of each comparison (X against Y, then the winner
     * against Z).
     */
    pub fn advance(&mut self) -> Segment {
        let prev_cell = self.cell;
        let prev_level = self.level;
        let t = &self.t_max;

        let d = if t[0] < t[1] {
            if t[0] < t[2] { 0 } else { 2 }
        } else {
            if t[1] < t[2] { 1 } else { 2 }
        };

        match d {
            0 => self.cell.0 += self.step[0],
            1 => self.cell.1 += self.step[1],
            _ => self.cell.2 += self.step[2],
        }
        let mut dis_min = self.t_max[d] - self.t_max_prev;

        if dis_min.abs() < FUZZ {
            dis_min = FUZZ;
        }
        self.t_max_prev = self.t_max[d];
        self.t_max[d] += self.t_delta[d];
        self.length += dis_min;

        Segment {
            axis: Axis::from_dim(d),
            prev_cell,
            prev_level,
            cell: self.cell,
            level: self.level,
            length: dis_min,
        }
    }


    /**
     * Advance the ray through a multi-level hierarchy. `regions[n]` is the
     * part of level `n` on which the ray may travel before moving to level
     * `n - 1`; `None` means the whole level. After the step, the ray is
     * coarsened for as long as it lies outside its level's region. A ray
     * never moves to a finer level.
     */
    pub fn advance_in(&mut self, grid: &GridHierarchy, regions: &[Option<IndexSpace>]) -> Segment {
        let mut segment = self.advance();

        while self.level > 0 && regions[self.level].as_ref().map_or(false, |r| !r.contains(self.cell)) {
            self.coarsen(grid);
            segment.cell = self.cell;
            segment.level = self.level;
        }
        segment
    }


    /**
     * Move the ray to the next coarser level, keeping its position. The cell
     * index is mapped with the refinement ratio, and the face distances are
     * recomputed from the coarse cell's geometry.
     */
    pub fn coarsen(&mut self, grid: &GridHierarchy) {
        assert!(self.level > 0, "cannot coarsen a ray on the coarsest level");

        let fine = grid.level(self.level);
        let coarse = grid.level(self.level - 1);

        self.rebase();
        self.cell = fine.map_cell_to_coarser(self.cell);
        self.level = coarse.index();
        self.dx = coarse.cell_spacing();
        self.set_distances(coarse);
    }


    /**
     * Mirror the ray about the face crossed by `segment`, after it stepped
     * into a cell it may not occupy (a wall). The ray returns to the cell it
     * left and continues with the direction component on that axis negated.
     * The remaining face distances carry over unchanged: the reflected ray
     * crosses the far face of that cell one `t_delta` after the crossing
     * point.
     */
    pub fn reflect(&mut self, grid: &GridHierarchy, segment: &Segment) {
        let d = segment.axis.dim();
        self.rebase();
        self.cell = self.prev_cell_on_current_level(grid, segment);
        self.step[d] = -self.step[d];
        self.sign[d] = 1.0 - self.sign[d];
        self.direction[d] = -self.direction[d];
        self.inv_direction[d] = -self.inv_direction[d];
    }


    /**
     * Continue the ray from its current position in a new direction. If the
     * step on the axis of the most recent crossing reverses, the ray is put
     * back into the cell it left, since it now moves away from the face it
     * just crossed.
     */
    pub fn redirect(&mut self, grid: &GridHierarchy, direction: Vector3, segment: &Segment) {
        let d = segment.axis.dim();
        let step_old = self.step[d];

        self.rebase();
        self.direction = direction;
        self.inv_direction = direction.recip();
        self.set_sign_and_step();

        if self.step[d] * step_old < 0 {
            self.cell = self.prev_cell_on_current_level(grid, segment);
        }
        self.set_distances(grid.level(self.level));
    }


    /**
     * The cell a segment started in, expressed on the ray's current level
     * (the segment may have begun on a finer level).
     */
    fn prev_cell_on_current_level(&self, grid: &GridHierarchy, segment: &Segment) -> Index3 {
        (self.level + 1..=segment.prev_level)
            .rev()
            .fold(segment.prev_cell, |cell, n| grid.level(n).map_cell_to_coarser(cell))
    }


    fn rebase(&mut self) {
        self.origin = self.current_position();

        for t in self.t_max.iter_mut() {
            *t -= self.t_max_prev;
        }
        self.t_max_prev = 0.0;
    }


    fn set_sign_and_step(&mut self) {
        for d in 0..3 {
            let positive = self.direction[d] > 0.0;
            self.sign[d] = if positive { 1.0 } else { 0.0 };
            self.step[d] = if positive { 1 } else { -1 };
        }
    }


    /**
     * Compute `t_max` (distance to the next face on each axis) from the leg
     * origin's offset within the current cell, and `t_delta` (distance to
     * cross one whole cell).
     */
    fn set_distances(&mut self, level: &Level) {
        let corner = level.cell_low_corner(self.cell);
        let dx = level.cell_spacing();

        for d in 0..3 {
            if self.direction[d] == 0.0 {
                self.t_max[d] = f64::INFINITY;
                self.t_delta[d] = f64::INFINITY;
            } else {
                let ray_dx = self.origin[d] - corner[d];
                self.t_max[d] = (self.sign[d] * dx[d] - ray_dx) * self.inv_direction[d];
                self.t_delta[d] = self.inv_direction[d].abs() * dx[d];
            }
        }
        self.t_max_prev = 0.0;
    }
}




/**
 * Single-level traversal as an unbounded iterator of segments. Callers stop
 * it with their own termination condition, e.g. `take_while` on the cell
 * type of the entered cell.
 */
impl Iterator for RayMarch {
    type Item = Segment;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.advance())
    }
}




/**
 * Return the distance from `origin` along `direction` to the boundary of
 * the box `[lo, hi]`, for an origin inside the box.
 */
pub fn distance_to_box_exit(origin: Vector3, direction: Vector3, lo: Vector3, hi: Vector3) -> f64 {
    (0..3)
        .filter(|&d| direction[d] != 0.0)
        .map(|d| {
            let face = if direction[d] > 0.0 { hi[d] } else { lo[d] };
            (face - origin[d]) / direction[d]
        })
        .fold(f64::INFINITY, f64::min)
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::grid::GridHierarchy;
    use crate::index_space::range3d;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn unit_grid(cells: i64) -> GridHierarchy {
        GridHierarchy::single(Vector3::splat(0.0), Vector3::splat(1.0), (cells, cells, cells)).unwrap()
    }

    fn random_unit_vector(rng: &mut StdRng) -> Vector3 {
        let u: f64 = rng.gen_range(-1.0..1.0);
        let phi: f64 = rng.gen_range(0.0..2.0 * std::f64::consts::PI);
        let r = (1.0 - u * u).sqrt();
        Vector3::new(r * phi.cos(), r * phi.sin(), u)
    }

    #[test]
    fn path_lengths_sum_to_box_exit_distance() {
        let grid = unit_grid(10);
        let level = grid.finest();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let origin = Vector3::new(rng.gen(), rng.gen(), rng.gen());
            let direction = random_unit_vector(&mut rng);
            let cell = level.cell_containing(origin);
            let march = RayMarch::new(level, origin, direction, cell);
            let mut total = 0.0;

            for s in march {
                total += s.length;

                if !level.domain().contains(s.cell) {
                    break;
                }
            }

            let expected = distance_to_box_exit(origin, direction, Vector3::splat(0.0), Vector3::splat(1.0));
            assert!((total - expected).abs() < 1e-9, "{} != {}", total, expected);
        }
    }

    #[test]
    fn axis_aligned_ray_never_steps_other_axes() {
        let grid = unit_grid(10);
        let level = grid.finest();
        let origin = level.cell_center((0, 5, 5));
        let march = RayMarch::new(level, origin, Vector3::new(1.0, 0.0, 0.0), (0, 5, 5));
        let segments: Vec<_> = march.take(10).collect();

        assert!(segments.iter().all(|s| s.axis == Axis::I));
        assert!((segments[0].length - 0.05).abs() < 1e-12);
        assert!((segments[1].length - 0.1).abs() < 1e-12);
        assert_eq!(segments[9].cell, (10, 5, 5));
    }

    #[test]
    fn exact_diagonal_ties_prefer_later_axis() {
        let grid = unit_grid(10);
        let level = grid.finest();
        let s = 1.0 / 3.0_f64.sqrt();
        let origin = level.cell_center((5, 5, 5));
        let march = RayMarch::new(level, origin, Vector3::new(s, s, s), (5, 5, 5));
        let axes: Vec<_> = march.take(3).map(|s| s.axis).collect();

        assert_eq!(axes, vec![Axis::K, Axis::J, Axis::I]);
    }

    #[test]
    fn origin_on_a_face_gives_fuzzed_segment() {
        let grid = unit_grid(10);
        let level = grid.finest();
        let origin = Vector3::new(0.5, 0.55, 0.55);
        let mut march = RayMarch::new(level, origin, Vector3::new(-1.0, 0.0, 0.0), (5, 5, 5));
        let first = march.advance();

        assert_eq!(first.length, FUZZ);
        assert_eq!(first.cell, (4, 5, 5));
        assert!((march.advance().length - 0.1).abs() < 1e-12);
    }

    #[test]
    fn reflected_ray_retraces_cells_and_lengths() {
        let grid = unit_grid(4);
        let level = grid.finest();
        let origin = level.cell_center((3, 1, 1));
        let mut march = RayMarch::new(level, origin, Vector3::new(1.0, 0.0, 0.0), (3, 1, 1));
        let exit = march.advance();
        assert_eq!(exit.cell, (4, 1, 1));

        march.reflect(&grid, &exit);
        assert_eq!(march.cell(), (3, 1, 1));
        assert_eq!(march.direction()[0], -1.0);

        let back = march.advance();
        assert_eq!(back.prev_cell, (3, 1, 1));
        assert_eq!(back.cell, (2, 1, 1));
        assert!((back.length - 0.25).abs() < 1e-12);
        assert!((march.length() - 0.375).abs() < 1e-12);
    }

    #[test]
    fn rays_coarsen_when_leaving_the_fine_region() {
        let grid = GridHierarchy::nested(Vector3::splat(0.0), Vector3::splat(1.0), (4, 4, 4), &[(2, 2, 2)]).unwrap();
        let fine = grid.finest();
        let regions = vec![None, Some(range3d(2..6, 2..6, 2..6))];
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let cell = (rng.gen_range(2..6), rng.gen_range(2..6), rng.gen_range(2..6));
            let origin = fine.cell_center(cell);
            let direction = random_unit_vector(&mut rng);
            let mut march = RayMarch::new(fine, origin, direction, cell);
            let mut total = 0.0;
            let mut coarsened = false;

            loop {
                let s = march.advance_in(&grid, &regions);
                total += s.length;

                if s.level == 0 {
                    coarsened = true;
                }
                if coarsened {
                    assert_eq!(s.level, 0);
                }
                if !grid.level(s.level).domain().contains(s.cell) {
                    break;
                }
            }
            let expected = distance_to_box_exit(origin, direction, Vector3::splat(0.0), Vector3::splat(1.0));
            assert!(coarsened);
            assert!((total - expected).abs() < 1e-9, "{} != {}", total, expected);
        }
    }

    #[test]
    fn scattered_ray_continues_from_current_position() {
        let grid = unit_grid(10);
        let level = grid.finest();
        let origin = level.cell_center((5, 5, 5));
        let mut march = RayMarch::new(level, origin, Vector3::new(1.0, 0.0, 0.0), (5, 5, 5));
        let s = march.advance();
        march.redirect(&grid, Vector3::new(-1.0, 0.0, 0.0), &s);

        assert_eq!(march.cell(), (5, 5, 5));
        let back = march.advance();
        assert_eq!(back.cell, (4, 5, 5));
        assert!((back.length - 0.1).abs() < 1e-12);
        assert!((march.current_position()[0] - 0.5).abs() < 1e-12);
    }
}
