use std::f64::consts::PI;
use log::debug;
use rand::distributions::Open01;
use rand::rngs::{StdRng, ThreadRng};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use crate::grid::Level;
use crate::index_space::{Axis, Index3};
use crate::num_vec::Vector3;




/**
 * Random number source for the rays of one cell: either a generator seeded
 * from the cell and ray indexes (reproducible, independent of thread
 * scheduling), or the calling worker thread's own generator.
 */
pub enum CellRng {
    Seeded(StdRng),
    Thread(ThreadRng),
}




// ============================================================================
impl CellRng {

    /**
     * Return the generator for one stream of a cell. In seeded mode, each
     * `(cell, stream)` pair yields the same sequence on every run.
     */
    pub fn new(random_seed: bool, cell: Index3, stream: u64) -> Self {
        if random_seed {
            CellRng::Thread(rand::thread_rng())
        } else {
            CellRng::Seeded(StdRng::seed_from_u64(cell_seed(cell, stream)))
        }
    }
}

impl RngCore for CellRng {
    fn next_u32(&mut self) -> u32 {
        match self {
            CellRng::Seeded(r) => r.next_u32(),
            CellRng::Thread(r) => r.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match self {
            CellRng::Seeded(r) => r.next_u64(),
            CellRng::Thread(r) => r.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match self {
            CellRng::Seeded(r) => r.fill_bytes(dest),
            CellRng::Thread(r) => r.fill_bytes(dest),
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        match self {
            CellRng::Seeded(r) => r.try_fill_bytes(dest),
            CellRng::Thread(r) => r.try_fill_bytes(dest),
        }
    }
}




/**
 * Deterministic 64-bit seed from a cell index and a stream (ray) number.
 * Every component goes through a SplitMix64 finalizer, so neighboring cells
 * and consecutive rays get unrelated seeds.
 */
pub fn cell_seed(cell: Index3, stream: u64) -> u64 {
    let mix = |mut z: u64| {
        z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    };
    let h = mix(cell.0 as u64);
    let h = mix(h ^ cell.1 as u64);
    let h = mix(h ^ cell.2 as u64);
    mix(h ^ stream)
}




/**
 * Draw a direction uniformly distributed over the unit sphere. A machine
 * epsilon is added to the polar cosine so that the z component is never
 * exactly zero.
 */
pub fn isotropic_direction<R: Rng + ?Sized>(rng: &mut R) -> Vector3 {
    let r1: f64 = rng.sample(Open01);
    let r2: f64 = rng.sample(Open01);
    direction_from_cosine(2.0 * r1 - 1.0 + f64::EPSILON, 2.0 * PI * r2)
}




/**
 * Draw a direction from the stratum `(bin_i, bin_j)` of an `n_rays` by
 * `n_rays` partition of (polar cosine, azimuth) space.
 */
pub fn hyper_cube_direction<R: Rng + ?Sized>(rng: &mut R, bin_i: usize, bin_j: usize, n_rays: usize) -> Vector3 {
    let r1: f64 = rng.sample(Open01);
    let r2: f64 = rng.sample(Open01);
    let n = n_rays as f64;
    let u = 2.0 * (r1 + bin_i as f64) / n - 1.0 + f64::EPSILON;
    let phi = 2.0 * PI * (r2 + bin_j as f64) / n;
    direction_from_cosine(u, phi)
}




/**
 * Return a random permutation of `0..n_rays`, used to pair polar strata
 * with azimuthal strata so that each appears exactly once per cell.
 */
pub fn hyper_cube_bins<R: Rng + ?Sized>(rng: &mut R, n_rays: usize) -> Vec<usize> {
    let mut bins: Vec<usize> = (0..n_rays).collect();
    bins.shuffle(rng);
    bins
}




fn direction_from_cosine(u: f64, phi: f64) -> Vector3 {
    let u = u.min(1.0).max(-1.0);
    let r = (1.0 - u * u).sqrt();
    Vector3::new(r * phi.cos(), r * phi.sin(), u)
}




/**
 * Return the starting point of a ray in the given cell: either the cell
 * center, or a uniformly random point within the cell.
 */
pub fn ray_origin<R: Rng + ?Sized>(rng: &mut R, level: &Level, cell: Index3, cc_rays: bool) -> Vector3 {
    if cc_rays {
        return level.cell_center(cell);
    }
    let dx = level.cell_spacing();
    let offset = Vector3::new(
        rng.gen::<f64>() * dx[0],
        rng.gen::<f64>() * dx[1],
        rng.gen::<f64>() * dx[2]);

    if (0..3).any(|d| !(offset[d] >= 0.0 && offset[d] <= dx[d])) {
        debug!("ray origin offset {:?} outside cell {:?}; using cell center", offset, cell);
        level.cell_center(cell)
    } else {
        level.cell_low_corner(cell) + offset
    }
}




/**
 * A face of a cell, identified by its normal axis and which side of the
 * cell it is on.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Face {
    XMinus,
    XPlus,
    YMinus,
    YPlus,
    ZMinus,
    ZPlus,
}




// ============================================================================
impl Face {

    pub const ALL: [Face; 6] = [Face::XMinus, Face::XPlus, Face::YMinus, Face::YPlus, Face::ZMinus, Face::ZPlus];

    pub fn axis(self) -> Axis {
        match self {
            Face::XMinus | Face::XPlus => Axis::I,
            Face::YMinus | Face::YPlus => Axis::J,
            Face::ZMinus | Face::ZPlus => Axis::K,
        }
    }

    /**
     * Return +1 for the high-side face of a cell and -1 for the low side.
     */
    pub fn side(self) -> i64 {
        match self {
            Face::XPlus | Face::YPlus | Face::ZPlus => 1,
            Face::XMinus | Face::YMinus | Face::ZMinus => -1,
        }
    }

    /**
     * Return the index of the cell across this face.
     */
    pub fn neighbor(self, cell: Index3) -> Index3 {
        let s = self.side();
        match self.axis() {
            Axis::I => (cell.0 + s, cell.1, cell.2),
            Axis::J => (cell.0, cell.1 + s, cell.2),
            Axis::K => (cell.0, cell.1, cell.2 + s),
        }
    }
}




/**
 * Draw a direction uniformly (in solid angle) over the hemisphere facing
 * back into the cell through `face`. Returns the direction and the cosine of
 * its angle to the inward normal.
 */
pub fn hemisphere_direction<R: Rng + ?Sized>(rng: &mut R, face: Face) -> (Vector3, f64) {
    let cos_theta: f64 = rng.sample(Open01);
    let phi = 2.0 * PI * rng.sample::<f64, _>(Open01);
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    let normal = -(face.side() as f64) * cos_theta;
    let (a, b) = (sin_theta * phi.cos(), sin_theta * phi.sin());

    let direction = match face.axis() {
        Axis::I => Vector3::new(normal, a, b),
        Axis::J => Vector3::new(a, normal, b),
        Axis::K => Vector3::new(a, b, normal),
    };
    (direction, cos_theta)
}




/**
 * Return a uniformly random point on the given face of a cell.
 */
pub fn face_origin<R: Rng + ?Sized>(rng: &mut R, level: &Level, cell: Index3, face: Face) -> Vector3 {
    let dx = level.cell_spacing();
    let corner = level.cell_low_corner(cell);
    let d = face.axis().dim();
    let mut offset = Vector3::new(
        rng.gen::<f64>() * dx[0],
        rng.gen::<f64>() * dx[1],
        rng.gen::<f64>() * dx[2]);
    offset[d] = if face.side() > 0 { dx[d] } else { 0.0 };
    corner + offset
}
