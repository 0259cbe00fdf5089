use core::ops::{Index, IndexMut};
use rayon::prelude::*;
use crate::index_space::{Index3, IndexSpace};




/**
 * A patch is a rectangular subset of a level's index space. Patches tile a
 * level without overlapping, and are immutable for the duration of a run.
 * The patch itself owns no field data: cell-centered arrays covering the
 * patch (optionally with ghost cells) are held by the field store, and
 * kernels receive read or write views of them.
 */
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Patch {
    id: usize,
    level: usize,
    interior: IndexSpace,
}




// ============================================================================
impl Patch {

    pub fn new(id: usize, level: usize, interior: IndexSpace) -> Self {
        Self { id, level, interior }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /**
     * Return the index of the level this patch lives on (0 is coarsest).
     */
    pub fn level(&self) -> usize {
        self.level
    }

    /**
     * Return the interior cells of this patch, excluding any ghost cells.
     */
    pub fn index_space(&self) -> &IndexSpace {
        &self.interior
    }

    /**
     * Return the patch interior extended by the given number of ghost cells.
     */
    pub fn with_ghosts(&self, num_ghost: i64) -> IndexSpace {
        self.interior.extend_all(num_ghost)
    }
}




/**
 * A dense array of values mapped from a rectangular index space, stored in
 * row-major order. This is the concrete form of a cell-centered field
 * variable, like the absorption coefficient or the radiative flux
 * divergence.
 */
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CellField<T> {
    space: IndexSpace,
    data: Vec<T>,
}




// ============================================================================
impl<T: Copy> CellField<T> {


    /**
     * Generate a field covering the given index space, with every value set
     * to `value`.
     */
    pub fn filled(space: IndexSpace, value: T) -> Self {
        Self {
            data: vec![value; space.len()],
            space,
        }
    }


    /**
     * Generate a field covering the given index space, with values defined
     * from a closure.
     */
    pub fn from_function<F>(space: IndexSpace, f: F) -> Self
    where
        F: Fn(Index3) -> T
    {
        Self {
            data: space.iter().map(f).collect(),
            space,
        }
    }


    /**
     * Same as `from_function`, but the closure is evaluated for each index
     * in parallel on the Rayon thread pool. Each evaluation writes a
     * distinct slot, so no synchronization is needed.
     */
    pub fn from_par_function<F>(space: IndexSpace, f: F) -> Self
    where
        T: Send,
        F: Fn(Index3) -> T + Sync + Send
    {
        let indexes: Vec<_> = space.iter().collect();
        Self {
            data: indexes.into_par_iter().map(f).collect(),
            space,
        }
    }


    pub fn index_space(&self) -> &IndexSpace {
        &self.space
    }


    pub fn as_slice(&self) -> &[T] {
        &self.data
    }


    /**
     * Return the value at the given index, or `None` if the index is out of
     * range.
     */
    pub fn get(&self, index: Index3) -> Option<T> {
        if self.space.contains(index) {
            Some(self.data[self.space.row_major_offset(index)])
        } else {
            None
        }
    }


    /**
     * Iterate over (index, value) pairs in row-major order.
     */
    pub fn iter(&self) -> impl Iterator<Item = (Index3, T)> + '_ {
        self.space.iter().zip(self.data.iter().cloned())
    }


    /**
     * Copy the values from the given field into the overlapping region of
     * this one.
     */
    pub fn copy_from(&mut self, other: &Self) {
        if let Some(overlap) = self.space.intersect(&other.space) {
            for index in overlap.iter() {
                self[index] = other[index];
            }
        }
    }


    /**
     * Return a new field covering the given subset of this one.
     */
    pub fn extract(&self, space: IndexSpace) -> Self {
        assert!(
            self.space.contains_space(&space),
            "extracted region is not contained in the field");
        Self::from_function(space, |index| self[index])
    }


    fn validate_index(&self, index: Index3) {
        if !self.space.contains(index) {
            let (i0, j0, k0) = self.space.start();
            let (i1, j1, k1) = self.space.end();
            panic!("index ({} {} {}) out of range on field ({}..{} {}..{} {}..{})",
                index.0,
                index.1,
                index.2,
                i0, i1, j0, j1, k0, k1);
        }
    }
}




// ============================================================================
impl<T: Copy> Index<Index3> for CellField<T> {
    type Output = T;

    fn index(&self, index: Index3) -> &Self::Output {
        self.validate_index(index);
        &self.data[self.space.row_major_offset(index)]
    }
}

impl<T: Copy> IndexMut<Index3> for CellField<T> {
    fn index_mut(&mut self, index: Index3) -> &mut Self::Output {
        self.validate_index(index);
        let n = self.space.row_major_offset(index);
        &mut self.data[n]
    }
}
