use core::ops::Range;




/**
 * Identifier for a Cartesian axis
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    I,
    J,
    K,
}




// ============================================================================
impl Axis {

    pub const ALL: [Axis; 3] = [Axis::I, Axis::J, Axis::K];

    /**
     * Return the array slot (0, 1, or 2) corresponding to this axis.
     */
    pub fn dim(self) -> usize {
        match self {
            Axis::I => 0,
            Axis::J => 1,
            Axis::K => 2,
        }
    }

    pub fn from_dim(dim: usize) -> Self {
        match dim {
            0 => Axis::I,
            1 => Axis::J,
            2 => Axis::K,
            _ => panic!("axis index {} out of range", dim),
        }
    }
}




/**
 * A cell index triple
 */
pub type Index3 = (i64, i64, i64);




/**
 * Represents a rectangular region in a discrete 3D index space
 */
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct IndexSpace {
    di: Range<i64>,
    dj: Range<i64>,
    dk: Range<i64>,
}




/**
 * Describes a rectangular index space. The index type is signed 64-bit integer.
 */
impl IndexSpace {


    pub fn new(di: Range<i64>, dj: Range<i64>, dk: Range<i64>) -> Self {

        assert!(
            di.start <= di.end && dj.start <= dj.end && dk.start <= dk.end,
            "index space has negative volume");

        Self { di, dj, dk }
    }


    /**
     * Return the number of indexes on each axis.
     */
    pub fn dim(&self) -> (usize, usize, usize) {
        ((self.di.end - self.di.start) as usize,
         (self.dj.end - self.dj.start) as usize,
         (self.dk.end - self.dk.start) as usize)
    }


    /**
     * Return the number of elements in this index space.
     */
    pub fn len(&self) -> usize {
        let (l, m, n) = self.dim();
        l * m * n
    }


    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    /**
     * Return the minimum index (inclusive).
     */
    pub fn start(&self) -> Index3 {
        (self.di.start, self.dj.start, self.dk.start)
    }


    /**
     * Return the maximum index (exclusive).
     */
    pub fn end(&self) -> Index3 {
        (self.di.end, self.dj.end, self.dk.end)
    }


    /**
     * Return the index range along one axis.
     */
    pub fn range(&self, axis: Axis) -> &Range<i64> {
        match axis {
            Axis::I => &self.di,
            Axis::J => &self.dj,
            Axis::K => &self.dk,
        }
    }


    /**
     * Determine whether this index space contains the given index.
     */
    pub fn contains(&self, index: Index3) -> bool {
        self.di.contains(&index.0) && self.dj.contains(&index.1) && self.dk.contains(&index.2)
    }


    /**
     * Determine whether another index space is a subset of this one.
     */
    pub fn contains_space(&self, other: &Self) -> bool {
        other.di.start >= self.di.start && other.di.end <= self.di.end &&
        other.dj.start >= self.dj.start && other.dj.end <= self.dj.end &&
        other.dk.start >= self.dk.start && other.dk.end <= self.dk.end
    }


    /**
     * Determine whether this index space shares any index with another one.
     */
    pub fn overlaps(&self, other: &Self) -> bool {
        self.intersect(other).map_or(false, |s| !s.is_empty())
    }


    /**
     * Return the overlapping part of two index spaces, or `None` if they are
     * disjoint.
     */
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let di = self.di.start.max(other.di.start) .. self.di.end.min(other.di.end);
        let dj = self.dj.start.max(other.dj.start) .. self.dj.end.min(other.dj.end);
        let dk = self.dk.start.max(other.dk.start) .. self.dk.end.min(other.dk.end);

        if di.start < di.end && dj.start < dj.end && dk.start < dk.end {
            Some(Self { di, dj, dk })
        } else {
            None
        }
    }


    /**
     * Expand this index space by the given number of elements on each axis.
     */
    pub fn extend_all(&self, delta: i64) -> Self {
        self.extend((delta, delta, delta))
    }


    /**
     * Expand this index space by a different number of elements on each
     * axis. Both the lower and upper sides are moved.
     */
    pub fn extend(&self, delta: Index3) -> Self {
        Self::new(
            self.di.start - delta.0 .. self.di.end + delta.0,
            self.dj.start - delta.1 .. self.dj.end + delta.1,
            self.dk.start - delta.2 .. self.dk.end + delta.2)
    }


    /**
     * Trim this index space by the given number of elements on each axis.
     */
    pub fn trim_all(&self, delta: i64) -> Self {
        self.extend_all(-delta)
    }


    /**
     * Increase the size of this index space by the given factor on each
     * axis. Every index of the coarse space becomes a block of
     * `factor.0 * factor.1 * factor.2` indexes.
     */
    pub fn refine_by(&self, factor: Index3) -> Self {
        Self::new(
            self.di.start * factor.0 .. self.di.end * factor.0,
            self.dj.start * factor.1 .. self.dj.end * factor.1,
            self.dk.start * factor.2 .. self.dk.end * factor.2)
    }


    /**
     * Return the smallest index space on a grid coarser by the given factor
     * which covers this one. Lower bounds round toward negative infinity and
     * upper bounds round toward positive infinity.
     */
    pub fn coarsen_by(&self, factor: Index3) -> Self {
        let ceil = |a: i64, b: i64| -(-a).div_euclid(b);
        Self::new(
            self.di.start.div_euclid(factor.0) .. ceil(self.di.end, factor.0),
            self.dj.start.div_euclid(factor.1) .. ceil(self.dj.end, factor.1),
            self.dk.start.div_euclid(factor.2) .. ceil(self.dk.end, factor.2))
    }


    /**
     * Return the linear offset for the given index, in a row-major memory
     * buffer aligned with the start of this index space.
     */
    pub fn row_major_offset(&self, index: Index3) -> usize {
        let i = (index.0 - self.di.start) as usize;
        let j = (index.1 - self.dj.start) as usize;
        let k = (index.2 - self.dk.start) as usize;
        let (_, m, n) = self.dim();
        (i * m + j) * n + k
    }


    /**
     * Return an iterator which traverses the index space in row-major order
     * (C-like; the final index increases fastest).
     */
    pub fn iter(&self) -> impl Iterator<Item = Index3> + '_ {
        self.di.clone().flat_map(move |i| {
            self.dj.clone().flat_map(move |j| self.dk.clone().map(move |k| (i, j, k)))
        })
    }
}




// ============================================================================
impl From<(Range<i64>, Range<i64>, Range<i64>)> for IndexSpace {
    fn from(range: (Range<i64>, Range<i64>, Range<i64>)) -> Self {
        Self::new(range.0, range.1, range.2)
    }
}

impl From<IndexSpace> for (Range<i64>, Range<i64>, Range<i64>) {
    fn from(space: IndexSpace) -> Self {
        (space.di, space.dj, space.dk)
    }
}




/**
 * Less imposing factory function to construct an IndexSpace object.
 */
pub fn range3d(di: Range<i64>, dj: Range<i64>, dk: Range<i64>) -> IndexSpace {
    IndexSpace::new(di, dj, dk)
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn iteration_is_row_major_and_matches_offsets() {
        let space = range3d(-1..2, 0..2, 3..5);
        for (n, index) in space.iter().enumerate() {
            assert_eq!(space.row_major_offset(index), n);
        }
        assert_eq!(space.iter().count(), space.len());
        assert_eq!(space.iter().next(), Some((-1, 0, 3)));
    }

    #[test]
    fn coarsening_covers_negative_indexes() {
        let space = range3d(-1..9, 0..8, 1..7);
        let coarse = space.coarsen_by((2, 2, 2));
        assert_eq!(coarse, range3d(-1..5, 0..4, 0..4));
        assert!(coarse.refine_by((2, 2, 2)).contains_space(&space));
    }

    #[test]
    fn intersection_of_disjoint_spaces_is_none() {
        let a = range3d(0..4, 0..4, 0..4);
        let b = range3d(4..8, 0..4, 0..4);
        let c = range3d(2..6, 1..3, -5..1);
        assert!(a.intersect(&b).is_none());
        assert_eq!(a.intersect(&c), Some(range3d(2..4, 1..3, 0..1)));
        assert!(a.overlaps(&c));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn extend_and_trim_are_inverse() {
        let a = range3d(0..4, 0..5, 0..6);
        assert_eq!(a.extend_all(2).trim_all(2), a);
        assert_eq!(a.extend((1, 0, 2)).dim(), (6, 5, 10));
    }
}
