use core::ops::{Add, Sub, Mul, Div, Neg, Index, IndexMut};




/**
 * A statically-sized numeric vector over a generic scalar data type T, which
 * supports arithmetic operations also supported by T.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector<T, const DIM: usize> {
    data: [T; DIM]
}




/**
 * Physical position or direction in 3D space
 */
pub type Vector3 = Vector<f64, 3>;




// ============================================================================
impl<T: Copy, const DIM: usize> Vector<T, DIM> {

    pub fn from_array(data: [T; DIM]) -> Self {
        Self { data }
    }

    pub fn as_array(&self) -> [T; DIM] {
        self.data
    }

    pub fn map<U: Copy + Default, F: Fn(T) -> U>(&self, f: F) -> Vector<U, DIM> {
        let mut data = [U::default(); DIM];

        for (i, x) in data.iter_mut().enumerate() {
            *x = f(self.data[i])
        }
        Vector { data }
    }
}




// ============================================================================
impl Vector3 {

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { data: [x, y, z] }
    }

    pub fn splat(a: f64) -> Self {
        Self { data: [a; 3] }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.data.iter().zip(other.data.iter()).map(|(a, b)| a * b).sum()
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /**
     * Component-wise reciprocal. Zero components become signed infinities,
     * following IEEE-754 division.
     */
    pub fn recip(&self) -> Self {
        self.map(|x| 1.0 / x)
    }

    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}




// ============================================================================
impl<T, U, V, const DIM: usize> Add<Vector<U, DIM>> for Vector<T, DIM>
where
    T: Copy + Add<U, Output = V>,
    U: Copy,
    V: Copy + Default
{
    type Output = Vector<V, DIM>;

    fn add(self, other: Vector<U, DIM>) -> Self::Output {
        let mut data = [V::default(); DIM];

        for (i, x) in data.iter_mut().enumerate() {
            *x = self[i].add(other[i])
        }
        Self::Output { data }
    }
}

impl<T, U, V, const DIM: usize> Sub<Vector<U, DIM>> for Vector<T, DIM>
where
    T: Copy + Sub<U, Output = V>,
    U: Copy,
    V: Copy + Default
{
    type Output = Vector<V, DIM>;

    fn sub(self, other: Vector<U, DIM>) -> Self::Output {
        let mut data = [V::default(); DIM];

        for (i, x) in data.iter_mut().enumerate() {
            *x = self[i].sub(other[i])
        }
        Self::Output { data }
    }
}

impl<T, U, V, const DIM: usize> Mul<U> for Vector<T, DIM>
where
    T: Copy + Mul<U, Output = V>,
    U: Copy,
    V: Copy + Default
{
    type Output = Vector<V, DIM>;

    fn mul(self, other: U) -> Self::Output {
        let mut data = [V::default(); DIM];

        for (i, x) in data.iter_mut().enumerate() {
            *x = self[i].mul(other)
        }
        Self::Output { data }
    }
}

impl<T, U, V, const DIM: usize> Div<U> for Vector<T, DIM>
where
    T: Copy + Div<U, Output = V>,
    U: Copy,
    V: Copy + Default
{
    type Output = Vector<V, DIM>;

    fn div(self, other: U) -> Self::Output {
        let mut data = [V::default(); DIM];

        for (i, x) in data.iter_mut().enumerate() {
            *x = self[i].div(other)
        }
        Self::Output { data }
    }
}

impl<T, const DIM: usize> Neg for Vector<T, DIM>
where
    T: Copy + Default + Neg<Output = T>
{
    type Output = Self;

    fn neg(self) -> Self::Output {
        let mut data = [T::default(); DIM];

        for (i, x) in data.iter_mut().enumerate() {
            *x = -self[i]
        }
        Self { data }
    }
}




// ============================================================================
impl<T, const DIM: usize> Index<usize> for Vector<T, DIM> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl<T, const DIM: usize> IndexMut<usize> for Vector<T, DIM> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.data[index]
    }
}
