use glam::DMat3;




/// Iteration cap for the polar decomposition.
const POLAR_MAX_ITERATIONS: usize = 50;




pub fn trace(m: &DMat3) -> f64 {
    m.x_axis.x + m.y_axis.y + m.z_axis.z
}




/**
 * The deviatoric (trace-free) part of a tensor.
 */
pub fn deviatoric(m: &DMat3) -> DMat3 {
    *m - DMat3::IDENTITY * (trace(m) / 3.0)
}




pub fn symmetric(m: &DMat3) -> DMat3 {
    (*m + m.transpose()) * 0.5
}




/**
 * The double contraction `a : b = a_ij b_ij`.
 */
pub fn contract(a: &DMat3, b: &DMat3) -> f64 {
    a.x_axis.dot(b.x_axis) + a.y_axis.dot(b.y_axis) + a.z_axis.dot(b.z_axis)
}




/**
 * The Frobenius norm `sqrt(m : m)`.
 */
pub fn norm(m: &DMat3) -> f64 {
    contract(m, m).sqrt()
}




/**
 * The von Mises equivalent stress, `sqrt(3/2 s : s)` for deviatoric part
 * `s` of the given stress.
 */
pub fn equivalent_stress(stress: &DMat3) -> f64 {
    (1.5 * contract(&deviatoric(stress), &deviatoric(stress))).sqrt()
}




/**
 * Split a deformation gradient into a rotation and a right stretch,
 * `F = R U`, by the Newton iteration `R <- (R + R^-T) / 2`. Returns `None`
 * if the determinant is not positive, since no proper rotation exists.
 */
pub fn polar_decomposition(f: &DMat3) -> Option<(DMat3, DMat3)> {
    if !(f.determinant() > 0.0) {
        return None;
    }
    let mut r = *f;

    for _ in 0..POLAR_MAX_ITERATIONS {
        let next = (r + r.inverse().transpose()) * 0.5;
        let change = norm(&(next - r));
        r = next;

        if change < 1e-14 {
            break;
        }
    }
    Some((r, r.transpose() * *f))
}
