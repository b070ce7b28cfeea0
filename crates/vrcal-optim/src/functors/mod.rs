//! Point-to-point fitting functors for the three transform families.
//!
//! Each functor borrows a matched pair of point slices and owns an
//! over-parameterized estimate of its transform. Rotations are kept as a raw
//! quaternion `q = (u, w)` and applied as the rotation of `q / |q|`:
//!
//! ```text
//! R(q) v = ((w² − |u|²) v + 2 (u·v) u + 2 w (u × v)) / |q|²
//! ```
//!
//! `R` is invariant to the length of `q`, so its gradient is tangent to the
//! unit sphere and a step never spends length on a direction that
//! `normalize` discards. `normalize` still projects the quaternion back to
//! unit length after every step.

mod projective;
mod rigid;
mod scaled_rigid;

pub use projective::ProjectiveFunctor;
pub use rigid::RigidFunctor;
pub use scaled_rigid::ScaledRigidFunctor;

use log::warn;
use vrcal_core::{Pt3, Quat, Real, Vec3};

/// Quadratic form `|q|² R(q) v`.
fn quadratic_rotate(u: &Vec3, w: Real, v: &Vec3) -> Vec3 {
    v * (w * w - u.norm_squared()) + u * (2.0 * u.dot(v)) + u.cross(v) * (2.0 * w)
}

/// Rotate `v` by the unit quaternion `q / |q|`. A zero quaternion acts as identity.
pub(crate) fn quat_rotate(q: &Quat, v: &Vec3) -> Vec3 {
    let n2 = q.norm_squared();
    if n2 == 0.0 {
        return *v;
    }
    quadratic_rotate(&q.imag(), q.scalar(), v) / n2
}

/// Gradient of `e · R(q) v` with respect to `(u, w)`; orthogonal to `q`.
pub(crate) fn quat_rotate_gradient(q: &Quat, v: &Vec3, e: &Vec3) -> (Vec3, Real) {
    let n2 = q.norm_squared();
    if n2 == 0.0 {
        return (Vec3::zeros(), 0.0);
    }
    let u = q.imag();
    let w = q.scalar();
    // Gradient of the quadratic form, then the quotient rule through 1/|q|².
    let du = (u * -e.dot(v) + v * e.dot(&u) + e * u.dot(v) + v.cross(e) * w) * 2.0;
    let dw = e.dot(&(v * w + u.cross(v))) * 2.0;
    let radial = 2.0 * e.dot(&quadratic_rotate(&u, w, v)) / n2;
    ((du - u * radial) / n2, (dw - w * radial) / n2)
}

/// Rescale `q` to unit length. A vanishing quaternion is reset to identity.
pub(crate) fn normalize_quat(q: &mut Quat) {
    let n = q.norm();
    if !(n.is_finite() && n > 0.0) {
        warn!("quaternion estimate collapsed (norm {}), resetting rotation", n);
        *q = Quat::identity();
    } else if n != 1.0 {
        *q /= n;
    }
}

/// Unit vector and length of `mapped − target`; the direction is zero when
/// the two points coincide.
pub(crate) fn residual(mapped: &Pt3, target: &Pt3) -> (Vec3, Real) {
    let e = mapped - target;
    let d = e.norm();
    if d > 0.0 {
        (e / d, d)
    } else {
        (Vec3::zeros(), 0.0)
    }
}
