use nalgebra::{Matrix3, Vector3};
use nalgebra::linalg::SVD;

use crate::kinematic_traits::{LegJoints, LegKinematics};

/// Position Jacobian of one leg at a given joint configuration.
pub struct Jacobian {
    /// A 3x3 matrix mapping joint velocities to the ball joint linear velocity.
    /// Each column corresponds to a joint, each row to a base frame axis.
    matrix: Matrix3<f64>,

    /// The disturbance value used for computing the Jacobian
    epsilon: f64,
}

impl Jacobian {
    /// Computes the Jacobian of `leg` at `qs` by forward finite differences.
    pub fn new(leg: &impl LegKinematics, qs: &LegJoints, epsilon: f64) -> Self {
        let matrix = compute_jacobian(leg, qs, epsilon);
        Self { matrix, epsilon }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Damped least squares step towards reducing the position `error`:
    /// `(J^T J + λ² I) Δq = J^T e`. Stays bounded near singular configurations.
    pub fn damped_step(&self, error: &Vector3<f64>, damping: f64) -> LegJoints {
        let jt = self.matrix.transpose();
        let normal = jt * self.matrix + Matrix3::identity() * (damping * damping);
        let rhs = jt * error;
        let step = match normal.cholesky() {
            Some(cholesky) => cholesky.solve(&rhs),
            None => {
                // Only reachable with zero damping at an exact singularity
                let svd = SVD::new(normal, true, true);
                svd.solve(&rhs, self.epsilon).unwrap_or_else(|_| Vector3::zeros())
            }
        };
        step.into()
    }
}

/// Computes the 3x3 position Jacobian of a leg at the given joint configuration by
/// perturbing one joint at a time.
pub fn compute_jacobian(leg: &impl LegKinematics, qs: &LegJoints, epsilon: f64) -> Matrix3<f64> {
    let mut jacobian = Matrix3::zeros();
    let current_position = leg.forward(qs);

    for i in 0..3 {
        let mut perturbed_qs = *qs;
        perturbed_qs[i] += epsilon;
        let delta_position = (leg.forward(&perturbed_qs) - current_position) / epsilon;
        jacobian.fixed_view_mut::<3, 1>(0, i).copy_from(&delta_position);
    }

    jacobian
}
