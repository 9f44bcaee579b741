//! Hardcoded geometry of the built-in motion platform

use nalgebra::Vector3;

use crate::parameters::MechanismGeometry;

impl MechanismGeometry {
    /// Four-legged motion platform built from quadruped legs standing on a fixed base, each
    /// leg connected to the sensor platform through a ball joint.
    pub fn solo_platform() -> Self {
        MechanismGeometry {
            home_position: Vector3::new(0.0, 0.0, 0.25),
            attachment: Vector3::new(0.18165, 0.11889, 0.00673),
            base_mount: Vector3::new(0.1858, 0.0961, 0.0369),
            hip_offset: 0.0146,
            upper_length: 0.16,
            lower_length: 0.16,
            sign_corrections: [
                [1, 1, 1],
                [-1, -1, -1],
                [-1, -1, -1],
                [1, 1, 1],
            ],
            home_joints: [
                [-0.03720331288427462, 0.829007129122855, -1.6202734972969408],
                [0.034261802256937444, -0.8275962751091314, 1.617652654183728],
                [0.03734524762342967, -0.8291123597545643, 1.6206753705804764],
                [-0.03441818042258571, 0.8276649022998361, -1.6178770197057506],
            ],
        }
    }
}
