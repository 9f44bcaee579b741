#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::config::CompilerConfig;
    use crate::kinematic_traits::Leg;
    use crate::parameter_error::ParameterError;
    use crate::parameters::MechanismGeometry;
    use crate::waypoint::AmplitudeClamp;

    const READ_ERROR: &'static str = "Failed to load parameters from file";

    #[test]
    fn test_geometry_from_yaml() {
        let loaded = MechanismGeometry::from_yaml_file("src/tests/data/platform.yaml").expect(READ_ERROR);
        let expected = MechanismGeometry::solo_platform();

        assert_eq!(expected.home_position, loaded.home_position);
        assert_eq!(expected.attachment, loaded.attachment);
        assert_eq!(expected.base_mount, loaded.base_mount);
        assert_eq!(expected.hip_offset, loaded.hip_offset);
        assert_eq!(expected.upper_length, loaded.upper_length);
        assert_eq!(expected.lower_length, loaded.lower_length);
        assert_eq!(expected.sign_corrections, loaded.sign_corrections);
        // Home joints are written in degrees with four decimals
        for leg in Leg::ALL {
            let (a, b) = (expected.home_joints_of(leg), loaded.home_joints_of(leg));
            for i in 0..3 {
                assert_relative_eq!(a[i], b[i], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_geometry_yaml_round_trip() {
        let geometry = MechanismGeometry::solo_platform();
        let loaded = MechanismGeometry::from_yaml_str(&geometry.to_yaml()).expect(READ_ERROR);
        assert_eq!(geometry, loaded);
    }

    #[test]
    fn test_geometry_wrong_leg_count() {
        let result = MechanismGeometry::from_yaml_file("src/tests/data/platform_short_leg_list.yaml");
        match result {
            Err(ParameterError::InvalidLength { field, expected, found }) => {
                assert_eq!(field, "sign_corrections");
                assert_eq!((expected, found), (4, 3));
            }
            other => panic!("expected invalid length, got {:?}", other),
        }
    }

    #[test]
    fn test_geometry_missing_file() {
        let result = MechanismGeometry::from_yaml_file("src/tests/data/no_such_platform.yaml");
        assert!(matches!(result, Err(ParameterError::IoError(_))));
    }

    #[test]
    fn test_compiler_config_from_yaml() {
        let config = CompilerConfig::from_yaml_file("src/tests/data/compiler.yaml").expect(READ_ERROR);
        assert_eq!(config.frequency, 120.0);
        assert_eq!(config.settle_seconds, 1.0);
        assert_eq!(config.amplitude_clamp(), Some(AmplitudeClamp::new(30.0)));
        assert_relative_eq!(config.flip_threshold, 10.0_f64.to_radians(), epsilon = 1e-12);
        assert_eq!(config.ik.tolerance, 1e-7);
        assert_eq!(config.ik.max_iterations, 500);
        // Unspecified values keep their defaults
        assert_eq!(config.ik.max_step, 0.2);
        assert_eq!(config.gains.kp, 15.0);
        assert_eq!(config.gains.kd, 0.2);
        assert_eq!(config.tracking_tolerance, 0.05);
        assert_eq!(config.simulator.inertia, 0.02);
        assert_eq!(config.simulator.damping, 0.01);
    }

    #[test]
    fn test_compiler_config_rejects_unknown_and_invalid() {
        let unknown = CompilerConfig::from_yaml_str("frequency: 240.0\nsample_rate: 100.0\n");
        assert!(matches!(unknown, Err(ParameterError::ParseError(_))));

        let invalid = CompilerConfig::from_yaml_str("gains:\n  torque_saturation: -1.0\n");
        assert!(matches!(invalid, Err(ParameterError::InvalidValue(_))));
    }
}
