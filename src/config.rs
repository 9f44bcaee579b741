//! Tunable settings of a compilation run.

use serde::Deserialize;

use crate::ik_solver::IkConfig;
use crate::parameter_error::ParameterError;
use crate::simulator::SimulatorConfig;
use crate::validator::PdGains;
use crate::waypoint::AmplitudeClamp;

fn default_frequency() -> f64 { 240.0 }
fn default_settle_seconds() -> f64 { 2.0 }
fn default_flip_threshold() -> f64 { 0.2 }
fn default_tracking_tolerance() -> f64 { 0.1 }

/// Everything that is not mechanism geometry. All fields have defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Sample rate of the output trajectory, Hz.
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    /// Time the platform holds the home pose before the first waypoint, seconds. 0 disables.
    #[serde(default = "default_settle_seconds")]
    pub settle_seconds: f64,
    /// If set, waypoint position (mm) and angle (deg) magnitudes are clamped to this.
    #[serde(default)]
    pub amplitude_threshold: Option<f64>,
    /// Largest per-frame joint change not reported as a configuration flip, radians.
    #[serde(default = "default_flip_threshold")]
    pub flip_threshold: f64,
    #[serde(default)]
    pub ik: IkConfig,
    #[serde(default)]
    pub gains: PdGains,
    /// Joint tracking error above this is reported, radians.
    #[serde(default = "default_tracking_tolerance")]
    pub tracking_tolerance: f64,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            frequency: default_frequency(),
            settle_seconds: default_settle_seconds(),
            amplitude_threshold: None,
            flip_threshold: default_flip_threshold(),
            ik: IkConfig::default(),
            gains: PdGains::default(),
            tracking_tolerance: default_tracking_tolerance(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl CompilerConfig {
    /// Clamp to apply on waypoint input, if configured.
    pub fn amplitude_clamp(&self) -> Option<AmplitudeClamp> {
        self.amplitude_threshold.map(AmplitudeClamp::new)
    }

    /// Rejects settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(ParameterError::InvalidValue(format!(
                "frequency must be positive (got {})", self.frequency
            )));
        }
        if !self.settle_seconds.is_finite() || self.settle_seconds < 0.0 {
            return Err(ParameterError::InvalidValue(format!(
                "settle_seconds must be finite and non-negative (got {})", self.settle_seconds
            )));
        }
        if self.settle_seconds > 0.0 && self.settle_seconds * self.frequency < 1.0 {
            return Err(ParameterError::InvalidValue(format!(
                "settle_seconds {} is shorter than one frame at {} Hz", self.settle_seconds, self.frequency
            )));
        }
        if let Some(threshold) = self.amplitude_threshold {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(ParameterError::InvalidValue(format!(
                    "amplitude_threshold must be positive (got {})", threshold
                )));
            }
        }
        for (name, value) in [
            ("flip_threshold", self.flip_threshold),
            ("tracking_tolerance", self.tracking_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParameterError::InvalidValue(format!(
                    "{} must be positive (got {})", name, value
                )));
            }
        }
        self.ik.validate()?;
        self.gains.validate()?;
        self.simulator.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CompilerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frequency, 240.0);
        assert_eq!(config.ik.max_iterations, 10_000);
        assert_eq!(config.gains.torque_saturation, 2.0);
        assert!(config.amplitude_clamp().is_none());
    }

    #[test]
    fn test_invalid_values() {
        let config = CompilerConfig { frequency: 0.0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ParameterError::InvalidValue(_))));

        let config = CompilerConfig { settle_seconds: 0.001, ..Default::default() };
        assert!(config.validate().is_err());

        let config = CompilerConfig { amplitude_threshold: Some(-3.0), ..Default::default() };
        assert!(config.validate().is_err());

        let mut config = CompilerConfig::default();
        config.gains.kp = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_amplitude_clamp() {
        let config = CompilerConfig { amplitude_threshold: Some(25.0), ..Default::default() };
        assert_eq!(config.amplitude_clamp(), Some(AmplitudeClamp::new(25.0)));
    }
}
