//! Turns sparse waypoints into a dense, uniformly sampled pose sequence.
//!
//! Each segment with duration `T` produces `floor(T * f)` samples placed at
//! `t = k / (n - 1)`, so the first sample is the segment start (the previous segment end)
//! and the last sample is exactly the target waypoint. Position and orientation
//! components are blended linearly and independently; orientation is not slerped.

use nalgebra::{Rotation3, Vector3};
use tracing::{debug, info, warn};

use crate::annotations::{AnnotatedPose, FrameFlags};
use crate::diagnostics::ContinuityCorrection;
use crate::error::{CompileError, Result};
use crate::orientation::Orientation;
use crate::waypoint::Waypoint;

/// Tolerance when checking if a supplied segment start matches the previous segment end.
const CONTINUITY_TOLERANCE: f64 = 1e-12;

/// Guards the sample count against `T * f` landing a rounding error below an integer.
const SAMPLE_COUNT_SLACK: f64 = 1e-9;

/// Upper bound on the samples of one segment, about 11.5 hours at 240 Hz.
pub const MAX_SEGMENT_SAMPLES: usize = 10_000_000;

/// One fully specified platform pose, position is the offset from the home position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub rotation: Rotation3<f64>,
}

impl Pose {
    pub fn new(position: Vector3<f64>, orientation: &Orientation) -> Self {
        Pose { position, rotation: orientation.rotation() }
    }

    /// The platform home pose: no offset, no rotation.
    pub fn home() -> Self {
        Pose { position: Vector3::zeros(), rotation: Rotation3::identity() }
    }

    pub fn approx_eq(&self, other: &Pose, tolerance: f64) -> bool {
        (self.position - other.position).norm() <= tolerance
            && (self.rotation.matrix() - other.rotation.matrix()).norm() <= tolerance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// The platform holds the home pose before real motion begins.
    Settle,
    /// Motion towards the waypoint with this index.
    Motion { waypoint: usize },
}

/// Frames covered by one segment of the trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSpan {
    pub kind: SegmentKind,
    /// Index of the first frame of the segment.
    pub first: usize,
    /// Number of frames in the segment, at least one.
    pub len: usize,
}

impl SegmentSpan {
    pub fn last(&self) -> usize {
        self.first + self.len - 1
    }
}

/// Dense pose sequence sampled at a fixed frequency. Frame 0 is the home pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    frequency: f64,
    poses: Vec<AnnotatedPose>,
    segments: Vec<SegmentSpan>,
    corrections: Vec<ContinuityCorrection>,
}

impl Trajectory {
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn poses(&self) -> &[AnnotatedPose] {
        &self.poses
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Time of the given frame, seconds from the start.
    pub fn time_of(&self, frame: usize) -> f64 {
        frame as f64 / self.frequency
    }

    pub fn segments(&self) -> &[SegmentSpan] {
        &self.segments
    }

    pub fn corrections(&self) -> &[ContinuityCorrection] {
        &self.corrections
    }

    pub fn start_pose(&self, segment: &SegmentSpan) -> &Pose {
        &self.poses[segment.first].pose
    }

    pub fn end_pose(&self, segment: &SegmentSpan) -> &Pose {
        &self.poses[segment.last()].pose
    }
}

/// Builds a [`Trajectory`] segment by segment, keeping the segment boundaries continuous.
pub struct Interpolator {
    frequency: f64,
    poses: Vec<AnnotatedPose>,
    segments: Vec<SegmentSpan>,
    corrections: Vec<ContinuityCorrection>,
    end_position: Vector3<f64>,
    end_orientation: Orientation,
    end_pose: Pose,
}

impl Interpolator {
    /// Starts at the home pose.
    pub fn new(frequency: f64) -> Result<Self> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(CompileError::malformed(None, format!(
                "sample frequency must be positive (got {})", frequency
            )));
        }
        Ok(Interpolator {
            frequency,
            poses: Vec::new(),
            segments: Vec::new(),
            corrections: Vec::new(),
            end_position: Vector3::zeros(),
            end_orientation: Orientation::default(),
            end_pose: Pose::home(),
        })
    }

    /// Number of samples a segment of this duration produces.
    pub fn sample_count(&self, duration: f64) -> usize {
        (duration * self.frequency + SAMPLE_COUNT_SLACK).floor() as usize
    }

    /// Holds the current pose for the given time. Zero seconds adds nothing.
    pub fn settle(&mut self, seconds: f64) -> Result<()> {
        if seconds == 0.0 {
            return Ok(());
        }
        let samples = self.sample_count(seconds);
        if !seconds.is_finite() || seconds < 0.0 || samples == 0 {
            return Err(CompileError::malformed(None, format!(
                "settle time {} s gives no samples at {} Hz", seconds, self.frequency
            )));
        }
        if samples > MAX_SEGMENT_SAMPLES {
            return Err(CompileError::malformed(None, format!(
                "settle time {} s exceeds {} samples at {} Hz", seconds, MAX_SEGMENT_SAMPLES, self.frequency
            )));
        }
        let (position, orientation) = (self.end_position, self.end_orientation);
        self.emit(SegmentKind::Settle, position, orientation, samples, FrameFlags::SETTLE);
        Ok(())
    }

    /// Appends the motion towards `waypoint`. If `local_start` is given and differs from
    /// the previous segment end, the previous end is used instead and the correction is
    /// recorded.
    pub fn push_segment(
        &mut self,
        index: usize,
        local_start: Option<(&Vector3<f64>, &Orientation)>,
        waypoint: &Waypoint,
    ) -> Result<()> {
        if !waypoint.duration.is_finite() || waypoint.duration <= 0.0 {
            return Err(CompileError::malformed(Some(index), format!(
                "duration must be positive (got {})", waypoint.duration
            )));
        }
        let samples = self.sample_count(waypoint.duration);
        if samples == 0 {
            return Err(CompileError::malformed(Some(index), format!(
                "duration {} s gives no samples at {} Hz", waypoint.duration, self.frequency
            )));
        }
        if samples > MAX_SEGMENT_SAMPLES {
            return Err(CompileError::malformed(Some(index), format!(
                "duration {} s exceeds {} samples at {} Hz", waypoint.duration, MAX_SEGMENT_SAMPLES, self.frequency
            )));
        }

        let mut extra = FrameFlags::NONE;
        if let Some((position, orientation)) = local_start {
            let supplied = Pose::new(*position, orientation);
            if !supplied.approx_eq(&self.end_pose, CONTINUITY_TOLERANCE) {
                warn!(segment = self.segments.len(), frame = self.poses.len(),
                    supplied = ?supplied.position, used = ?self.end_pose.position,
                    "segment start does not match the previous end, using the previous end");
                self.corrections.push(ContinuityCorrection {
                    segment: self.segments.len(),
                    frame: self.poses.len(),
                    supplied,
                    used: self.end_pose,
                });
                extra = FrameFlags::CONTINUITY_CORRECTED;
            }
        }

        self.emit(SegmentKind::Motion { waypoint: index }, waypoint.position, waypoint.orientation,
                  samples, extra);
        Ok(())
    }

    fn emit(&mut self, kind: SegmentKind, end_position: Vector3<f64>, end_orientation: Orientation,
            samples: usize, flags: FrameFlags) {
        let first = self.poses.len();
        let start_position = self.end_position;
        let start_orientation = self.end_orientation;
        let start_pose = self.end_pose;
        let end_pose = Pose::new(end_position, &end_orientation);
        let segment_flags = flags & FrameFlags::SETTLE;

        for k in 0..samples {
            let pose = if samples == 1 || k == samples - 1 {
                end_pose
            } else if k == 0 {
                start_pose
            } else {
                let t = k as f64 / (samples - 1) as f64;
                Pose::new(
                    start_position + (end_position - start_position) * t,
                    &start_orientation.lerp(&end_orientation, t),
                )
            };
            let flags = if k == 0 { flags | FrameFlags::SEGMENT_START } else { segment_flags };
            self.poses.push(AnnotatedPose { pose, flags });
        }

        debug!(segment = self.segments.len(), ?kind, first, samples, "segment interpolated");
        self.segments.push(SegmentSpan { kind, first, len: samples });
        self.end_position = end_position;
        self.end_orientation = end_orientation;
        self.end_pose = end_pose;
    }

    pub fn finish(self) -> Trajectory {
        info!(frames = self.poses.len(), segments = self.segments.len(),
            frequency = self.frequency, "waypoints interpolated");
        Trajectory {
            frequency: self.frequency,
            poses: self.poses,
            segments: self.segments,
            corrections: self.corrections,
        }
    }
}

/// Interpolates the waypoints starting from the home pose, with an optional settle
/// segment in front. Fails on the first malformed waypoint, without a partial result.
pub fn interpolate(waypoints: &[Waypoint], frequency: f64, settle_seconds: f64) -> Result<Trajectory> {
    if waypoints.is_empty() {
        return Err(CompileError::malformed(None, "at least one waypoint is required"));
    }
    let mut interpolator = Interpolator::new(frequency)?;
    interpolator.settle(settle_seconds)?;
    for (index, waypoint) in waypoints.iter().enumerate() {
        interpolator.push_segment(index, None, waypoint)?;
    }
    Ok(interpolator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn waypoint(z: f64, duration: f64) -> Waypoint {
        Waypoint::new(Vector3::new(0.0, 0.0, z), Orientation::default(), duration).unwrap()
    }

    #[test]
    fn test_sample_counts() {
        let trajectory = interpolate(&[waypoint(0.0, 2.0), waypoint(0.01, 3.0)], 240.0, 0.0).unwrap();
        assert_eq!(trajectory.len(), 1200);
        assert_eq!(trajectory.segments().len(), 2);
        assert_eq!(trajectory.segments()[1].first, 480);
        assert_eq!(trajectory.segments()[1].len, 720);
    }

    #[test]
    fn test_rejects_oversized_segment() {
        let result = interpolate(&[waypoint(0.0, 1.0), waypoint(0.01, 1e300)], 240.0, 0.0);
        assert!(matches!(result, Err(CompileError::MalformedWaypoint { index: Some(1), .. })));

        let result = interpolate(&[waypoint(0.01, 1.0)], 240.0, 1e300);
        assert!(matches!(result, Err(CompileError::MalformedWaypoint { index: None, .. })));

        // The cap itself is still accepted
        let interpolator = Interpolator::new(100.0).unwrap();
        assert_eq!(interpolator.sample_count(MAX_SEGMENT_SAMPLES as f64 / 100.0), MAX_SEGMENT_SAMPLES);
    }

    #[test]
    fn test_settle_segment() {
        let trajectory = interpolate(&[waypoint(0.01, 1.0)], 100.0, 2.0).unwrap();
        assert_eq!(trajectory.len(), 300);
        assert_eq!(trajectory.segments()[0].kind, SegmentKind::Settle);
        assert!(trajectory.poses()[..200].iter()
            .all(|p| p.flags.contains(FrameFlags::SETTLE) && p.pose == Pose::home()));
        assert!(!trajectory.poses()[200].flags.contains(FrameFlags::SETTLE));
    }

    #[test]
    fn test_linear_ramp_and_exact_end() {
        let trajectory = interpolate(&[waypoint(0.03, 0.5)], 240.0, 0.0).unwrap();
        let poses = trajectory.poses();
        assert_eq!(poses.len(), 120);
        assert_eq!(poses[0].pose, Pose::home());
        assert_eq!(poses[119].pose.position, Vector3::new(0.0, 0.0, 0.03));
        for k in 0..120 {
            assert_relative_eq!(poses[k].pose.position.z, 0.03 * k as f64 / 119.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_segment_boundaries_are_continuous() {
        let waypoints = [
            Waypoint::new(Vector3::new(0.01, 0.0, 0.0), Orientation::euler(0.0, 0.1, 0.0), 0.5).unwrap(),
            Waypoint::new(Vector3::new(0.0, 0.02, 0.0), Orientation::quaternion(0.0, 0.0, 0.1, 1.0).unwrap(), 0.25)
                .unwrap(),
            Waypoint::new(Vector3::new(0.0, 0.0, -0.01), Orientation::euler(0.05, 0.0, 0.0), 0.75).unwrap(),
        ];
        let trajectory = interpolate(&waypoints, 240.0, 0.5).unwrap();
        for pair in trajectory.segments().windows(2) {
            assert_eq!(trajectory.end_pose(&pair[0]), trajectory.start_pose(&pair[1]));
            assert!(trajectory.poses()[pair[1].first].flags.contains(FrameFlags::SEGMENT_START));
        }
    }

    #[test]
    fn test_component_wise_orientation() {
        let end = Waypoint::new(Vector3::zeros(), Orientation::euler(0.2, 0.0, 0.4), 1.0).unwrap();
        let trajectory = interpolate(&[end], 3.0, 0.0).unwrap();
        let middle = &trajectory.poses()[1].pose;
        assert_relative_eq!(middle.rotation.matrix(), Orientation::euler(0.1, 0.0, 0.2).rotation().matrix(),
            epsilon = 1e-15);
    }

    #[test]
    fn test_too_short_segment() {
        let result = interpolate(&[waypoint(0.0, 1.0), waypoint(0.0, 0.001)], 240.0, 0.0);
        assert!(matches!(result, Err(CompileError::MalformedWaypoint { index: Some(1), .. })));
        assert!(interpolate(&[], 240.0, 0.0).is_err());
    }

    #[test]
    fn test_single_sample_segment_is_end_pose() {
        let trajectory = interpolate(&[waypoint(0.0, 1.0), waypoint(0.02, 1.0 / 240.0)], 240.0, 0.0).unwrap();
        assert_eq!(trajectory.len(), 241);
        assert_eq!(trajectory.poses()[240].pose.position.z, 0.02);
    }

    #[test]
    fn test_continuity_correction() {
        let mut interpolator = Interpolator::new(10.0).unwrap();
        interpolator.push_segment(0, None, &waypoint(0.01, 1.0)).unwrap();
        let wrong_start = Vector3::new(0.0, 0.0, 0.5);
        interpolator.push_segment(1, Some((&wrong_start, &Orientation::default())), &waypoint(0.02, 1.0)).unwrap();
        let right_start = Vector3::new(0.0, 0.0, 0.02);
        interpolator.push_segment(2, Some((&right_start, &Orientation::default())), &waypoint(0.0, 1.0)).unwrap();
        let trajectory = interpolator.finish();

        assert_eq!(trajectory.corrections().len(), 1);
        let correction = &trajectory.corrections()[0];
        assert_eq!(correction.segment, 1);
        assert_eq!(correction.frame, 10);
        assert_eq!(correction.supplied.position, wrong_start);
        assert_eq!(trajectory.poses()[10].pose.position.z, 0.01);
        assert!(trajectory.poses()[10].flags.contains(FrameFlags::CONTINUITY_CORRECTED));
        assert!(!trajectory.poses()[20].flags.contains(FrameFlags::CONTINUITY_CORRECTED));
    }
}
