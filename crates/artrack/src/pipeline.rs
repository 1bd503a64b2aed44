use crate::{AppConfig, InteractionStateMachine};
use artrack_core::{CameraIntrinsics, MarkerObservation, Pose, RgbImageView, ViewProjectionPair};
use artrack_gesture::{FistTrigger, GestureDetector, GestureEvent};
use artrack_pose::{FrameConverter, MarkerPoseEstimator, ModelPlacement};
use nalgebra::{Matrix4, Vector3};
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Results of one processed frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutput {
    /// Pose of the anchor marker, or [`Pose::ABSENT`] when none was solved.
    pub pose: Pose,
    pub marker_id: Option<i32>,
    /// Every marker solved this frame, in detection order.
    pub marker_poses: Vec<(i32, Pose)>,
    pub matrices: ViewProjectionPair,
    pub gestures: Vec<GestureEvent>,
    /// A fist was seen and handed to the interaction state machine.
    pub trigger_fired: bool,
    pub animation_offset: Vector3<f64>,
    pub frame_size: (u32, u32),
}

impl FrameOutput {
    pub fn marker_visible(&self) -> bool {
        self.marker_id.is_some()
    }
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderState {
    pub pose: Pose,
    pub intrinsics: CameraIntrinsics,
    pub matrices: ViewProjectionPair,
    /// Mesh placement on the marker, animation offset included.
    pub model: Matrix4<f64>,
    pub animation_offset: Vector3<f64>,
    pub marker_visible: bool,
}

/// Per-frame tracking and interaction. Constructing one requires
/// intrinsics, so no pose is ever computed uncalibrated.
#[derive(Clone, Debug)]
pub struct FramePipeline {
    intrinsics: CameraIntrinsics,
    marker_side: f64,
    estimator: MarkerPoseEstimator,
    converter: FrameConverter,
    placement: ModelPlacement,
    gestures: GestureDetector,
    trigger: FistTrigger,
    interaction: InteractionStateMachine,
    require_marker_for_trigger: bool,
}

impl FramePipeline {
    pub fn new(intrinsics: CameraIntrinsics, config: &AppConfig) -> Self {
        Self {
            intrinsics,
            marker_side: config.marker_side,
            estimator: config.pose,
            converter: config.frames,
            placement: config.model,
            gestures: GestureDetector::new(config.gestures),
            trigger: FistTrigger::new(config.trigger),
            interaction: InteractionStateMachine::new(config.animation),
            require_marker_for_trigger: config.require_marker_for_trigger,
        }
    }

    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    pub fn interaction(&self) -> &InteractionStateMachine {
        &self.interaction
    }

    pub fn gestures(&self) -> &GestureDetector {
        &self.gestures
    }

    /// Solve the markers detected in `frame`, run gesture recognition and
    /// advance the interaction state to `now`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(markers = observations.len(), t = ?now))
    )]
    pub fn process(
        &mut self,
        frame: &RgbImageView<'_>,
        observations: &[MarkerObservation],
        now: Duration,
    ) -> FrameOutput {
        let frame_size = (frame.width as u32, frame.height as u32);

        let mut marker_poses = Vec::with_capacity(observations.len());
        for (id, result) in self
            .estimator
            .estimate_all(observations, self.marker_side, &self.intrinsics)
        {
            match result {
                Ok(pose) => marker_poses.push((id, pose)),
                Err(e) => log::debug!("marker {id}: {e}"),
            }
        }
        let (marker_id, pose) = match marker_poses.first() {
            Some(&(id, pose)) => (Some(id), pose),
            None => (None, Pose::absent()),
        };
        let matrices = self
            .converter
            .matrices(&self.intrinsics, &pose, frame_size.0, frame_size.1);

        let gestures = self.gestures.detect(frame, now);
        for g in &gestures {
            log::info!("gesture {} ({:.2})", g.kind, g.confidence);
        }

        let mut trigger_fired = false;
        if (marker_id.is_some() || !self.require_marker_for_trigger) && self.trigger.detect(frame) {
            trigger_fired = true;
            self.interaction.trigger(now);
        }
        let animation_offset = self.interaction.current_offset(now);

        FrameOutput {
            pose,
            marker_id,
            marker_poses,
            matrices,
            gestures,
            trigger_fired,
            animation_offset,
            frame_size,
        }
    }

    pub fn render_state(&self, output: &FrameOutput) -> RenderState {
        RenderState {
            pose: output.pose,
            intrinsics: self.intrinsics,
            matrices: output.matrices,
            model: self.placement.model_matrix(output.animation_offset),
            animation_offset: output.animation_offset,
            marker_visible: output.marker_visible(),
        }
    }
}
