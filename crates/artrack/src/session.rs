use crate::{AppError, Clock, FramePipeline, MarkerDetector, Renderer};
use artrack_calib::{BoardDetector, CameraCalibrator, OperatorInput};
use artrack_core::{set_log_frame, CameraIntrinsics, FrameSource, IntrinsicsStore};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Load intrinsics from `store`, or run the interactive calibration and
/// save its result when no usable record exists.
///
/// An aborted calibration surfaces as
/// [`AppError::Calibration`] wrapping `InsufficientViews`.
pub fn bootstrap_intrinsics<S, D, O>(
    store: &IntrinsicsStore,
    calibrator: &CameraCalibrator,
    source: &mut S,
    detector: &mut D,
    operator: &mut O,
) -> Result<CameraIntrinsics, AppError>
where
    S: FrameSource + ?Sized,
    D: BoardDetector + ?Sized,
    O: OperatorInput + ?Sized,
{
    if let Some(intrinsics) = store.load()? {
        log::info!("using calibration from {}", store.path().display());
        return Ok(intrinsics);
    }

    log::info!("no calibration at {}, calibrating", store.path().display());
    let result = calibrator.calibrate(source, detector, operator)?;
    log::info!(
        "calibrated from {} views, rms {:.4} px",
        result.per_view_rms.len(),
        result.rms_error
    );
    store.save(&result.intrinsics)?;
    Ok(result.intrinsics)
}

/// Counters reported when a session ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: usize,
    pub frames_with_marker: usize,
    pub gestures: usize,
    pub triggers: usize,
}

/// The frame-locked main loop: grab, track, render, until the renderer
/// asks to close or the source runs dry.
pub struct ArSession<S, D, R, C> {
    pipeline: FramePipeline,
    source: S,
    detector: D,
    renderer: R,
    clock: C,
    frame_size: Option<(u32, u32)>,
}

impl<S, D, R, C> ArSession<S, D, R, C>
where
    S: FrameSource,
    D: MarkerDetector,
    R: Renderer,
    C: Clock,
{
    pub fn new(pipeline: FramePipeline, source: S, detector: D, renderer: R, clock: C) -> Self {
        Self {
            pipeline,
            source,
            detector,
            renderer,
            clock,
            frame_size: None,
        }
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn run(&mut self) -> Result<SessionSummary, AppError> {
        let mut summary = SessionSummary::default();
        loop {
            if self.renderer.should_close() {
                log::info!("renderer closed");
                break;
            }
            if !self.source.is_open() {
                log::info!("frame source closed");
                break;
            }

            let Some(frame) = self.source.grab()? else {
                continue;
            };
            if frame.is_empty() {
                log::debug!("skipping empty frame");
                continue;
            }

            let size = (frame.width as u32, frame.height as u32);
            if self.frame_size != Some(size) {
                log::debug!("frame size {}x{}", size.0, size.1);
                self.renderer.on_resize(size.0, size.1);
                self.frame_size = Some(size);
            }

            set_log_frame(Some(summary.frames as u64));
            let now = self.clock.now();
            let view = frame.view();
            let observations = self.detector.detect(&view);
            let output = self.pipeline.process(&view, &observations, now);
            let state = self.pipeline.render_state(&output);
            self.renderer.render(&view, &state);

            summary.frames += 1;
            summary.frames_with_marker += usize::from(output.marker_visible());
            summary.gestures += output.gestures.len();
            summary.triggers += usize::from(output.trigger_fired);
        }
        set_log_frame(None);
        log::info!(
            "session ended after {} frames ({} with marker)",
            summary.frames,
            summary.frames_with_marker
        );
        Ok(summary)
    }
}
