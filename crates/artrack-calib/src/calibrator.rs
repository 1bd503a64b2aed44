use crate::{
    refine_corners, BoardSpec, CalibrationConfig, CalibrationError, CalibrationResult,
    CalibrationSession,
};
use artrack_core::{FrameSource, GrayImageView, RgbImageView};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Pixel-level checkerboard detector.
pub trait BoardDetector {
    /// Inner corners of a fully visible board, row-major in the same order
    /// as [`BoardSpec::object_points`], or `None` if no full board is seen.
    fn detect(&mut self, gray: &GrayImageView<'_>, board: &BoardSpec) -> Option<Vec<Point2<f64>>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Keep the board seen in the current frame.
    Accept,
    /// Stop calibrating.
    Abort,
}

/// What the operator sees for the current frame.
#[derive(Clone, Copy, Debug)]
pub struct CalibrationProgress<'a> {
    pub frame: RgbImageView<'a>,
    pub accepted: usize,
    pub required: usize,
    /// Refined corners when a full board was found this frame.
    pub corners: Option<&'a [Point2<f64>]>,
}

impl CalibrationProgress<'_> {
    pub fn board_found(&self) -> bool {
        self.corners.is_some()
    }

    /// Status line of the form `Captured: 3/20`.
    pub fn status_line(&self) -> String {
        format!("Captured: {}/{}", self.accepted, self.required)
    }
}

/// Operator interaction during calibration (a key press per frame, at most).
pub trait OperatorInput {
    fn poll(&mut self, progress: &CalibrationProgress<'_>) -> Option<OperatorCommand>;
}

/// Runs the interactive capture loop and solves the intrinsics.
#[derive(Clone, Copy, Debug, Default)]
pub struct CameraCalibrator {
    pub config: CalibrationConfig,
}

impl CameraCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Collect `required_views` operator-confirmed board views from
    /// `source`, then solve.
    ///
    /// Returns [`CalibrationError::InsufficientViews`] if the operator aborts
    /// or the source closes first.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(required = self.config.required_views))
    )]
    pub fn calibrate<S, D, O>(
        &self,
        source: &mut S,
        detector: &mut D,
        operator: &mut O,
    ) -> Result<CalibrationResult, CalibrationError>
    where
        S: FrameSource + ?Sized,
        D: BoardDetector + ?Sized,
        O: OperatorInput + ?Sized,
    {
        let mut session = CalibrationSession::new(self.config);
        log::info!(
            "calibrating: show a {}x{} board, accept {} views",
            self.config.board.inner_cols,
            self.config.board.inner_rows,
            self.config.required_views
        );

        while !session.is_ready() {
            if !source.is_open() {
                log::warn!("frame source closed during calibration");
                return Err(session.insufficient_views());
            }
            let Some(frame) = source.grab()? else {
                continue;
            };
            if frame.is_empty() {
                continue;
            }

            let gray = frame.view().to_gray();
            let mut corners = detector
                .detect(&gray.view(), &self.config.board)
                .filter(|c| c.len() == self.config.board.corner_count());
            if let Some(c) = corners.as_mut() {
                refine_corners(&gray.view(), c, &self.config.subpix);
            }

            let progress = CalibrationProgress {
                frame: frame.view(),
                accepted: session.accepted(),
                required: session.required(),
                corners: corners.as_deref(),
            };
            match operator.poll(&progress) {
                Some(OperatorCommand::Accept) => match corners {
                    Some(c) => {
                        let n = session.add_view(c, (frame.width as u32, frame.height as u32))?;
                        log::info!("accepted view {}/{}", n, session.required());
                    }
                    None => log::debug!("accept ignored: no board in frame"),
                },
                Some(OperatorCommand::Abort) => {
                    log::warn!(
                        "calibration aborted after {}/{} views",
                        session.accepted(),
                        session.required()
                    );
                    return Err(session.insufficient_views());
                }
                None => {}
            }
        }

        session.solve()
    }
}
